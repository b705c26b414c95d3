//! Turning a node's selection into an ordered list of loads.

use super::loader::LoaderKind;
use super::schema::NodeSelection;
use crate::error::{GalleryError, Result};
use crate::metadata::AssetMetadata;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Which outputs the gallery node patches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackMode {
    #[default]
    ModelAndClip,
    ModelOnly,
}

impl FromStr for StackMode {
    type Err = GalleryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "model_clip" | "model_and_clip" => Ok(StackMode::ModelAndClip),
            "model_only" => Ok(StackMode::ModelOnly),
            other => Err(GalleryError::invalid(
                "mode",
                format!("unknown stack mode {:?}, expected model_clip or model_only", other),
            )),
        }
    }
}

/// One LoRA to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedLoad {
    pub lora: String,
    pub strength_model: f32,
    /// `None` when the text encoder is not patched.
    pub strength_clip: Option<f32>,
}

impl PlannedLoad {
    pub fn model_only(lora: impl Into<String>, strength_model: f32) -> Self {
        Self {
            lora: lora.into(),
            strength_model,
            strength_clip: None,
        }
    }
}

/// Loads in application order plus the combined trigger words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackPlan {
    pub loader: LoaderKind,
    pub mode: StackMode,
    pub loads: Vec<PlannedLoad>,
    /// Trigger words of every enabled LoRA, joined with `", "`.
    pub trigger_words: String,
}

/// Build the plan for `selection`.
///
/// Disabled and unnamed entries are ignored. Trigger words are collected for
/// every enabled entry, even one whose strengths are zero; zero-strength
/// entries are not loaded.
pub fn plan_stack(
    selection: &NodeSelection,
    metadata: &HashMap<String, AssetMetadata>,
    mode: StackMode,
    loader: LoaderKind,
) -> StackPlan {
    let patch_clip = mode == StackMode::ModelAndClip && loader.patches_clip();
    let mut loads = Vec::new();
    let mut triggers = Vec::new();

    for entry in selection.active_entries() {
        if let Some(words) = metadata
            .get(&entry.lora)
            .map(|m| m.trigger_words.trim())
            .filter(|w| !w.is_empty())
        {
            triggers.push(words.to_string());
        }

        let strength_model = entry.strength;
        let strength_clip = entry.clip_strength();
        let skip = if patch_clip {
            strength_model == 0.0 && strength_clip == 0.0
        } else {
            strength_model == 0.0
        };
        if skip {
            continue;
        }

        loads.push(PlannedLoad {
            lora: entry.lora.clone(),
            strength_model,
            strength_clip: patch_clip.then_some(strength_clip),
        });
    }

    StackPlan {
        loader,
        mode,
        loads,
        trigger_words: triggers.join(", "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::schema::StackEntry;

    fn metadata() -> HashMap<String, AssetMetadata> {
        let mut map = HashMap::new();
        for (name, words) in [("a", " alpha "), ("b", "beta"), ("c", ""), ("z", "zero")] {
            map.insert(
                name.to_string(),
                AssetMetadata {
                    trigger_words: words.to_string(),
                    ..Default::default()
                },
            );
        }
        map
    }

    fn selection() -> NodeSelection {
        NodeSelection::new(vec![
            StackEntry::new("a", 0.8).with_clip_strength(0.4),
            StackEntry::new("b", 1.0).disabled(),
            StackEntry::new("c", 1.0),
            StackEntry::new("z", 0.0),
            StackEntry::new("clip_only", 0.0).with_clip_strength(0.6),
            StackEntry::new("", 1.0),
        ])
    }

    #[test]
    fn test_standard_model_and_clip() {
        let plan = plan_stack(&selection(), &metadata(), StackMode::ModelAndClip, LoaderKind::Standard);

        let names: Vec<&str> = plan.loads.iter().map(|l| l.lora.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "clip_only"]);
        assert_eq!(plan.loads[0].strength_clip, Some(0.4));
        assert_eq!(plan.loads[2].strength_clip, Some(0.6));
        // "zero" still contributes its trigger words; "beta" is disabled
        assert_eq!(plan.trigger_words, "alpha, zero");
    }

    #[test]
    fn test_model_only_ignores_clip_strength() {
        let plan = plan_stack(&selection(), &metadata(), StackMode::ModelOnly, LoaderKind::Standard);
        let names: Vec<&str> = plan.loads.iter().map(|l| l.lora.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert!(plan.loads.iter().all(|l| l.strength_clip.is_none()));
    }

    #[test]
    fn test_accelerated_loader_patches_model_only() {
        let plan = plan_stack(&selection(), &metadata(), StackMode::ModelAndClip, LoaderKind::Accelerated);
        let names: Vec<&str> = plan.loads.iter().map(|l| l.lora.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(plan.loads[0], PlannedLoad::model_only("a", 0.8));
    }

    #[test]
    fn test_accelerated_loader_skips_zero_model_strength_even_with_clip() {
        let mut meta = metadata();
        meta.insert(
            "clip_only".to_string(),
            AssetMetadata {
                trigger_words: "clip words".to_string(),
                ..Default::default()
            },
        );
        let selection =
            NodeSelection::new(vec![StackEntry::new("clip_only", 0.0).with_clip_strength(0.6)]);

        // The accelerated loader cannot patch CLIP, so nothing is left to apply
        let plan = plan_stack(&selection, &meta, StackMode::ModelAndClip, LoaderKind::Accelerated);
        assert!(plan.loads.is_empty());
        assert_eq!(plan.trigger_words, "clip words");

        let plan = plan_stack(&selection, &meta, StackMode::ModelAndClip, LoaderKind::Standard);
        assert_eq!(plan.loads.len(), 1);
        assert_eq!(plan.loads[0].strength_clip, Some(0.6));
    }

    #[test]
    fn test_stack_mode_parsing() {
        assert_eq!("model_only".parse::<StackMode>().unwrap(), StackMode::ModelOnly);
        assert_eq!("".parse::<StackMode>().unwrap(), StackMode::ModelAndClip);
        assert!("clip_only".parse::<StackMode>().is_err());
    }
}
