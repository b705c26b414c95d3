//! Loader selection and stack application.
//!
//! The host owns the actual LoRA patching; it plugs in through
//! [`LoraLoader`]. Which loader runs is decided once from the startup
//! [`Capabilities`] and the model being patched.

use super::plan::{PlannedLoad, StackPlan};
use crate::config::Capabilities;
use crate::error::{GalleryError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Which host loader applies the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderKind {
    /// The host's regular LoRA loader (model + CLIP).
    Standard,
    /// The accelerated Flux loader; patches the model only.
    Accelerated,
}

impl LoaderKind {
    /// Whether this loader also patches the text encoder.
    pub fn patches_clip(self) -> bool {
        matches!(self, LoaderKind::Standard)
    }
}

/// Accelerated only when it is installed and the model is one it handles.
pub fn select_loader(capabilities: Capabilities, model_is_accelerated: bool) -> LoaderKind {
    if capabilities.accelerated_loader && model_is_accelerated {
        LoaderKind::Accelerated
    } else {
        LoaderKind::Standard
    }
}

/// Host-side LoRA application for a target of type `T` (a model, or a
/// model/CLIP pair).
pub trait LoraLoader<T> {
    /// Return `target` with `load` applied. `target` itself is left as is so
    /// a failed load can be skipped.
    fn load_lora(&self, target: &T, load: &PlannedLoad) -> Result<T>;
}

/// Result of applying a plan.
#[derive(Debug)]
pub struct StackOutcome<T> {
    pub target: T,
    pub applied: usize,
    /// LoRAs whose load failed, with the error.
    pub failed: Vec<(String, GalleryError)>,
}

/// Apply every planned load in order. Failing loads are logged and skipped.
pub fn apply_plan<T, L>(plan: &StackPlan, loader: &L, target: T) -> StackOutcome<T>
where
    L: LoraLoader<T> + ?Sized,
{
    let mut current = target;
    let mut applied = 0;
    let mut failed = Vec::new();

    for load in &plan.loads {
        match loader.load_lora(&current, load) {
            Ok(next) => {
                current = next;
                applied += 1;
            }
            Err(e) => {
                warn!("Failed to load LoRA '{}': {}", load.lora, e);
                failed.push((load.lora.clone(), e));
            }
        }
    }

    info!("Applied {} LoRAs with the {:?} loader", applied, plan.loader);
    StackOutcome {
        target: current,
        applied,
        failed,
    }
}
