//! Persisted per-node LoRA stack.
//!
//! Two older layouts are still read: the selections file used to hold a
//! bare array per node, and nodes used to carry the same array serialized
//! into a string widget. Both are migrated to [`NodeSelection`] on load.

use crate::error::{GalleryError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Current selection schema version.
pub const SELECTION_SCHEMA_VERSION: u32 = 2;

/// One LoRA in a node's stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    #[serde(default)]
    pub lora: String,
    #[serde(default = "default_on")]
    pub on: bool,
    #[serde(default = "default_strength", deserialize_with = "de_strength")]
    pub strength: f32,
    /// Defaults to `strength` when absent.
    #[serde(
        default,
        deserialize_with = "de_opt_strength",
        skip_serializing_if = "Option::is_none"
    )]
    pub strength_clip: Option<f32>,
}

impl StackEntry {
    pub fn new(lora: impl Into<String>, strength: f32) -> Self {
        Self {
            lora: lora.into(),
            on: true,
            strength,
            strength_clip: None,
        }
    }

    pub fn with_clip_strength(mut self, strength_clip: f32) -> Self {
        self.strength_clip = Some(strength_clip);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.on = false;
        self
    }

    pub fn clip_strength(&self) -> f32 {
        self.strength_clip.unwrap_or(self.strength)
    }
}

fn default_on() -> bool {
    true
}

fn default_strength() -> f32 {
    1.0
}

/// Strengths were written both as numbers and as numeric strings.
fn strength_from_value(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

fn de_strength<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    strength_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid strength: {}", value)))
}

fn de_opt_strength<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    strength_from_value(&value)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid strength: {}", value)))
}

/// A node's LoRA stack in the current schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct NodeSelection {
    pub version: u32,
    pub stack: Vec<StackEntry>,
}

impl Default for NodeSelection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl NodeSelection {
    pub fn new(stack: Vec<StackEntry>) -> Self {
        Self {
            version: SELECTION_SCHEMA_VERSION,
            stack,
        }
    }

    /// Read a selection in the current or any historical layout.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Array(_) => Ok(Self::new(parse_stack(value)?)),
            Value::String(s) => {
                if s.trim().is_empty() {
                    return Ok(Self::default());
                }
                let inner: Value = serde_json::from_str(&s).map_err(|e| {
                    GalleryError::invalid("selection", format!("selection string is not JSON: {}", e))
                })?;
                if inner.is_string() {
                    return Err(GalleryError::invalid("selection", "doubly encoded selection"));
                }
                Self::from_value(inner)
            }
            Value::Object(mut map) => {
                if let Some(version) = map.get("version") {
                    let version = version.as_u64().ok_or_else(|| {
                        GalleryError::invalid("version", "selection version must be an integer")
                    })?;
                    if version > u64::from(SELECTION_SCHEMA_VERSION) {
                        return Err(GalleryError::invalid(
                            "version",
                            format!("unsupported selection version {}", version),
                        ));
                    }
                }
                let stack = map
                    .remove("stack")
                    .or_else(|| map.remove("lora_stack"))
                    .unwrap_or(Value::Array(Vec::new()));
                Ok(Self::new(parse_stack(stack)?))
            }
            other => Err(GalleryError::invalid(
                "selection",
                format!("unexpected selection value: {}", other),
            )),
        }
    }

    /// Entries that are switched on and name a LoRA.
    pub fn active_entries(&self) -> impl Iterator<Item = &StackEntry> {
        self.stack.iter().filter(|e| e.on && !e.lora.trim().is_empty())
    }
}

impl TryFrom<Value> for NodeSelection {
    type Error = GalleryError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

fn parse_stack(value: Value) -> Result<Vec<StackEntry>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    serde_json::from_value(value)
        .map_err(|e| GalleryError::invalid("lora_stack", format!("malformed LoRA stack: {}", e)))
}
