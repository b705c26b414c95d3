//! Per-node LoRA stacks: the persisted schema, planning and application.

mod loader;
mod plan;
mod schema;

pub use loader::{apply_plan, select_loader, LoaderKind, LoraLoader, StackOutcome};
pub use plan::{plan_stack, PlannedLoad, StackMode, StackPlan};
pub use schema::{NodeSelection, StackEntry, SELECTION_SCHEMA_VERSION};
