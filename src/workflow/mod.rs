pub mod types;
pub mod builder;
pub mod engine;

pub use types::*;
pub use builder::WorkflowBuilder;
pub use engine::{CompiledWorkflow, StepSnapshot, StepStream};
