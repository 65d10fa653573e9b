pub mod condition;
pub mod engine;
pub mod scheduler;

pub use condition::{evaluate_condition, Context, CtxValue};
pub use engine::{BehaviorEngine, EngineEvent};
pub use scheduler::TriggerScheduler;
