pub mod drag;
pub mod orchestrator;

pub use drag::{DragController, PointerOutcome};
pub use orchestrator::Pet;
