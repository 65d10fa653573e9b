pub mod backend;
pub mod manager;

pub use backend::{AudioBackend, AudioHandle, NullBackend};
pub use manager::SoundManager;
