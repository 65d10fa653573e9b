pub mod clock;
pub mod config;
pub mod error;
pub mod store;

pub use clock::{Clock, LocalTime, ManualClock, SystemClock};
pub use config::{BehaviorConfig, IdleAction, InteractionSpec, SkinConfig, TriggerRule};
pub use error::{PetError, Result};
pub use store::{MemoryStore, PetRecord, PetStore, Settings};
