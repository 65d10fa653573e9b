//! Deskpet - behavior core for a virtual desktop companion
//!
//! A configuration-driven finite-state engine (weighted-random idle actions,
//! timer-based auto-revert), a rule-based trigger scheduler, a two-channel
//! sound manager, and a decaying energy attribute, wired together by an
//! orchestrator. Rendering, persistence engines, and the desktop shell live
//! outside this crate behind the traits in `core` and `audio`.

pub mod audio;
pub mod behavior;
pub mod core;
pub mod energy;
pub mod pet;
