//! Seam between the sound manager and the platform audio system
//!
//! The shell supplies a real `AudioBackend`; the core only drives handles.
//! Backend failures surface as `PetError::Audio` and are absorbed by the
//! manager — audio must never crash the behavior engine.

use crate::core::error::Result;

/// One playable audio resource
pub trait AudioHandle {
    /// Start (or resume) playback from the current position
    fn play(&mut self) -> bool;
    fn stop(&mut self);
    /// Seek back to position zero
    fn rewind(&mut self);
    fn set_looping(&mut self, looping: bool);
    fn set_volume(&mut self, volume: f32);
    fn set_playback_rate(&mut self, rate: f32);
    fn is_playing(&self) -> bool;
}

/// Constructs handles from resource paths
pub trait AudioBackend {
    fn create(&mut self, path: &str) -> Result<Box<dyn AudioHandle>>;
}

/// Backend whose handles succeed and do nothing; keeps the pet fully
/// functional on systems without audio output.
#[derive(Default)]
pub struct NullBackend;

struct NullHandle {
    playing: bool,
    looping: bool,
}

impl AudioHandle for NullHandle {
    fn play(&mut self) -> bool {
        self.playing = true;
        true
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn rewind(&mut self) {}

    fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn set_playback_rate(&mut self, _rate: f32) {}

    fn is_playing(&self) -> bool {
        self.playing && self.looping
    }
}

impl AudioBackend for NullBackend {
    fn create(&mut self, _path: &str) -> Result<Box<dyn AudioHandle>> {
        Ok(Box::new(NullHandle {
            playing: false,
            looping: false,
        }))
    }
}
