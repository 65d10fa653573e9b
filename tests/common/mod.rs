//! Shared test fixtures: a recording audio backend whose handles log
//! every call, so tests can assert exactly what the sound manager did.

use deskpet::audio::backend::{AudioBackend, AudioHandle};
use deskpet::core::error::{PetError, Result};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCall {
    Play(String),
    Stop(String),
    Rewind(String),
    SetLooping(String, bool),
}

pub type AudioLog = Rc<RefCell<Vec<AudioCall>>>;

pub struct RecordingBackend {
    pub log: AudioLog,
    /// Paths whose creation fails, for exercising load-failure handling
    pub fail_paths: Vec<String>,
}

impl RecordingBackend {
    pub fn new() -> (Self, AudioLog) {
        let log: AudioLog = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                log: log.clone(),
                fail_paths: Vec::new(),
            },
            log,
        )
    }
}

struct RecordingHandle {
    path: String,
    log: AudioLog,
    playing: bool,
    looping: bool,
}

impl AudioHandle for RecordingHandle {
    fn play(&mut self) -> bool {
        self.log
            .borrow_mut()
            .push(AudioCall::Play(self.path.clone()));
        self.playing = true;
        true
    }

    fn stop(&mut self) {
        self.log
            .borrow_mut()
            .push(AudioCall::Stop(self.path.clone()));
        self.playing = false;
    }

    fn rewind(&mut self) {
        self.log
            .borrow_mut()
            .push(AudioCall::Rewind(self.path.clone()));
    }

    fn set_looping(&mut self, looping: bool) {
        self.log
            .borrow_mut()
            .push(AudioCall::SetLooping(self.path.clone(), looping));
        self.looping = looping;
    }

    fn set_volume(&mut self, _volume: f32) {}

    fn set_playback_rate(&mut self, _rate: f32) {}

    // One-shot playthroughs finish immediately; only native loops stay up
    fn is_playing(&self) -> bool {
        self.playing && self.looping
    }
}

impl AudioBackend for RecordingBackend {
    fn create(&mut self, path: &str) -> Result<Box<dyn AudioHandle>> {
        if self.fail_paths.iter().any(|p| p == path) {
            return Err(PetError::Audio(format!("cannot decode {path}")));
        }
        Ok(Box::new(RecordingHandle {
            path: path.to_string(),
            log: self.log.clone(),
            playing: false,
            looping: false,
        }))
    }
}

/// Count `Play` calls recorded for a path
pub fn plays_of(log: &AudioLog, path: &str) -> usize {
    log.borrow()
        .iter()
        .filter(|c| matches!(c, AudioCall::Play(p) if p == path))
        .count()
}

/// Whether a `Stop` was recorded for a path
pub fn stopped(log: &AudioLog, path: &str) -> bool {
    log.borrow()
        .iter()
        .any(|c| matches!(c, AudioCall::Stop(p) if p == path))
}
