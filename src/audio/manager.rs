//! Two-channel sound manager
//!
//! One-shot effects play independently and may overlap; the ambience
//! channel holds at most one looping id at a time, enforced by
//! `loop_sound` unconditionally stopping the previous loop first. Sounds
//! with a `loop_delay` use delayed-repeat mode: each playthrough ends,
//! then after a random gap the sound replays — unless the ambience id was
//! reassigned in the meantime, which invalidates the pending replay.
//!
//! Every failure (unknown id, backend error, muted) is logged and
//! surfaced as `false`; nothing here panics or propagates errors upward.

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::audio::backend::{AudioBackend, AudioHandle};
use crate::core::config::{SoundEntry, SoundSource};

struct LoadedSound {
    entry: SoundEntry,
    /// One eagerly constructed handle per resource variant
    handles: Vec<Box<dyn AudioHandle>>,
}

struct PendingReplay {
    deadline: u64,
    id: String,
}

pub struct SoundManager {
    backend: Box<dyn AudioBackend>,
    sounds: AHashMap<String, LoadedSound>,
    muted: bool,
    /// Current ambience id and the variant index it is playing on
    ambience: Option<(String, usize)>,
    pending_replay: Option<PendingReplay>,
    rng: ChaCha8Rng,
}

impl SoundManager {
    pub fn new(backend: Box<dyn AudioBackend>, seed: u64) -> Self {
        Self {
            backend,
            sounds: AHashMap::new(),
            muted: false,
            ambience: None,
            pending_replay: None,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Fully replace the loaded set: the previous sounds are disposed
    /// first, then every configured reference is resolved and its
    /// resources constructed eagerly. Returns the number of usable ids.
    pub fn load_sounds(
        &mut self,
        sounds: &AHashMap<String, SoundSource>,
        base_path: &str,
    ) -> usize {
        self.dispose();

        for (id, source) in sounds {
            let entry = source.normalize();
            let mut handles = Vec::with_capacity(entry.variants.len());
            for variant in &entry.variants {
                let path = join_path(base_path, variant);
                match self.backend.create(&path) {
                    Ok(handle) => handles.push(handle),
                    Err(e) => {
                        tracing::warn!(sound = %id, path = %path, error = %e, "failed to load sound variant");
                    }
                }
            }
            if handles.is_empty() {
                tracing::warn!(sound = %id, "no playable variants; sound unavailable");
                continue;
            }
            self.sounds.insert(id.clone(), LoadedSound { entry, handles });
        }

        tracing::debug!(count = self.sounds.len(), "sounds loaded");
        self.sounds.len()
    }

    /// Global mute. Enabling immediately silences the ambience loop.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            self.stop_loop();
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn has_sound(&self, id: &str) -> bool {
        self.sounds.contains_key(id)
    }

    /// Whether the entry is configured for the ambience channel
    pub fn is_loop_sound(&self, id: &str) -> bool {
        self.sounds.get(id).map_or(false, |s| s.entry.looped)
    }

    /// One-shot playback on the effects channel. Restarts from position
    /// zero even if already playing; never touches the ambience channel.
    /// The variant is chosen uniformly at random at play time.
    pub fn play(&mut self, id: &str) -> bool {
        if self.muted {
            tracing::debug!(sound = id, "play skipped: muted");
            return false;
        }
        let Some(sound) = self.sounds.get_mut(id) else {
            tracing::warn!(sound = id, "play failed: unknown sound");
            return false;
        };
        let idx = if sound.handles.len() > 1 {
            self.rng.gen_range(0..sound.handles.len())
        } else {
            0
        };
        let handle = &mut sound.handles[idx];
        handle.set_looping(false);
        handle.set_volume(sound.entry.volume);
        handle.set_playback_rate(sound.entry.playback_rate);
        handle.rewind();
        let ok = handle.play();
        if !ok {
            tracing::warn!(sound = id, "playback failed");
        }
        ok
    }

    /// Start looping `id` on the ambience channel, stopping whatever was
    /// looping before. With a configured `loop_delay` the handle plays
    /// through once and `tick` schedules irregular replays; otherwise the
    /// handle loops natively.
    pub fn loop_sound(&mut self, id: &str) -> bool {
        if self.muted {
            tracing::debug!(sound = id, "loop skipped: muted");
            return false;
        }
        self.stop_loop();

        let Some(sound) = self.sounds.get_mut(id) else {
            tracing::warn!(sound = id, "loop failed: unknown sound");
            return false;
        };
        let idx = if sound.handles.len() > 1 {
            self.rng.gen_range(0..sound.handles.len())
        } else {
            0
        };
        let delayed = sound.entry.loop_delay.is_some();
        let handle = &mut sound.handles[idx];
        handle.set_looping(!delayed);
        handle.set_volume(sound.entry.volume);
        handle.set_playback_rate(sound.entry.playback_rate);
        handle.rewind();
        let ok = handle.play();
        if ok {
            self.ambience = Some((id.to_string(), idx));
        } else {
            tracing::warn!(sound = id, "loop playback failed");
        }
        ok
    }

    /// Cancel any pending delayed replay, stop and rewind the active
    /// ambience resource, and clear the channel. Safe when nothing loops.
    pub fn stop_loop(&mut self) {
        self.pending_replay = None;
        if let Some((id, idx)) = self.ambience.take() {
            if let Some(sound) = self.sounds.get_mut(&id) {
                if let Some(handle) = sound.handles.get_mut(idx) {
                    handle.stop();
                    handle.rewind();
                    handle.set_looping(false);
                }
            }
        }
    }

    /// True only for the exact current ambience id
    pub fn is_looping(&self, id: &str) -> bool {
        self.ambience.as_ref().map_or(false, |(cur, _)| cur == id)
    }

    /// Drive delayed-repeat ambience. A fired replay timer only acts if
    /// the ambience id it was scheduled for is still current.
    pub fn tick(&mut self, now_ms: u64) {
        if self.muted {
            return;
        }

        if let Some(pending) = &self.pending_replay {
            if now_ms < pending.deadline {
                return;
            }
            let id = pending.id.clone();
            self.pending_replay = None;
            let still_current = self
                .ambience
                .as_ref()
                .map_or(false, |(cur, _)| *cur == id);
            if !still_current {
                // Stale timer from a superseded loop
                return;
            }
            if let Some((_, idx)) = &self.ambience {
                let idx = *idx;
                if let Some(sound) = self.sounds.get_mut(&id) {
                    if let Some(handle) = sound.handles.get_mut(idx) {
                        handle.rewind();
                        handle.play();
                    }
                }
            }
            return;
        }

        // No pending replay: if a delayed-repeat ambience finished its
        // playthrough, schedule the next one.
        let Some((id, idx)) = &self.ambience else {
            return;
        };
        let id = id.clone();
        let idx = *idx;
        let Some(sound) = self.sounds.get(&id) else {
            return;
        };
        let Some(delay) = sound.entry.loop_delay else {
            return;
        };
        if sound.handles[idx].is_playing() {
            return;
        }
        let gap = if delay.max_ms > delay.min_ms {
            self.rng.gen_range(delay.min_ms..delay.max_ms)
        } else {
            delay.min_ms
        };
        self.pending_replay = Some(PendingReplay {
            deadline: now_ms + gap,
            id,
        });
    }

    /// Stop everything and release every loaded resource.
    pub fn dispose(&mut self) {
        self.stop_loop();
        for sound in self.sounds.values_mut() {
            for handle in &mut sound.handles {
                handle.stop();
            }
        }
        self.sounds.clear();
    }
}

fn join_path(base: &str, path: &str) -> String {
    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::NullBackend;
    use crate::core::clock::{Clock, ManualClock};
    use crate::core::config::LoopDelay;

    fn manager_with(sounds: &[(&str, SoundSource)]) -> (SoundManager, ManualClock) {
        let clock = ManualClock::new();
        let mut mgr = SoundManager::new(Box::new(NullBackend), 11);
        let map: AHashMap<String, SoundSource> = sounds
            .iter()
            .map(|(id, s)| (id.to_string(), s.clone()))
            .collect();
        mgr.load_sounds(&map, "skins/cat");
        (mgr, clock)
    }

    #[test]
    fn test_unknown_sound_fails_quietly() {
        let (mut mgr, _clock) = manager_with(&[]);
        assert!(!mgr.play("ghost"));
        assert!(!mgr.loop_sound("ghost"));
    }

    #[test]
    fn test_muted_blocks_playback() {
        let (mut mgr, _clock) =
            manager_with(&[("meow", SoundSource::Path("meow.ogg".to_string()))]);
        mgr.set_muted(true);
        assert!(!mgr.play("meow"));
        assert!(!mgr.loop_sound("meow"));
        mgr.set_muted(false);
        assert!(mgr.play("meow"));
    }

    #[test]
    fn test_loop_exclusivity() {
        let (mut mgr, _clock) = manager_with(&[
            ("purr", SoundSource::Path("purr.ogg".to_string())),
            ("rain", SoundSource::Path("rain.ogg".to_string())),
        ]);
        assert!(mgr.loop_sound("purr"));
        assert!(mgr.is_looping("purr"));
        assert!(mgr.loop_sound("rain"));
        assert!(!mgr.is_looping("purr"));
        assert!(mgr.is_looping("rain"));
    }

    #[test]
    fn test_stop_loop_safe_when_idle() {
        let (mut mgr, _clock) = manager_with(&[]);
        mgr.stop_loop();
        assert!(!mgr.is_looping("anything"));
    }

    #[test]
    fn test_mute_stops_ambience() {
        let (mut mgr, _clock) =
            manager_with(&[("purr", SoundSource::Path("purr.ogg".to_string()))]);
        mgr.loop_sound("purr");
        mgr.set_muted(true);
        assert!(!mgr.is_looping("purr"));
    }

    #[test]
    fn test_load_replaces_previous_set() {
        let (mut mgr, _clock) =
            manager_with(&[("meow", SoundSource::Path("meow.ogg".to_string()))]);
        assert!(mgr.has_sound("meow"));

        let mut replacement = AHashMap::new();
        replacement.insert(
            "bark".to_string(),
            SoundSource::Path("bark.ogg".to_string()),
        );
        let count = mgr.load_sounds(&replacement, "skins/dog");
        assert_eq!(count, 1);
        assert!(!mgr.has_sound("meow"));
        assert!(mgr.has_sound("bark"));
    }

    #[test]
    fn test_delayed_repeat_schedules_and_fires() {
        let delayed = SoundSource::Detailed {
            src: Some("purr.ogg".to_string()),
            srcs: Vec::new(),
            looped: true,
            volume: 1.0,
            playback_rate: 1.0,
            loop_delay: Some(LoopDelay {
                min_ms: 2000,
                max_ms: 2001,
            }),
        };
        let (mut mgr, clock) = manager_with(&[("purr", delayed)]);
        assert!(mgr.loop_sound("purr"));

        // Null handles report a non-looping playthrough as finished, so the
        // first tick schedules a replay...
        mgr.tick(clock.now_ms());
        clock.advance(1999);
        mgr.tick(clock.now_ms());
        assert!(mgr.is_looping("purr"));

        // ...and the deadline passing replays without dropping the id
        clock.advance(1);
        mgr.tick(clock.now_ms());
        assert!(mgr.is_looping("purr"));
    }

    #[test]
    fn test_reassigning_ambience_cancels_pending_replay() {
        let delayed = SoundSource::Detailed {
            src: Some("purr.ogg".to_string()),
            srcs: Vec::new(),
            looped: true,
            volume: 1.0,
            playback_rate: 1.0,
            loop_delay: Some(LoopDelay {
                min_ms: 1000,
                max_ms: 1001,
            }),
        };
        let (mut mgr, clock) = manager_with(&[
            ("purr", delayed),
            ("rain", SoundSource::Path("rain.ogg".to_string())),
        ]);
        mgr.loop_sound("purr");
        mgr.tick(clock.now_ms()); // schedules the replay

        mgr.loop_sound("rain"); // supersedes purr, cancels the pending timer
        clock.advance(10_000);
        mgr.tick(clock.now_ms());
        assert!(mgr.is_looping("rain"));
        assert!(!mgr.is_looping("purr"));
    }

    #[test]
    fn test_dispose_clears_everything() {
        let (mut mgr, _clock) =
            manager_with(&[("meow", SoundSource::Path("meow.ogg".to_string()))]);
        mgr.loop_sound("meow");
        mgr.dispose();
        assert!(!mgr.has_sound("meow"));
        assert!(!mgr.is_looping("meow"));
        assert!(!mgr.play("meow"));
    }
}
