//! Bounded energy attribute with wall-clock decay
//!
//! Energy drifts down 1 unit every 10 minutes, clamped to [5, 100]. The
//! decay is measured in real elapsed time: `init()` converts the gap since
//! the persisted `last_energy_update` into whole intervals and applies
//! them at once (catch-up decay), so a pet that was offline overnight
//! wakes up appropriately drained. This is the one component where wall
//! clock, not just logical ticks, affects state.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::clock::Clock;
use crate::core::store::{PetRecord, PetStore};

pub const MIN_ENERGY: i32 = 5;
pub const MAX_ENERGY: i32 = 100;
pub const DEFAULT_ENERGY: i32 = 75;
/// One decay step every 10 minutes
pub const DECAY_INTERVAL_MS: u64 = 600_000;
/// Units lost per decay step
pub const DECAY_RATE: i32 = 1;

/// Named bucket of the energy scale; the presentation layer uses the
/// suggested labels to pick mood-appropriate idle animations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Exhausted,
    Tired,
    Relaxed,
    Normal,
    Energetic,
    Hyper,
}

impl Tier {
    /// Fixed non-overlapping bands covering [0, 100]
    pub fn from_energy(energy: i32) -> Self {
        match energy {
            i32::MIN..=10 => Tier::Exhausted,
            11..=30 => Tier::Tired,
            31..=50 => Tier::Relaxed,
            51..=70 => Tier::Normal,
            71..=85 => Tier::Energetic,
            _ => Tier::Hyper,
        }
    }

    pub fn suggested_actions(&self) -> &'static [&'static str] {
        match self {
            Tier::Exhausted => &["sleep"],
            Tier::Tired => &["sleep", "yawn"],
            Tier::Relaxed => &["sit", "groom"],
            Tier::Normal => &["idle", "look_around"],
            Tier::Energetic => &["dance", "play"],
            Tier::Hyper => &["dance", "zoomies"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Exhausted => "exhausted",
            Tier::Tired => "tired",
            Tier::Relaxed => "relaxed",
            Tier::Normal => "normal",
            Tier::Energetic => "energetic",
            Tier::Hyper => "hyper",
        }
    }
}

#[derive(Debug, Clone)]
pub enum EnergyEvent {
    EnergyChange { energy: i32 },
    TierChange { from: Tier, to: Tier },
}

type Listener = Box<dyn FnMut(&EnergyEvent)>;

pub struct EnergyManager {
    energy: i32,
    last_update_ms: u64,
    store: Rc<RefCell<dyn PetStore>>,
    clock: Rc<dyn Clock>,
    next_decay_at: Option<u64>,
    listeners: Vec<Listener>,
}

impl EnergyManager {
    pub fn new(store: Rc<RefCell<dyn PetStore>>, clock: Rc<dyn Clock>) -> Self {
        let now = clock.now_ms();
        Self {
            energy: DEFAULT_ENERGY,
            last_update_ms: now,
            store,
            clock,
            next_decay_at: None,
            listeners: Vec::new(),
        }
    }

    pub fn energy(&self) -> i32 {
        self.energy
    }

    pub fn tier(&self) -> Tier {
        Tier::from_energy(self.energy)
    }

    pub fn on_event<F: FnMut(&EnergyEvent) + 'static>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    /// Load the persisted snapshot (falling back to defaults on a missing
    /// or unreadable record), apply catch-up decay for the whole intervals
    /// elapsed since the last update, persist the corrected value, arm the
    /// recurring decay timer, and emit the initial change event.
    pub fn init(&mut self) {
        let loaded = self.store.borrow_mut().load_state();
        match loaded {
            Ok(Some(record)) => {
                self.energy = record.energy.clamp(MIN_ENERGY, MAX_ENERGY);
                self.last_update_ms = record.last_energy_update;
            }
            Ok(None) => {
                self.energy = DEFAULT_ENERGY;
                self.last_update_ms = self.clock.now_ms();
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load pet state; using defaults");
                self.energy = DEFAULT_ENERGY;
                self.last_update_ms = self.clock.now_ms();
            }
        }

        let now = self.clock.now_ms();
        let elapsed = now.saturating_sub(self.last_update_ms);
        let intervals = elapsed / DECAY_INTERVAL_MS;
        if intervals > 0 {
            let decay = (intervals as i32).saturating_mul(DECAY_RATE);
            self.energy = (self.energy - decay).clamp(MIN_ENERGY, MAX_ENERGY);
            tracing::debug!(intervals, energy = self.energy, "catch-up decay applied");
        }
        self.last_update_ms = now;
        self.persist();
        self.next_decay_at = Some(now + DECAY_INTERVAL_MS);

        let event = EnergyEvent::EnergyChange {
            energy: self.energy,
        };
        self.emit(&event);
    }

    /// Clamp, persist, and announce. Emits `TierChange` only when the band
    /// actually moved.
    pub fn modify_energy(&mut self, delta: i32) -> i32 {
        let old_tier = self.tier();
        self.energy = (self.energy + delta).clamp(MIN_ENERGY, MAX_ENERGY);
        self.last_update_ms = self.clock.now_ms();
        self.persist();

        let event = EnergyEvent::EnergyChange {
            energy: self.energy,
        };
        self.emit(&event);

        let new_tier = self.tier();
        if new_tier != old_tier {
            tracing::info!(from = old_tier.as_str(), to = new_tier.as_str(), "tier change");
            let event = EnergyEvent::TierChange {
                from: old_tier,
                to: new_tier,
            };
            self.emit(&event);
        }
        self.energy
    }

    /// Apply due decay steps. Several intervals may have passed since the
    /// last pump; all of them are applied in one call.
    pub fn tick(&mut self, now_ms: u64) {
        let Some(deadline) = self.next_decay_at else {
            return;
        };
        if now_ms < deadline {
            return;
        }
        let intervals = 1 + (now_ms - deadline) / DECAY_INTERVAL_MS;
        self.next_decay_at = Some(deadline + intervals * DECAY_INTERVAL_MS);
        self.modify_energy(-(intervals as i32).saturating_mul(DECAY_RATE));
    }

    /// Cancel the decay timer and drop listeners. Idempotent.
    pub fn dispose(&mut self) {
        self.next_decay_at = None;
        self.listeners.clear();
    }

    fn persist(&mut self) {
        let record = PetRecord {
            energy: self.energy,
            last_energy_update: self.last_update_ms,
        };
        if let Err(e) = self.store.borrow_mut().save_state(&record) {
            // Keep running in memory; preferences just won't survive restart
            tracing::warn!(error = %e, "failed to persist pet state");
        }
    }

    fn emit(&mut self, event: &EnergyEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}
