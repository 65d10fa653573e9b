//! Configuration-driven finite-state engine
//!
//! Owns the current/previous state pair and two named timer slots: the idle
//! timer (random delay before a weighted idle action fires) and the revert
//! timer (auto-return after a transient state's duration). Both are plain
//! millisecond deadlines fired by `tick(now)`. The re-arm rule is the only
//! sequencing logic: entering idle always (re)schedules the idle timer
//! unless quiet mode is active.

use ahash::AHashSet;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::rc::Rc;

use crate::core::clock::Clock;
use crate::core::config::{BehaviorConfig, IdleAction};

pub const IDLE_STATE: &str = "idle";
pub const SLEEP_STATE: &str = "sleep";

/// States assumed transient even when the config forgot to give them a
/// duration. A documented fallback policy, nothing more: without it a
/// configuration omission would leave the character stuck in a pose.
const FALLBACK_TRANSIENT_STATES: [&str; 4] = ["interact", "dance", "submissive", "angry"];
const FALLBACK_REVERT_MS: u64 = 3000;

/// Events emitted synchronously to registered listeners
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// State changed (or re-entered, in which case `from == to`)
    StateChange {
        from: String,
        to: String,
        at_ms: u64,
    },
    /// A random idle action was chosen, carrying its descriptor
    ActionTriggered { action: IdleAction },
    /// Direct sound request routed through the engine's listeners.
    /// Never emitted by the engine itself; see `request_sound`.
    SoundPlay { id: String },
}

type Listener = Box<dyn FnMut(&EngineEvent)>;

pub struct BehaviorEngine {
    config: BehaviorConfig,
    states: AHashSet<String>,
    current_state: String,
    previous_state: Option<String>,
    quiet_mode: bool,
    idle_deadline: Option<u64>,
    revert_deadline: Option<u64>,
    listeners: Vec<Listener>,
    rng: ChaCha8Rng,
    clock: Rc<dyn Clock>,
}

impl BehaviorEngine {
    /// Build an engine in the `"idle"` state with the idle timer armed.
    ///
    /// The state set always gains `"idle"` even if the config omitted it.
    pub fn new(config: BehaviorConfig, clock: Rc<dyn Clock>, seed: u64) -> Self {
        let mut states: AHashSet<String> = config.states.iter().cloned().collect();
        states.insert(IDLE_STATE.to_string());

        let mut engine = Self {
            config,
            states,
            current_state: IDLE_STATE.to_string(),
            previous_state: None,
            quiet_mode: false,
            idle_deadline: None,
            revert_deadline: None,
            listeners: Vec::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock,
        };
        engine.arm_idle_timer();
        engine
    }

    pub fn current_state(&self) -> &str {
        &self.current_state
    }

    pub fn previous_state(&self) -> Option<&str> {
        self.previous_state.as_deref()
    }

    pub fn quiet_mode(&self) -> bool {
        self.quiet_mode
    }

    /// Register a listener; dispatch order is registration order.
    pub fn on_event<F: FnMut(&EngineEvent) + 'static>(&mut self, listener: F) {
        self.listeners.push(Box::new(listener));
    }

    /// Request a transition. Returns false (no state change, no event) when
    /// the target state is unknown or quiet mode blocks it. Repeated idle
    /// transitions are silent no-op successes; re-entering any other active
    /// state re-triggers its duration and sound without touching
    /// `previous_state`.
    pub fn transition(&mut self, new_state: &str) -> bool {
        if !self.states.contains(new_state) {
            tracing::debug!(state = new_state, "transition refused: unknown state");
            return false;
        }
        if self.quiet_mode && new_state != SLEEP_STATE {
            tracing::debug!(state = new_state, "transition refused: quiet mode");
            return false;
        }

        if new_state == self.current_state {
            if new_state == IDLE_STATE {
                // Repeated idle must not reset timers or spam listeners
                return true;
            }
            self.schedule_enter_effects(new_state);
            let event = EngineEvent::StateChange {
                from: self.current_state.clone(),
                to: new_state.to_string(),
                at_ms: self.clock.now_ms(),
            };
            self.emit(&event);
            return true;
        }

        let from = std::mem::replace(&mut self.current_state, new_state.to_string());
        self.previous_state = Some(from.clone());
        tracing::info!(from = %from, to = new_state, "state change");

        self.schedule_enter_effects(new_state);
        let event = EngineEvent::StateChange {
            from,
            to: new_state.to_string(),
            at_ms: self.clock.now_ms(),
        };
        self.emit(&event);
        true
    }

    /// Transition back to the previous state, or to idle if there is none.
    pub fn revert(&mut self) -> bool {
        let target = self
            .previous_state
            .clone()
            .unwrap_or_else(|| IDLE_STATE.to_string());
        self.transition(&target)
    }

    /// Arm the revert timer explicitly; used by the trigger scheduler to
    /// impose block durations and by interactions carrying their own.
    pub fn schedule_revert(&mut self, delay_ms: u64) {
        self.revert_deadline = Some(self.clock.now_ms() + delay_ms);
    }

    /// Hard gate: while enabled only `"sleep"` transitions pass. Enabling
    /// cancels all timers and puts the pet to sleep; disabling wakes it to
    /// idle, which re-arms the idle timer.
    pub fn set_quiet_mode(&mut self, enabled: bool) {
        self.quiet_mode = enabled;
        if enabled {
            self.idle_deadline = None;
            self.revert_deadline = None;
            if self.current_state != SLEEP_STATE && self.states.contains(SLEEP_STATE) {
                self.transition(SLEEP_STATE);
            }
        } else if self.current_state == SLEEP_STATE {
            self.transition(IDLE_STATE);
        }
    }

    /// Emit a `SoundPlay` event to listeners on the caller's behalf.
    pub fn request_sound(&mut self, id: &str) {
        let event = EngineEvent::SoundPlay { id: id.to_string() };
        self.emit(&event);
    }

    /// Fire due timers. Revert runs first so a same-call idle re-arm gets a
    /// fresh deadline in the future.
    pub fn tick(&mut self, now_ms: u64) {
        if let Some(deadline) = self.revert_deadline {
            if now_ms >= deadline {
                self.revert_deadline = None;
                self.revert();
            }
        }
        if let Some(deadline) = self.idle_deadline {
            if now_ms >= deadline {
                self.idle_deadline = None;
                self.fire_idle_action();
            }
        }
    }

    /// Clear timers and listeners. Idempotent.
    pub fn dispose(&mut self) {
        self.idle_deadline = None;
        self.revert_deadline = None;
        self.listeners.clear();
    }

    fn schedule_enter_effects(&mut self, state: &str) {
        if state == IDLE_STATE {
            self.revert_deadline = None;
            if !self.quiet_mode {
                self.arm_idle_timer();
            }
            return;
        }

        // A non-idle state supersedes any pending idle draw
        self.idle_deadline = None;

        let configured_duration = self
            .config
            .idle_actions
            .iter()
            .find(|a| a.state == state)
            .and_then(|a| a.duration_ms);
        self.revert_deadline = match configured_duration {
            Some(ms) => Some(self.clock.now_ms() + ms),
            None if FALLBACK_TRANSIENT_STATES.contains(&state) => {
                Some(self.clock.now_ms() + FALLBACK_REVERT_MS)
            }
            None => None,
        };
    }

    fn arm_idle_timer(&mut self) {
        let min = self.config.idle_timeout.min_ms;
        let max = self.config.idle_timeout.max_ms;
        let delay = if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        };
        self.idle_deadline = Some(self.clock.now_ms() + delay);
    }

    fn fire_idle_action(&mut self) {
        if self.quiet_mode {
            return;
        }
        let Some(action) = self.pick_idle_action() else {
            // Nothing to do; wait for the next window
            self.arm_idle_timer();
            return;
        };
        tracing::debug!(state = %action.state, "idle action chosen");
        let event = EngineEvent::ActionTriggered {
            action: action.clone(),
        };
        self.emit(&event);
        if !self.transition(&action.state) {
            // A refused transition (unknown state in the config) must not
            // kill the idle loop
            self.arm_idle_timer();
        }
    }

    /// Weighted random draw: uniform r in [0, total), walk the list
    /// subtracting weights. The first-entry fallback only triggers through
    /// floating-point edge cases.
    fn pick_idle_action(&mut self) -> Option<IdleAction> {
        let actions = &self.config.idle_actions;
        if actions.is_empty() {
            return None;
        }
        let total: f64 = actions.iter().map(|a| a.weight.max(0.0)).sum();
        if total <= 0.0 {
            return Some(actions[0].clone());
        }
        let mut r = self.rng.gen_range(0.0..total);
        for action in actions {
            let w = action.weight.max(0.0);
            if r < w {
                return Some(action.clone());
            }
            r -= w;
        }
        Some(actions[0].clone())
    }

    fn emit(&mut self, event: &EngineEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }
}
