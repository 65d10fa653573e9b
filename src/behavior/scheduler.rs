//! Rule-based trigger scheduler
//!
//! Periodically evaluates condition/action rules against a mutable context
//! (idle time, energy, time of day). User-supplied triggers are checked
//! first, then a fixed set of system defaults; the first truthy condition
//! wins the tick and later rules are not considered. Sound side effects are
//! not handled here — they flow through the engine's own state-change
//! events, keeping the scheduler decoupled from audio.

use std::cell::RefCell;
use std::rc::Rc;

use crate::behavior::condition::{evaluate_condition, Context, CtxValue};
use crate::behavior::engine::BehaviorEngine;
use crate::core::clock::Clock;
use crate::core::config::{TriggerAction, TriggerRule};

pub const DEFAULT_EVAL_INTERVAL_MS: u64 = 60_000;

pub struct TriggerScheduler {
    engine: Rc<RefCell<BehaviorEngine>>,
    triggers: Vec<TriggerRule>,
    context: Context,
    clock: Rc<dyn Clock>,
    interval_ms: u64,
    next_eval_at: Option<u64>,
    last_eval_ms: Option<u64>,
}

impl TriggerScheduler {
    /// User triggers get first refusal; the system defaults are appended
    /// after them and cannot be removed.
    pub fn new(
        engine: Rc<RefCell<BehaviorEngine>>,
        user_triggers: Vec<TriggerRule>,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let mut triggers = user_triggers;
        triggers.extend(system_default_triggers());

        let mut context = Context::new();
        context.insert("idleTime".to_string(), CtxValue::Num(0.0));

        Self {
            engine,
            triggers,
            context,
            clock,
            interval_ms: DEFAULT_EVAL_INTERVAL_MS,
            next_eval_at: None,
            last_eval_ms: None,
        }
    }

    /// Begin periodic evaluation. Calling while already running is a no-op.
    pub fn start(&mut self, interval_ms: u64) {
        if self.next_eval_at.is_some() {
            return;
        }
        self.interval_ms = interval_ms;
        let now = self.clock.now_ms();
        self.next_eval_at = Some(now + interval_ms);
        self.last_eval_ms = Some(now);
    }

    pub fn is_running(&self) -> bool {
        self.next_eval_at.is_some()
    }

    /// Fire the periodic evaluation when its deadline is due.
    pub fn tick(&mut self, now_ms: u64) {
        let Some(deadline) = self.next_eval_at else {
            return;
        };
        if now_ms < deadline {
            return;
        }
        self.next_eval_at = Some(now_ms + self.interval_ms);
        self.evaluate();
    }

    /// Refresh time fields, advance idle time, and execute the first
    /// matching trigger. Malformed conditions log and count as false.
    pub fn evaluate(&mut self) {
        let now = self.clock.now_ms();
        if let Some(last) = self.last_eval_ms {
            let elapsed = now.saturating_sub(last) as f64;
            let idle = match self.context.get("idleTime") {
                Some(CtxValue::Num(n)) => *n,
                _ => 0.0,
            };
            self.context
                .insert("idleTime".to_string(), CtxValue::Num(idle + elapsed));
        }
        self.last_eval_ms = Some(now);

        let local = self.clock.local_time();
        self.context
            .insert("hour".to_string(), CtxValue::Num(local.hour as f64));
        self.context
            .insert("minute".to_string(), CtxValue::Num(local.minute as f64));
        self.context.insert(
            "dayOfWeek".to_string(),
            CtxValue::Num(local.day_of_week as f64),
        );

        for rule in &self.triggers {
            match evaluate_condition(&rule.condition, &self.context) {
                Ok(true) => {
                    tracing::debug!(condition = %rule.condition, "trigger matched");
                    self.execute_action(&rule.action);
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(condition = %rule.condition, error = %e, "condition rejected");
                }
            }
        }
    }

    fn execute_action(&self, action: &TriggerAction) {
        let Some(state) = &action.state else {
            return;
        };
        let mut engine = self.engine.borrow_mut();
        if engine.transition(state) {
            if let Some(duration_ms) = action.duration_ms {
                engine.schedule_revert(duration_ms);
            }
        }
    }

    /// Shallow merge into the live context; last write wins per key.
    pub fn set_context(&mut self, partial: Context) {
        for (key, value) in partial {
            self.context.insert(key, value);
        }
    }

    pub fn set_value(&mut self, key: &str, value: CtxValue) {
        self.context.insert(key.to_string(), value);
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Zero the idle-time counter; called on real user interaction so
    /// "idle" always means "no interaction".
    pub fn reset_idle_time(&mut self) {
        self.context
            .insert("idleTime".to_string(), CtxValue::Num(0.0));
        self.last_eval_ms = Some(self.clock.now_ms());
    }

    pub fn stop(&mut self) {
        self.next_eval_at = None;
    }

    pub fn dispose(&mut self) {
        self.stop();
        self.context.clear();
    }
}

/// Fixed, non-removable defaults evaluated after every user trigger:
/// night-mode sleep, low-energy sleep, tired sleep.
fn system_default_triggers() -> Vec<TriggerRule> {
    vec![
        TriggerRule {
            condition: "hour >= 23 || hour < 6".to_string(),
            action: TriggerAction {
                state: Some("sleep".to_string()),
                duration_ms: Some(600_000),
            },
        },
        TriggerRule {
            condition: "energy < 10".to_string(),
            action: TriggerAction {
                state: Some("sleep".to_string()),
                duration_ms: Some(60_000),
            },
        },
        TriggerRule {
            condition: "energy < 30".to_string(),
            action: TriggerAction {
                state: Some("sleep".to_string()),
                duration_ms: Some(30_000),
            },
        },
    ]
}
