//! Integration tests for trigger scheduling and condition evaluation

use deskpet::behavior::condition::{evaluate_condition, Context, CtxValue};
use deskpet::behavior::engine::BehaviorEngine;
use deskpet::behavior::scheduler::TriggerScheduler;
use deskpet::core::clock::{Clock, ManualClock};
use deskpet::core::config::{BehaviorConfig, TriggerAction, TriggerRule};
use proptest::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;

fn rule(condition: &str, state: &str, duration_ms: Option<u64>) -> TriggerRule {
    TriggerRule {
        condition: condition.to_string(),
        action: TriggerAction {
            state: Some(state.to_string()),
            duration_ms,
        },
    }
}

fn fixture(
    user_triggers: Vec<TriggerRule>,
) -> (TriggerScheduler, Rc<RefCell<BehaviorEngine>>, ManualClock) {
    let clock = ManualClock::new();
    let engine = Rc::new(RefCell::new(BehaviorEngine::new(
        BehaviorConfig::default(),
        Rc::new(clock.clone()),
        7,
    )));
    let mut scheduler =
        TriggerScheduler::new(engine.clone(), user_triggers, Rc::new(clock.clone()));
    scheduler.set_value("energy", CtxValue::Num(80.0));
    (scheduler, engine, clock)
}

/// idleTime above the threshold sleeps the pet; below it nothing happens
#[test]
fn test_idle_time_trigger() {
    let (mut scheduler, engine, _clock) = fixture(vec![rule("idleTime > 5000", "sleep", None)]);

    scheduler.set_value("idleTime", CtxValue::Num(3000.0));
    scheduler.evaluate();
    assert_eq!(engine.borrow().current_state(), "idle");

    scheduler.set_value("idleTime", CtxValue::Num(6000.0));
    scheduler.evaluate();
    assert_eq!(engine.borrow().current_state(), "sleep");
}

/// When two triggers match the same tick, only the first in list order runs
#[test]
fn test_first_match_wins_per_tick() {
    let (mut scheduler, engine, _clock) = fixture(vec![
        rule("energy > 50", "dance", None),
        rule("energy > 50", "angry", None),
    ]);
    scheduler.evaluate();
    assert_eq!(engine.borrow().current_state(), "dance");
}

/// User triggers are evaluated before the appended system defaults
#[test]
fn test_user_triggers_win_over_defaults() {
    let (mut scheduler, engine, _clock) =
        fixture(vec![rule("energy < 30", "submissive", None)]);
    scheduler.set_value("energy", CtxValue::Num(8.0));
    scheduler.evaluate();
    // Both the low-energy default and the user trigger match; user wins
    assert_eq!(engine.borrow().current_state(), "submissive");
}

/// The night default forces sleep between 23:00 and 06:00
#[test]
fn test_night_mode_default() {
    let (mut scheduler, engine, clock) = fixture(Vec::new());

    clock.set_local_time(14, 0, 3);
    scheduler.evaluate();
    assert_eq!(engine.borrow().current_state(), "idle");

    clock.set_local_time(5, 59, 3);
    scheduler.evaluate();
    assert_eq!(engine.borrow().current_state(), "sleep");
}

/// The tired default imposes a 30 second block, then the engine reverts
#[test]
fn test_tired_block_duration() {
    let (mut scheduler, engine, clock) = fixture(Vec::new());
    scheduler.set_value("energy", CtxValue::Num(20.0));
    scheduler.evaluate();
    assert_eq!(engine.borrow().current_state(), "sleep");

    clock.advance(29_999);
    engine.borrow_mut().tick(clock.now_ms());
    assert_eq!(engine.borrow().current_state(), "sleep");

    clock.advance(1);
    engine.borrow_mut().tick(clock.now_ms());
    assert_eq!(engine.borrow().current_state(), "idle");
}

/// Custom context keys work alongside the built-in time fields
#[test]
fn test_custom_context_keys() {
    let (mut scheduler, engine, _clock) = fixture(vec![rule(
        "cpuLoad > 90 && energy > 50",
        "angry",
        None,
    )]);
    let mut partial = Context::new();
    partial.insert("cpuLoad".to_string(), CtxValue::Num(95.0));
    scheduler.set_context(partial);
    scheduler.evaluate();
    assert_eq!(engine.borrow().current_state(), "angry");
}

/// Periodic evaluation accumulates idle time between ticks
#[test]
fn test_periodic_idle_time_accumulation() {
    let (mut scheduler, engine, clock) = fixture(vec![rule("idleTime >= 120000", "sleep", None)]);
    scheduler.start(60_000);

    clock.advance(60_000);
    scheduler.tick(clock.now_ms());
    assert_eq!(engine.borrow().current_state(), "idle");

    clock.advance(60_000);
    scheduler.tick(clock.now_ms());
    assert_eq!(engine.borrow().current_state(), "sleep");
}

/// Conditions with disallowed characters or unknown variables are
/// rejected as a whole; a rejected condition can never fire its action
#[test]
fn test_injection_attempt_rejected() {
    for condition in [
        "energy > 0; killProcess()",
        "globalThis",
        "require(something) > 0",
        "energy > 0 || window",
    ] {
        let (mut scheduler, engine, _clock) = fixture(vec![rule(condition, "angry", None)]);
        scheduler.evaluate();
        assert_eq!(
            engine.borrow().current_state(),
            "idle",
            "condition {condition:?} should be rejected"
        );
    }
}

/// After stop/dispose the periodic timer is dead
#[test]
fn test_stop_halts_evaluation() {
    let (mut scheduler, engine, clock) = fixture(vec![rule("energy > 0", "dance", None)]);
    scheduler.start(1000);
    scheduler.stop();
    clock.advance(100_000);
    scheduler.tick(clock.now_ms());
    assert_eq!(engine.borrow().current_state(), "idle");
}

proptest! {
    /// Arbitrary input never panics the evaluator; it either evaluates or
    /// rejects
    #[test]
    fn prop_evaluator_never_panics(expr in "[ -~]{0,40}") {
        let mut ctx = Context::new();
        ctx.insert("energy".to_string(), CtxValue::Num(50.0));
        ctx.insert("idleTime".to_string(), CtxValue::Num(1000.0));
        let _ = evaluate_condition(&expr, &ctx);
    }

    /// Well-formed numeric comparisons always evaluate cleanly
    #[test]
    fn prop_numeric_comparisons_evaluate(lhs in -1000i64..1000, rhs in -1000i64..1000) {
        let mut ctx = Context::new();
        ctx.insert("x".to_string(), CtxValue::Num(lhs as f64));
        let result = evaluate_condition(&format!("x < {rhs}"), &ctx);
        prop_assert_eq!(result.unwrap(), (lhs as f64) < (rhs as f64));
    }
}
