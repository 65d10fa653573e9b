//! Time sources for the behavior core
//!
//! Every timer in the crate is a millisecond deadline checked by a
//! `tick(now)` pump, so components never block. The `Clock` trait supplies
//! both the monotonically advancing millisecond counter the deadlines are
//! measured against and the local wall-clock fields (hour, minute, weekday)
//! the trigger scheduler exposes to conditions.

use chrono::{Datelike, Local, Timelike};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Local wall-clock fields consumed by trigger conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    pub hour: u32,
    pub minute: u32,
    /// 0 = Sunday .. 6 = Saturday
    pub day_of_week: u32,
}

pub trait Clock {
    /// Milliseconds since the clock's epoch
    fn now_ms(&self) -> u64;

    /// Current local time of day
    fn local_time(&self) -> LocalTime;
}

/// Real wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn local_time(&self) -> LocalTime {
        let now = Local::now();
        LocalTime {
            hour: now.hour(),
            minute: now.minute(),
            day_of_week: now.weekday().num_days_from_sunday(),
        }
    }
}

/// Settable clock for tests and demos
///
/// Clones share the same underlying cells, so a test can keep a handle and
/// advance time while components hold their own `Rc<dyn Clock>`.
#[derive(Clone)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    local: Rc<Cell<(u32, u32, u32)>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            // Noon on a Monday, far from the night-trigger window
            local: Rc::new(Cell::new((12, 0, 1))),
        }
    }

    pub fn set_ms(&self, ms: u64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set_local_time(&self, hour: u32, minute: u32, day_of_week: u32) {
        self.local.set((hour, minute, day_of_week));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn local_time(&self) -> LocalTime {
        let (hour, minute, day_of_week) = self.local.get();
        LocalTime {
            hour,
            minute,
            day_of_week,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_ms(), 0);
        clock.advance(1500);
        assert_eq!(clock.now_ms(), 1500);
        clock.set_ms(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle: Rc<dyn Clock> = Rc::new(clock.clone());
        clock.advance(250);
        assert_eq!(handle.now_ms(), 250);
    }

    #[test]
    fn test_manual_clock_local_time() {
        let clock = ManualClock::new();
        clock.set_local_time(23, 45, 5);
        let local = clock.local_time();
        assert_eq!(local.hour, 23);
        assert_eq!(local.minute, 45);
        assert_eq!(local.day_of_week, 5);
    }

    #[test]
    fn test_system_clock_is_nonzero() {
        let clock = SystemClock;
        assert!(clock.now_ms() > 0);
        assert!(clock.local_time().hour < 24);
    }
}
