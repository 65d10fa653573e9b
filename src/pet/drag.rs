//! Pointer input adapter
//!
//! Translates raw pointer events into interaction outcomes: movement past
//! a small threshold while pressed becomes a drag, a press-and-release
//! without crossing it is a click. No state-machine logic lives here; the
//! orchestrator maps outcomes onto engine transitions.

/// Movement below this many pixels still counts as a click
pub const DRAG_THRESHOLD_PX: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerOutcome {
    None,
    /// The pointer crossed the drag threshold while pressed
    DragStart,
    /// Released after dragging
    DragEnd,
    /// Released without ever crossing the threshold
    Click,
}

#[derive(Debug, Default)]
pub struct DragController {
    pressed: bool,
    dragging: bool,
    origin: (f64, f64),
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.pressed = true;
        self.dragging = false;
        self.origin = (x, y);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> PointerOutcome {
        if !self.pressed || self.dragging {
            return PointerOutcome::None;
        }
        let dx = x - self.origin.0;
        let dy = y - self.origin.1;
        if (dx * dx + dy * dy).sqrt() > DRAG_THRESHOLD_PX {
            self.dragging = true;
            return PointerOutcome::DragStart;
        }
        PointerOutcome::None
    }

    pub fn pointer_up(&mut self) -> PointerOutcome {
        if !self.pressed {
            return PointerOutcome::None;
        }
        self.pressed = false;
        if self.dragging {
            self.dragging = false;
            PointerOutcome::DragEnd
        } else {
            PointerOutcome::Click
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_without_movement() {
        let mut drag = DragController::new();
        drag.pointer_down(100.0, 100.0);
        assert_eq!(drag.pointer_up(), PointerOutcome::Click);
    }

    #[test]
    fn test_small_movement_is_still_click() {
        let mut drag = DragController::new();
        drag.pointer_down(100.0, 100.0);
        assert_eq!(drag.pointer_move(103.0, 103.0), PointerOutcome::None);
        assert_eq!(drag.pointer_up(), PointerOutcome::Click);
    }

    #[test]
    fn test_threshold_crossing_starts_drag() {
        let mut drag = DragController::new();
        drag.pointer_down(100.0, 100.0);
        assert_eq!(drag.pointer_move(110.0, 100.0), PointerOutcome::DragStart);
        assert!(drag.is_dragging());
        // Further movement stays silent
        assert_eq!(drag.pointer_move(120.0, 100.0), PointerOutcome::None);
        assert_eq!(drag.pointer_up(), PointerOutcome::DragEnd);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_move_without_press_ignored() {
        let mut drag = DragController::new();
        assert_eq!(drag.pointer_move(500.0, 500.0), PointerOutcome::None);
        assert_eq!(drag.pointer_up(), PointerOutcome::None);
    }
}
