//! Gesture-scoped history grouping.

use crate::room::Room;

/// Pauses room history for the length of a drag gesture so the whole drag
/// becomes a single undo step.
///
/// Each gesture pauses exactly once and resumes exactly once, however many
/// times `begin_gesture` or `end_gesture` are called.
#[derive(Debug, Clone, Default)]
pub struct HistoryController {
    gesture_active: bool,
}

impl HistoryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture_active
    }

    pub fn begin_gesture<R: Room + ?Sized>(&mut self, room: &mut R) {
        if !self.gesture_active {
            room.pause_history();
            self.gesture_active = true;
        }
    }

    pub fn end_gesture<R: Room + ?Sized>(&mut self, room: &mut R) {
        if self.gesture_active {
            room.resume_history();
            self.gesture_active = false;
        }
    }

    /// Undo the last local step. Ignored while a gesture is in progress.
    pub fn undo<R: Room + ?Sized>(&mut self, room: &mut R) -> bool {
        if self.gesture_active {
            log::debug!("Ignoring undo during a gesture");
            return false;
        }
        room.undo()
    }

    /// Redo the last undone step. Ignored while a gesture is in progress.
    pub fn redo<R: Room + ?Sized>(&mut self, room: &mut R) -> bool {
        if self.gesture_active {
            log::debug!("Ignoring redo during a gesture");
            return false;
        }
        room.redo()
    }
}
