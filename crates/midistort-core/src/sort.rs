//! Joint sorting of events and their attributes

use crate::pattern::Pattern;

impl Pattern {
    /// Stable-sort every track by absolute tick, then restore the tick mode.
    ///
    /// Attributes travel with their events; events sharing a tick keep their
    /// stored order.
    pub fn sort_all(&mut self) {
        let was_relative = self.is_tick_relative();
        self.to_absolute_ticks();
        for track in &mut self.tracks {
            track.sort_by_tick();
        }
        if was_relative {
            self.to_relative_ticks();
        }
    }
}
