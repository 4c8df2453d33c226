//! Collision detection between the character hit area and the tiles of each row.
//!
//! Sampling runs on its own fixed interval, independent of the animation frame rate. A row
//! that produced a hit stays latched until it is cleared on reset, so one pass scores once.

use crate::scheduler::{CancelToken, Scheduler, Task};
use crate::tile::RowId;
use log::debug;
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Axis-aligned box in virtual px; `top` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl HitBox {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Strict overlap: touching edges do not collide.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.left < other.right()
            && self.right() > other.left
            && self.top < other.bottom()
            && self.bottom() > other.top
    }
}

#[derive(Debug, Default)]
pub struct CollisionDetector {
    character: Option<HitBox>,
    collided: HashSet<RowId>,
    poll: Option<CancelToken>,
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while the character is not mounted; checks then find nothing.
    pub fn set_character_hit_area(&mut self, hit_area: Option<HitBox>) {
        self.character = hit_area;
    }

    /// Starts the periodic poll, replacing any poll already running.
    pub fn start_checking<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S, interval: Duration) {
        self.stop_checking(scheduler);
        self.poll = Some(scheduler.schedule(Task::CollisionPoll, interval));
    }

    pub fn stop_checking<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(token) = self.poll.take() {
            scheduler.cancel(token);
        }
    }

    pub fn is_checking(&self) -> bool {
        self.poll.is_some()
    }

    #[cfg(test)]
    pub fn is_collided(&self, row: RowId) -> bool {
        self.collided.contains(&row)
    }

    /// Latches `row` so further checks skip it until [`Self::clear_row`].
    pub fn disable_row(&mut self, row: RowId) {
        self.collided.insert(row);
    }

    pub fn clear_row(&mut self, row: RowId) {
        self.collided.remove(&row);
    }

    pub fn clear_all(&mut self) {
        self.collided.clear();
    }

    #[cfg(test)]
    pub fn collided_rows(&self) -> usize {
        self.collided.len()
    }

    /// Index of the first tile overlapping the character; latches the row on a hit.
    pub fn check_row<I>(&mut self, row: RowId, tiles: I) -> Option<usize>
    where
        I: IntoIterator<Item = (usize, HitBox)>,
    {
        if self.collided.contains(&row) {
            return None;
        }
        let character = self.character?;
        let (index, _) = tiles
            .into_iter()
            .find(|(_, tile)| character.overlaps(tile))?;
        self.collided.insert(row);
        debug!("{row}: collision with tile {index}");
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::ManualScheduler;

    fn hb(left: f32, top: f32, size: f32) -> HitBox {
        HitBox {
            left,
            top,
            width: size,
            height: size,
        }
    }

    #[test]
    fn overlap_is_strict() {
        let a = hb(0.0, 0.0, 10.0);
        assert!(a.overlaps(&hb(5.0, 5.0, 10.0)));
        assert!(!a.overlaps(&hb(10.0, 0.0, 10.0)));
        assert!(!a.overlaps(&hb(0.0, 10.0, 10.0)));
    }

    #[test]
    fn hit_latches_until_cleared() {
        let mut det = CollisionDetector::new();
        det.set_character_hit_area(Some(hb(100.0, 500.0, 50.0)));
        let tiles = || vec![(0, hb(0.0, 490.0, 60.0)), (1, hb(100.0, 490.0, 60.0))];
        assert_eq!(det.check_row(RowId(0), tiles()), Some(1));
        assert_eq!(det.check_row(RowId(0), tiles()), None);
        assert!(det.is_collided(RowId(0)));
        det.clear_row(RowId(0));
        assert_eq!(det.check_row(RowId(0), tiles()), Some(1));
    }

    #[test]
    fn no_character_means_no_collision() {
        let mut det = CollisionDetector::new();
        assert_eq!(det.check_row(RowId(0), vec![(0, hb(0.0, 0.0, 10.0))]), None);
        assert!(!det.is_collided(RowId(0)));
    }

    #[test]
    fn clear_all_resets_every_row() {
        let mut det = CollisionDetector::new();
        det.disable_row(RowId(0));
        det.disable_row(RowId(3));
        det.clear_all();
        assert_eq!(det.collided_rows(), 0);
    }

    #[test]
    fn stop_checking_twice_is_harmless() {
        let mut sched = ManualScheduler::new();
        let mut det = CollisionDetector::new();
        det.start_checking(&mut sched, DEFAULT_CHECK_INTERVAL);
        det.start_checking(&mut sched, DEFAULT_CHECK_INTERVAL);
        assert_eq!(sched.active_timers(), 1);
        det.stop_checking(&mut sched);
        det.stop_checking(&mut sched);
        assert!(!det.is_checking());
        assert_eq!(sched.active_timers(), 0);
    }
}
