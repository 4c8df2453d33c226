//! Row animation: frame-by-frame scrolling and wrap-around of rows that leave the board.

use crate::board::{Board, BoardGeometry, RowPhase};
use crate::scheduler::{CancelToken, Scheduler, Task};
use crate::tile::RowId;
use log::trace;
use std::time::Duration;

/// ~60 frames per second.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug, Default)]
pub struct RowAnimator {
    frame: Option<CancelToken>,
}

impl RowAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_animating(&self) -> bool {
        self.frame.is_some()
    }

    /// Puts every row into `Scrolling` and schedules the frame task. No-op if already running.
    pub fn start<S: Scheduler + ?Sized>(
        &mut self,
        board: &mut Board,
        scheduler: &mut S,
        frame_interval: Duration,
    ) {
        if self.frame.is_some() {
            return;
        }
        for row in board.rows_mut() {
            row.phase = RowPhase::Scrolling;
        }
        self.frame = Some(scheduler.schedule(Task::AnimationFrame, frame_interval));
    }

    /// Cancels the pending frame. Safe to call when already stopped.
    pub fn stop<S: Scheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if let Some(token) = self.frame.take() {
            scheduler.cancel(token);
        }
    }

    /// Advances every scrolling row by `speed` px and returns the rows that wrapped.
    /// Without a geometry (board not mounted) nothing moves.
    ///
    /// All rows move before any wrapped row is placed, so the gap to the row it re-enters
    /// above is exactly one spacing.
    pub fn step(&self, board: &mut Board, speed: f32, geometry: Option<&BoardGeometry>) -> Vec<RowId> {
        let Some(geometry) = geometry.filter(|_| !board.is_empty()) else {
            return Vec::new();
        };
        let container_height = geometry.container_height;
        let resets: Vec<RowId> = (0..board.len())
            .map(RowId)
            .filter(|&id| advance_row(board, id, speed, container_height))
            .collect();
        for &id in &resets {
            let top = reset_offset(board, id, container_height);
            if let Some(row) = board.row_mut(id) {
                trace!("{id}: wrapped from {:.1} to {top:.1}", row.offset);
                row.offset = top;
            }
        }
        resets
    }
}

/// Moves one scrolling row by `speed`. Returns true when it has left the container and
/// needs a new offset from [`reset_offset`].
pub fn advance_row(board: &mut Board, id: RowId, speed: f32, container_height: f32) -> bool {
    let Some(row) = board.row_mut(id) else {
        return false;
    };
    if !row.is_scrolling() {
        return false;
    }
    row.offset += speed;
    row.offset > container_height
}

/// Where a wrapping row re-enters: spacing above the highest other scrolling row still on
/// or above the board, or its home offset when there is none.
pub fn reset_offset(board: &Board, id: RowId, container_height: f32) -> f32 {
    let highest = board
        .rows()
        .iter()
        .filter(|r| r.id != id && r.is_scrolling() && r.offset <= container_height)
        .map(|r| r.offset)
        .min_by(f32::total_cmp);
    match highest {
        Some(top) => top - board.spacing(),
        None => board.row(id).map(|r| r.home_offset).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Row;
    use crate::scheduler::ManualScheduler;
    use crate::tile::TileSize;

    fn board_with_offsets(offsets: &[f32], spacing: f32) -> Board {
        let rows = offsets
            .iter()
            .enumerate()
            .map(|(i, &o)| {
                let mut row = Row::new(RowId(i), Vec::new(), -100.0 - i as f32 * spacing);
                row.offset = o;
                row.phase = RowPhase::Scrolling;
                row
            })
            .collect();
        Board::new(rows, spacing)
    }

    fn geometry(height: f32) -> BoardGeometry {
        BoardGeometry::new(3, 100.0, height, TileSize::Xl)
    }

    #[test]
    fn wrapped_row_lands_one_spacing_above_the_highest_row() {
        let mut board = board_with_offsets(&[598.0, -200.0], 400.0);
        let anim = RowAnimator::new();
        let resets = anim.step(&mut board, 3.0, Some(&geometry(600.0)));
        assert_eq!(resets, vec![RowId(0)]);
        assert_eq!(board.rows()[1].offset, -197.0);
        assert_eq!(board.rows()[0].offset, -597.0);
    }

    #[test]
    fn spacing_stays_uniform_over_many_wraps() {
        let mut board = board_with_offsets(&[598.0, 198.0, -202.0], 400.0);
        let anim = RowAnimator::new();
        let geometry = geometry(600.0);
        let mut wraps = 0;
        for _ in 0..2000 {
            wraps += anim.step(&mut board, 3.0, Some(&geometry)).len();
            let mut offsets: Vec<f32> = board.rows().iter().map(|r| r.offset).collect();
            offsets.sort_by(f32::total_cmp);
            for pair in offsets.windows(2) {
                assert!((pair[1] - pair[0] - 400.0).abs() < 1e-3, "{offsets:?}");
            }
        }
        assert!(wraps > 10);
    }

    #[test]
    fn lone_row_falls_back_to_home_offset() {
        let mut board = board_with_offsets(&[599.0], 400.0);
        let anim = RowAnimator::new();
        assert_eq!(anim.step(&mut board, 5.0, Some(&geometry(600.0))), vec![RowId(0)]);
        assert_eq!(board.rows()[0].offset, -100.0);
    }

    #[test]
    fn positioned_rows_do_not_move_or_count_as_highest() {
        let mut board = board_with_offsets(&[599.0, -200.0], 400.0);
        board.rows_mut()[1].phase = RowPhase::Positioned;
        let anim = RowAnimator::new();
        anim.step(&mut board, 5.0, Some(&geometry(600.0)));
        assert_eq!(board.rows()[1].offset, -200.0);
        assert_eq!(board.rows()[0].offset, -100.0);
    }

    #[test]
    fn unmounted_board_is_a_no_op() {
        let mut board = board_with_offsets(&[10.0], 400.0);
        let anim = RowAnimator::new();
        assert!(anim.step(&mut board, 5.0, None).is_empty());
        assert_eq!(board.rows()[0].offset, 10.0);
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let mut sched = ManualScheduler::new();
        let mut board = board_with_offsets(&[0.0, 0.0], 400.0);
        let mut anim = RowAnimator::new();
        anim.start(&mut board, &mut sched, DEFAULT_FRAME_INTERVAL);
        anim.start(&mut board, &mut sched, DEFAULT_FRAME_INTERVAL);
        assert_eq!(sched.active_timers(), 1);
        anim.stop(&mut sched);
        anim.stop(&mut sched);
        assert!(!anim.is_animating());
        assert_eq!(sched.active_timers(), 0);
    }
}
