//! Repeating timers for the game loop: animation frames, collision polls, the wall clock.
//!
//! Handlers are not closures; a timer yields a [`Task`] tag and the runtime dispatches it.
//! That keeps the shared game state in one owner and lets tests drive time by hand.

use std::time::{Duration, Instant};

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    AnimationFrame,
    CollisionPoll,
    ClockTick,
}

/// Handle returned by [`Scheduler::schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CancelToken(u64);

pub trait Scheduler {
    /// Fire `task` every `every` from now on.
    fn schedule(&mut self, task: Task, every: Duration) -> CancelToken;
    /// Cancelling an unknown or already cancelled token is a no-op.
    fn cancel(&mut self, token: CancelToken);
    /// Tasks due since the last poll. Each timer fires at most once per poll.
    fn poll_due(&mut self) -> Vec<Task>;
    /// Time since the scheduler was created.
    fn now(&self) -> Duration;
}

#[derive(Debug, Clone)]
struct Timer {
    token: CancelToken,
    task: Task,
    every: Duration,
    next_due: Duration,
}

/// Timer list keyed on time elapsed since some origin.
#[derive(Debug, Default)]
struct TimerQueue {
    timers: Vec<Timer>,
    next_id: u64,
}

impl TimerQueue {
    fn schedule(&mut self, now: Duration, task: Task, every: Duration) -> CancelToken {
        let token = CancelToken(self.next_id);
        self.next_id += 1;
        let every = every.max(Duration::from_millis(1));
        self.timers.push(Timer {
            token,
            task,
            every,
            next_due: now + every,
        });
        token
    }

    fn cancel(&mut self, token: CancelToken) {
        self.timers.retain(|t| t.token != token);
    }

    fn due(&mut self, now: Duration) -> Vec<Task> {
        let mut fired = Vec::new();
        for timer in &mut self.timers {
            if timer.next_due > now {
                continue;
            }
            fired.push(timer.task);
            timer.next_due += timer.every;
            // Missed periods are dropped rather than replayed.
            if timer.next_due <= now {
                timer.next_due = now + timer.every;
            }
        }
        fired
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.timers.len()
    }
}

/// Scheduler backed by the monotonic clock.
#[derive(Debug)]
pub struct WallScheduler {
    origin: Instant,
    queue: TimerQueue,
}

impl WallScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            queue: TimerQueue::default(),
        }
    }
}

impl Default for WallScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for WallScheduler {
    fn schedule(&mut self, task: Task, every: Duration) -> CancelToken {
        let now = self.now();
        self.queue.schedule(now, task, every)
    }

    fn cancel(&mut self, token: CancelToken) {
        self.queue.cancel(token);
    }

    fn poll_due(&mut self) -> Vec<Task> {
        let now = self.now();
        self.queue.due(now)
    }

    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Deterministic scheduler: time only moves when [`ManualScheduler::advance`] is called.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    queue: TimerQueue,
}

#[cfg(test)]
impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }

    /// Number of live timers.
    pub fn active_timers(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
impl Scheduler for ManualScheduler {
    fn schedule(&mut self, task: Task, every: Duration) -> CancelToken {
        self.queue.schedule(self.now, task, every)
    }

    fn cancel(&mut self, token: CancelToken) {
        self.queue.cancel(token);
    }

    fn poll_due(&mut self) -> Vec<Task> {
        self.queue.due(self.now)
    }

    fn now(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);

    #[test]
    fn fires_only_when_due() {
        let mut s = ManualScheduler::new();
        s.schedule(Task::CollisionPoll, MS_100);
        s.advance(Duration::from_millis(99));
        assert!(s.poll_due().is_empty());
        s.advance(Duration::from_millis(1));
        assert_eq!(s.poll_due(), vec![Task::CollisionPoll]);
        assert!(s.poll_due().is_empty());
    }

    #[test]
    fn late_poll_does_not_replay_missed_periods() {
        let mut s = ManualScheduler::new();
        s.schedule(Task::AnimationFrame, MS_100);
        s.advance(Duration::from_millis(550));
        assert_eq!(s.poll_due(), vec![Task::AnimationFrame]);
        assert!(s.poll_due().is_empty());
        s.advance(MS_100);
        assert_eq!(s.poll_due(), vec![Task::AnimationFrame]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut s = ManualScheduler::new();
        let token = s.schedule(Task::ClockTick, MS_100);
        s.cancel(token);
        s.cancel(token);
        assert_eq!(s.active_timers(), 0);
        s.advance(Duration::from_secs(1));
        assert!(s.poll_due().is_empty());
    }
}
