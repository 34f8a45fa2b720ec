//! Repeating task scheduling for slideshow autoplay
//!
//! The controller only ever sees the `Scheduler` trait and an opaque
//! `TaskHandle`. The event loop drives a `TimerQueue`: it sleeps until
//! `next_deadline()` and feeds every handle from `take_due()` back into the
//! controller as an autoplay tick.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Opaque handle for a scheduled repeating task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub(crate) fn from_id(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Source of cancellable repeating tasks
pub trait Scheduler {
    /// Schedule a task that fires every `period`, first firing one period from now
    fn schedule_repeating(&mut self, period: Duration) -> TaskHandle;

    /// Cancel a task. Must be synchronous (no tick for `handle` may be
    /// delivered afterwards) and idempotent.
    fn cancel(&mut self, handle: TaskHandle);
}

#[derive(Debug, Clone, Copy)]
struct Timer {
    period: Duration,
    deadline: Instant,
}

/// Deadline-ordered repeating timers for a single-threaded event loop
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    timers: BTreeMap<TaskHandle, Timer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn schedule_repeating_from(&mut self, now: Instant, period: Duration) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle::from_id(self.next_id);
        self.timers.insert(
            handle,
            Timer {
                period,
                deadline: now + period,
            },
        );
        debug!(task = handle.0, period_ms = period.as_millis() as u64, "Scheduled repeating task");
        handle
    }

    /// Earliest pending deadline, if any task is scheduled
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.deadline).min()
    }

    /// Collect every task due at `now` and re-arm it for its next period.
    /// A task that fell several periods behind fires once, not once per
    /// missed period.
    pub fn take_due(&mut self, now: Instant) -> Vec<TaskHandle> {
        let mut due = Vec::new();
        for (handle, timer) in self.timers.iter_mut() {
            if timer.deadline <= now {
                due.push(*handle);
                timer.deadline += timer.period;
                if timer.deadline <= now {
                    timer.deadline = now + timer.period;
                }
                trace!(task = handle.0, "Task due");
            }
        }
        due
    }

    #[cfg(test)]
    pub fn is_active(&self, handle: TaskHandle) -> bool {
        self.timers.contains_key(&handle)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}

impl Scheduler for TimerQueue {
    fn schedule_repeating(&mut self, period: Duration) -> TaskHandle {
        self.schedule_repeating_from(Instant::now(), period)
    }

    fn cancel(&mut self, handle: TaskHandle) {
        if self.timers.remove(&handle).is_some() {
            debug!(task = handle.0, "Cancelled repeating task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_fires_after_one_period() {
        let start = Instant::now();
        let mut queue = TimerQueue::new();
        let handle = queue.schedule_repeating_from(start, Duration::from_millis(3000));

        assert_eq!(queue.next_deadline(), Some(start + Duration::from_millis(3000)));
        assert!(queue.take_due(start + Duration::from_millis(2999)).is_empty());
        assert_eq!(queue.take_due(start + Duration::from_millis(3000)), vec![handle]);

        // Re-armed for the following period
        assert_eq!(queue.next_deadline(), Some(start + Duration::from_millis(6000)));
    }

    #[test]
    fn test_late_task_fires_once() {
        let start = Instant::now();
        let mut queue = TimerQueue::new();
        let handle = queue.schedule_repeating_from(start, Duration::from_millis(100));

        let late = start + Duration::from_millis(1050);
        assert_eq!(queue.take_due(late), vec![handle]);
        assert!(queue.take_due(late).is_empty());
        assert_eq!(queue.next_deadline(), Some(late + Duration::from_millis(100)));
    }

    #[test]
    fn test_cancel_is_synchronous_and_idempotent() {
        let start = Instant::now();
        let mut queue = TimerQueue::new();
        let handle = queue.schedule_repeating_from(start, Duration::from_millis(10));

        queue.cancel(handle);
        queue.cancel(handle);

        assert!(!queue.is_active(handle));
        assert!(queue.is_empty());
        assert_eq!(queue.next_deadline(), None);
        assert!(queue.take_due(start + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn test_handles_are_unique() {
        let start = Instant::now();
        let mut queue = TimerQueue::new();
        let first = queue.schedule_repeating_from(start, Duration::from_millis(10));
        queue.cancel(first);
        let second = queue.schedule_repeating_from(start, Duration::from_millis(10));

        assert_ne!(first, second);
        assert_eq!(queue.len(), 1);
    }
}
