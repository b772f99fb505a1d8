//! Cooperative scheduler with a virtual clock
//!
//! Deferred work is queued as [`Task`] values and run by the page between
//! host inputs. Zero-delay tasks model a single yield of the event loop.

use crate::a11y::motion::CompletionId;
use crate::modal::ModalHandle;

/// Deferred work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// Second phase of a modal open: add the animate-in class
    AnimateModal(ModalHandle),
    /// Give up on an awaited animation/transition
    ExpireCompletion(CompletionId),
}

#[derive(Debug, Clone)]
struct Scheduled {
    due_ms: u64,
    seq: u64,
    task: Task,
}

/// Task queue ordered by due time, then by scheduling order
#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    next_seq: u64,
    queue: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Run `task` after the current turn
    pub fn defer(&mut self, task: Task) {
        self.schedule(0, task);
    }

    /// Run `task` once `delay_ms` of virtual time has passed
    pub fn schedule(&mut self, delay_ms: u64, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Scheduled {
            due_ms: self.now_ms.saturating_add(delay_ms),
            seq,
            task,
        });
    }

    /// Remove and return the earliest task due at or before `until_ms`
    ///
    /// The clock moves forward to the task's due time.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Task> {
        let index = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, s)| s.due_ms <= until_ms)
            .min_by_key(|(_, s)| (s.due_ms, s.seq))
            .map(|(i, _)| i)?;
        let scheduled = self.queue.remove(index);
        self.now_ms = self.now_ms.max(scheduled.due_ms);
        Some(scheduled.task)
    }

    /// Move the clock to `ms` without running anything
    pub fn set_now(&mut self, ms: u64) {
        self.now_ms = self.now_ms.max(ms);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_tasks_run_in_order() {
        let mut scheduler = Scheduler::new();
        scheduler.defer(Task::AnimateModal(ModalHandle::from_index(0)));
        scheduler.defer(Task::AnimateModal(ModalHandle::from_index(1)));

        assert_eq!(
            scheduler.pop_due(0),
            Some(Task::AnimateModal(ModalHandle::from_index(0)))
        );
        assert_eq!(
            scheduler.pop_due(0),
            Some(Task::AnimateModal(ModalHandle::from_index(1)))
        );
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_delayed_task_waits_for_clock() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(100, Task::ExpireCompletion(CompletionId::from_raw(7)));
        scheduler.defer(Task::AnimateModal(ModalHandle::from_index(0)));

        assert!(scheduler.pop_due(0).is_some());
        assert_eq!(scheduler.pop_due(99), None);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(
            scheduler.pop_due(250),
            Some(Task::ExpireCompletion(CompletionId::from_raw(7)))
        );
        assert_eq!(scheduler.now_ms(), 100);
    }
}
