//! Sans-IO scheduling state machine.
//!
//! [`Scheduler`] owns the idle set, the FIFO queue of waiting inputs and the
//! table of pending replies. It never touches a thread or a channel: the
//! caller feeds it submissions and completions and carries out the
//! [`Dispatch`]es it hands back. The pool's dispatcher thread is the only
//! owner in production; tests drive it directly.
//!
//! The reply type `R` is opaque here. The pool stores a oneshot sender;
//! tests can store anything.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use victor_pipeline::{PixelBuffer, Vectorized};

use crate::TaskError;
use crate::protocol::{JobMessage, JobOutcome, TaskId, UnitId};

/// What a unit is doing, from the scheduler's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// Waiting for work.
    Idle,
    /// Running the given task.
    Busy(TaskId),
    /// Unreachable; never dispatched to again.
    Retired,
}

/// An instruction to send `job` to `unit`.
#[derive(Debug)]
pub struct Dispatch {
    /// Unit that is now bound to the job.
    pub unit: UnitId,
    /// Message to deliver on the unit's job channel.
    pub job: JobMessage,
}

/// Result of [`Scheduler::submit`].
#[derive(Debug)]
#[must_use = "a dispatch must be sent to its unit or the task never runs"]
pub struct Submitted<R> {
    /// Id assigned to the new task.
    pub id: TaskId,
    /// Present when an idle unit took the task immediately.
    pub dispatch: Option<Dispatch>,
    /// The reply, handed back when every unit is retired and nothing can
    /// run the task.
    pub rejected: Option<R>,
}

/// Result of [`Scheduler::complete`].
#[derive(Debug)]
#[must_use = "the reply must be resolved and the next dispatch sent"]
pub struct Completed<R> {
    /// The caller's reply handle and the value to resolve it with.
    /// `None` if the id was not pending.
    pub resolve: Option<(R, Result<Vectorized, TaskError>)>,
    /// Queue head handed to the freed unit, if any.
    pub next: Option<Dispatch>,
}

/// Snapshot of pool occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Units spawned.
    pub size: usize,
    /// Units waiting for work.
    pub idle: usize,
    /// Units running a task.
    pub busy: usize,
    /// Tasks waiting for a unit.
    pub queued: usize,
    /// Tasks submitted but not yet resolved (busy + queued).
    pub pending: usize,
}

/// Scheduling state for a fixed set of units.
#[derive(Debug)]
pub struct Scheduler<R> {
    units: Vec<UnitState>,
    idle: VecDeque<UnitId>,
    queue: VecDeque<(TaskId, PixelBuffer)>,
    pending: HashMap<TaskId, R>,
    next_id: u64,
}

impl<R> Scheduler<R> {
    /// Create a scheduler for `size` units, all idle.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            units: vec![UnitState::Idle; size],
            idle: (0..size).map(UnitId::new).collect(),
            queue: VecDeque::new(),
            pending: HashMap::new(),
            next_id: 0,
        }
    }

    /// Accept a new task.
    ///
    /// The task goes to the first idle unit if there is one, otherwise to
    /// the back of the queue. `reply` is held until the task completes.
    /// With no live unit left, the reply comes straight back in
    /// [`Submitted::rejected`].
    pub fn submit(&mut self, input: PixelBuffer, reply: R) -> Submitted<R> {
        let id = TaskId::new(self.next_id);
        self.next_id += 1;

        if self.live_units() == 0 {
            tracing::warn!(%id, "no live execution unit, task rejected");
            return Submitted {
                id,
                dispatch: None,
                rejected: Some(reply),
            };
        }
        self.pending.insert(id, reply);

        let dispatch = match self.idle.pop_front() {
            Some(unit) => Some(self.bind(unit, id, input)),
            None => {
                self.queue.push_back((id, input));
                None
            }
        };

        tracing::debug!(
            %id,
            dispatched = dispatch.as_ref().map(|d| d.unit.index()),
            queued = self.queue.len(),
            "task submitted",
        );

        Submitted {
            id,
            dispatch,
            rejected: None,
        }
    }

    /// Record that `unit` finished task `id` with `outcome`.
    ///
    /// A completion counts only when `unit` is busy with exactly `id`. The
    /// unit is then freed whatever the outcome and immediately takes the
    /// queue head, if any. Any other completion is logged and ignored,
    /// leaving pending replies and the queue untouched.
    pub fn complete(&mut self, unit: UnitId, id: TaskId, outcome: JobOutcome) -> Completed<R> {
        let state = self.unit_state(unit);
        if state != Some(UnitState::Busy(id)) {
            tracing::warn!(%unit, %id, ?state, "completion does not match the unit's task");
            return Completed {
                resolve: None,
                next: None,
            };
        }

        if let JobOutcome::Failed { error } = &outcome {
            tracing::warn!(%unit, %id, %error, "task failed");
        }

        let resolve = self
            .pending
            .remove(&id)
            .map(|reply| (reply, outcome.into_result()));
        let next = self.free(unit);

        tracing::debug!(%unit, %id, next = next.as_ref().map(|d| d.job.id.get()), "task completed");

        Completed { resolve, next }
    }

    /// Take `unit` out of service after its channel broke.
    ///
    /// Returns the reply of the task that was being dispatched to it so the
    /// caller can reject it. When this retires the last live unit, the
    /// replies of every queued task follow, since nothing is left to run
    /// them.
    pub fn retire(&mut self, unit: UnitId, id: TaskId) -> Vec<R> {
        if let Some(state) = self.units.get_mut(unit.index()) {
            *state = UnitState::Retired;
        }
        self.idle.retain(|&u| u != unit);
        tracing::warn!(%unit, %id, "execution unit retired");

        let mut stranded: Vec<R> = self.pending.remove(&id).into_iter().collect();
        if self.live_units() == 0 {
            tracing::warn!(queued = self.queue.len(), "no live execution unit left");
            for (queued, _) in self.queue.drain(..) {
                stranded.extend(self.pending.remove(&queued));
            }
        }
        stranded
    }

    /// Current occupancy.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            size: self.units.len(),
            idle: self.idle_units(),
            busy: self.busy_units(),
            queued: self.queued(),
            pending: self.pending(),
        }
    }

    /// Units waiting for work.
    #[must_use]
    pub fn idle_units(&self) -> usize {
        self.idle.len()
    }

    /// Units running a task.
    #[must_use]
    pub fn busy_units(&self) -> usize {
        self.units
            .iter()
            .filter(|s| matches!(s, UnitState::Busy(_)))
            .count()
    }

    /// Units that have not been retired.
    #[must_use]
    pub fn live_units(&self) -> usize {
        self.units
            .iter()
            .filter(|s| !matches!(s, UnitState::Retired))
            .count()
    }

    /// Tasks waiting for a unit.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Tasks not yet resolved.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// State of one unit, or `None` if out of range.
    #[must_use]
    pub fn unit_state(&self, unit: UnitId) -> Option<UnitState> {
        self.units.get(unit.index()).copied()
    }

    fn bind(&mut self, unit: UnitId, id: TaskId, input: PixelBuffer) -> Dispatch {
        if let Some(state) = self.units.get_mut(unit.index()) {
            *state = UnitState::Busy(id);
        }
        Dispatch {
            unit,
            job: JobMessage::new(id, input),
        }
    }

    fn free(&mut self, unit: UnitId) -> Option<Dispatch> {
        match self.queue.pop_front() {
            Some((id, input)) => Some(self.bind(unit, id, input)),
            None => {
                if let Some(state) = self.units.get_mut(unit.index()) {
                    *state = UnitState::Idle;
                }
                self.idle.push_back(unit);
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use victor_pipeline::RawSegment;

    use super::*;

    fn input(width: u32) -> PixelBuffer {
        PixelBuffer::new(width, 1, vec![0; width as usize * 4]).unwrap()
    }

    fn done() -> JobOutcome {
        JobOutcome::Done(Vectorized::default())
    }

    #[test]
    fn submissions_up_to_size_dispatch_immediately() {
        let mut scheduler: Scheduler<()> = Scheduler::new(3);
        for _ in 0..3 {
            assert!(scheduler.submit(input(1), ()).dispatch.is_some());
        }
        let stats = scheduler.stats();
        assert_eq!(stats.busy, 3);
        assert_eq!(stats.idle, 0);
        assert_eq!(stats.queued, 0);
        assert_eq!(stats.pending, 3);
    }

    #[test]
    fn submissions_beyond_size_queue() {
        let mut scheduler: Scheduler<()> = Scheduler::new(2);
        let dispatched = (0..5)
            .map(|_| scheduler.submit(input(1), ()))
            .filter(|s| s.dispatch.is_some())
            .count();
        assert_eq!(dispatched, 2);
        assert_eq!(scheduler.queued(), 3);
        assert_eq!(scheduler.pending(), 5);
    }

    #[test]
    fn ids_are_fresh_and_increasing() {
        let mut scheduler: Scheduler<()> = Scheduler::new(1);
        let a = scheduler.submit(input(1), ()).id;
        let b = scheduler.submit(input(1), ()).id;
        assert!(b > a);
    }

    #[test]
    fn queue_dispatches_in_fifo_order_to_freed_unit() {
        let mut scheduler: Scheduler<u32> = Scheduler::new(1);
        let first = scheduler.submit(input(1), 1);
        let second = scheduler.submit(input(2), 2);
        let third = scheduler.submit(input(3), 3);
        let unit = first.dispatch.unwrap().unit;

        let completed = scheduler.complete(unit, first.id, done());
        let next = completed.next.unwrap();
        assert_eq!(next.unit, unit);
        assert_eq!(next.job.id, second.id);
        assert_eq!(next.job.width, 2);

        let completed = scheduler.complete(unit, second.id, done());
        assert_eq!(completed.next.unwrap().job.id, third.id);

        let completed = scheduler.complete(unit, third.id, done());
        assert!(completed.next.is_none());
        assert_eq!(scheduler.unit_state(unit), Some(UnitState::Idle));
    }

    #[test]
    fn completion_resolves_by_id_in_any_order() {
        let mut scheduler: Scheduler<&str> = Scheduler::new(2);
        let a = scheduler.submit(input(1), "a");
        let b = scheduler.submit(input(1), "b");
        let unit_a = a.dispatch.unwrap().unit;
        let unit_b = b.dispatch.unwrap().unit;

        let segment = RawSegment::from_coords(0.0, 0.0, 1.0, 0.0);
        let outcome = JobOutcome::Done(Vectorized {
            segments: vec![segment],
            groups: Vec::new(),
        });
        let (reply, result) = scheduler.complete(unit_b, b.id, outcome).resolve.unwrap();
        assert_eq!(reply, "b");
        assert_eq!(result.unwrap().segments, vec![segment]);

        let (reply, _) = scheduler.complete(unit_a, a.id, done()).resolve.unwrap();
        assert_eq!(reply, "a");
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn failure_rejects_only_its_task_and_frees_the_unit() {
        let mut scheduler: Scheduler<u32> = Scheduler::new(1);
        let failing = scheduler.submit(input(1), 1);
        let later = scheduler.submit(input(1), 2);
        let unit = failing.dispatch.unwrap().unit;

        let completed = scheduler.complete(
            unit,
            failing.id,
            JobOutcome::Failed {
                error: "boom".into(),
            },
        );
        let (reply, result) = completed.resolve.unwrap();
        assert_eq!(reply, 1);
        assert_eq!(result, Err(TaskError::Detection("boom".into())));
        assert_eq!(completed.next.unwrap().job.id, later.id);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn unknown_completion_is_ignored() {
        let mut scheduler: Scheduler<()> = Scheduler::new(1);
        let completed = scheduler.complete(UnitId::new(0), TaskId::new(42), done());
        assert!(completed.resolve.is_none());
        assert!(completed.next.is_none());
        assert_eq!(scheduler.idle_units(), 1);
    }

    #[test]
    fn busy_unit_reporting_a_queued_task_is_ignored() {
        let mut scheduler: Scheduler<u32> = Scheduler::new(1);
        let running = scheduler.submit(input(1), 1);
        let queued = scheduler.submit(input(2), 2);
        let unit = running.dispatch.unwrap().unit;

        let completed = scheduler.complete(unit, queued.id, done());
        assert!(completed.resolve.is_none());
        assert!(completed.next.is_none());
        assert_eq!(scheduler.unit_state(unit), Some(UnitState::Busy(running.id)));
        assert_eq!(scheduler.queued(), 1);
        assert_eq!(scheduler.pending(), 2);

        // The real completion still resolves its caller and runs the queued
        // task exactly once.
        let completed = scheduler.complete(unit, running.id, done());
        assert_eq!(completed.resolve.unwrap().0, 1);
        assert_eq!(completed.next.unwrap().job.id, queued.id);
        assert_eq!(scheduler.queued(), 0);
    }

    #[test]
    fn idle_unit_reporting_another_units_task_is_ignored() {
        let mut scheduler: Scheduler<u32> = Scheduler::new(2);
        let running = scheduler.submit(input(1), 1);
        let busy = running.dispatch.unwrap().unit;
        let idle = UnitId::new(1 - busy.index());

        let completed = scheduler.complete(idle, running.id, done());
        assert!(completed.resolve.is_none());
        assert!(completed.next.is_none());
        assert_eq!(scheduler.unit_state(idle), Some(UnitState::Idle));
        assert_eq!(scheduler.pending(), 1);

        let (reply, _) = scheduler.complete(busy, running.id, done()).resolve.unwrap();
        assert_eq!(reply, 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn retiring_the_last_unit_hands_back_queued_replies() {
        let mut scheduler: Scheduler<u32> = Scheduler::new(1);
        let running = scheduler.submit(input(1), 1);
        let _ = scheduler.submit(input(1), 2);
        let _ = scheduler.submit(input(1), 3);
        let unit = running.dispatch.unwrap().unit;

        assert_eq!(scheduler.retire(unit, running.id), vec![1, 2, 3]);
        assert_eq!(scheduler.queued(), 0);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.live_units(), 0);

        let late = scheduler.submit(input(1), 4);
        assert!(late.dispatch.is_none());
        assert_eq!(late.rejected, Some(4));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn retired_unit_is_never_dispatched_to() {
        let mut scheduler: Scheduler<u32> = Scheduler::new(2);
        let a = scheduler.submit(input(1), 1);
        let dispatch = a.dispatch.unwrap();
        assert_eq!(scheduler.retire(dispatch.unit, a.id), vec![1]);
        assert_eq!(scheduler.unit_state(dispatch.unit), Some(UnitState::Retired));

        let b = scheduler.submit(input(1), 2);
        assert_ne!(b.dispatch.unwrap().unit, dispatch.unit);
        let c = scheduler.submit(input(1), 3);
        assert!(c.dispatch.is_none());
        assert_eq!(scheduler.stats().size, 2);
        assert_eq!(scheduler.busy_units(), 1);
    }
}
