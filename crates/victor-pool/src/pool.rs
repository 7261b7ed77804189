//! The thread-backed pool: unit threads plus one dispatcher thread.
//!
//! Every state change goes through the dispatcher's event channel:
//! submissions from callers, results from units, stats queries and
//! shutdown. The dispatcher owns the only [`Scheduler`], so the queue, the
//! idle set and the pending table are never touched from two threads.

use std::future::Future;
use std::pin::Pin;
use std::sync::mpsc::{self, Receiver, Sender};
use std::task::{Context, Poll};
use std::thread::{self, JoinHandle};

use futures::channel::oneshot;
use victor_pipeline::{LineDetector, PixelBuffer, StitchConfig, Vectorized};

use crate::config::PoolConfig;
use crate::protocol::{JobMessage, ResultMessage, UnitId};
use crate::scheduler::{Completed, Dispatch, PoolStats, Scheduler};
use crate::unit::{self, DetectAndStitch, JobRunner};
use crate::{PoolError, TaskError};

type Reply = oneshot::Sender<Result<Vectorized, TaskError>>;

enum Event {
    Submit {
        input: PixelBuffer,
        reply: Reply,
    },
    Finished {
        unit: UnitId,
        message: ResultMessage,
    },
    Stats(mpsc::Sender<PoolStats>),
    Shutdown,
}

/// A fixed set of execution units fed from one FIFO queue.
///
/// `submit` never blocks: it hands the input to the dispatcher and
/// returns a [`TaskHandle`] that resolves once a unit has processed it.
/// Dropping the pool stops the dispatcher; handles that have not resolved
/// yet resolve to [`TaskError::PoolClosed`].
#[derive(Debug)]
pub struct WorkerPool {
    events: Sender<Event>,
    size: usize,
    dispatcher: Option<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` execution units, each running the runner `factory`
    /// builds for it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroSize`] if `size` is zero, or
    /// [`PoolError::Spawn`] if a thread cannot be started. Units spawned
    /// before a failure exit on their own.
    pub fn new<F, R>(factory: F, size: usize) -> Result<Self, PoolError>
    where
        F: Fn(UnitId) -> R,
        R: JobRunner,
    {
        if size == 0 {
            return Err(PoolError::ZeroSize);
        }

        let (events_tx, events_rx) = mpsc::channel();

        let units = (0..size)
            .map(UnitId::new)
            .map(|id| {
                unit::spawn(id, factory(id), events_tx.clone(), |unit, message| {
                    Event::Finished { unit, message }
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(PoolError::Spawn)?;

        let dispatcher = thread::Builder::new()
            .name("victor-dispatch".into())
            .spawn(move || dispatch_loop(&events_rx, &units))
            .map_err(PoolError::Spawn)?;

        tracing::debug!(size, "worker pool started");

        Ok(Self {
            events: events_tx,
            size,
            dispatcher: Some(dispatcher),
        })
    }

    /// A pool whose units each run [`DetectAndStitch`] with a clone of
    /// `detector`, sized from `config`.
    ///
    /// # Errors
    ///
    /// See [`WorkerPool::new`].
    pub fn with_detector<D>(
        detector: D,
        stitch: StitchConfig,
        config: &PoolConfig,
    ) -> Result<Self, PoolError>
    where
        D: LineDetector + Clone + Send + 'static,
    {
        let seed = config.seed;
        Self::new(
            |_| DetectAndStitch::new(detector.clone(), stitch, seed),
            config.size,
        )
    }

    /// Number of execution units.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Queue `input` for processing.
    ///
    /// Returns at once. The task starts as soon as a unit is free; tasks
    /// start in submission order but may finish in any order. Dropping the
    /// handle does not cancel the task.
    pub fn submit(&self, input: PixelBuffer) -> TaskHandle {
        let (reply, rx) = oneshot::channel();
        // A closed dispatcher drops the event and with it `reply`, which
        // resolves the handle to `PoolClosed`.
        let _ = self.events.send(Event::Submit { input, reply });
        TaskHandle { rx }
    }

    /// Snapshot of unit and queue occupancy.
    ///
    /// Ordered after every `submit` made earlier from this thread. Returns
    /// an empty snapshot if the dispatcher has stopped.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let (tx, rx) = mpsc::channel();
        if self.events.send(Event::Stats(tx)).is_err() {
            return PoolStats::default();
        }
        rx.recv().unwrap_or_default()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let _ = self.events.send(Event::Shutdown);
        if let Some(dispatcher) = self.dispatcher.take() {
            // Units are detached; a unit stuck in a job is never joined.
            let _ = dispatcher.join();
        }
        tracing::debug!(size = self.size, "worker pool stopped");
    }
}

/// Resolves to the result of one submitted task.
#[derive(Debug)]
pub struct TaskHandle {
    rx: oneshot::Receiver<Result<Vectorized, TaskError>>,
}

impl Future for TaskHandle {
    type Output = Result<Vectorized, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::PoolClosed)))
    }
}

fn dispatch_loop(events: &Receiver<Event>, units: &[Sender<JobMessage>]) {
    let mut scheduler: Scheduler<Reply> = Scheduler::new(units.len());

    for event in events {
        match event {
            Event::Submit { input, reply } => {
                let submitted = scheduler.submit(input, reply);
                if let Some(reply) = submitted.rejected {
                    let _ = reply.send(Err(TaskError::UnitLost));
                }
                if let Some(dispatch) = submitted.dispatch {
                    send(&mut scheduler, units, dispatch);
                }
            }
            Event::Finished { unit, message } => {
                let Completed { resolve, next } =
                    scheduler.complete(unit, message.id, message.outcome);
                if let Some((reply, result)) = resolve {
                    // The caller may have dropped its handle.
                    let _ = reply.send(result);
                }
                if let Some(dispatch) = next {
                    send(&mut scheduler, units, dispatch);
                }
            }
            Event::Stats(tx) => {
                let _ = tx.send(scheduler.stats());
            }
            Event::Shutdown => break,
        }
    }

    tracing::debug!(
        unresolved = scheduler.pending(),
        "dispatcher stopped",
    );
}

/// Hand a job to its unit, retiring the unit if its thread is gone.
fn send(scheduler: &mut Scheduler<Reply>, units: &[Sender<JobMessage>], dispatch: Dispatch) {
    let Dispatch { unit, job } = dispatch;
    let id = job.id;
    let delivered = units
        .get(unit.index())
        .is_some_and(|jobs| jobs.send(job).is_ok());
    if !delivered {
        tracing::error!(%unit, %id, "execution unit unreachable");
        for reply in scheduler.retire(unit, id) {
            let _ = reply.send(Err(TaskError::UnitLost));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::executor::block_on;
    use victor_pipeline::{DetectionError, RawSegment};

    use super::*;
    use crate::protocol::TaskId;

    fn input() -> PixelBuffer {
        PixelBuffer::new(2, 2, vec![0; 16]).unwrap()
    }

    fn one_segment(_: TaskId, _: &PixelBuffer) -> Result<Vectorized, DetectionError> {
        Ok(Vectorized {
            segments: vec![RawSegment::from_coords(0.0, 0.0, 1.0, 1.0)],
            groups: Vec::new(),
        })
    }

    #[test]
    fn zero_size_is_rejected() {
        let result = WorkerPool::new(|_| one_segment, 0);
        assert!(matches!(result, Err(PoolError::ZeroSize)));
    }

    #[test]
    fn submit_resolves_with_runner_output() {
        let pool = WorkerPool::new(|_| one_segment, 1).unwrap();
        let result = block_on(pool.submit(input())).unwrap();
        assert_eq!(result.segments.len(), 1);
    }

    #[test]
    fn stats_reports_size_and_idle_units() {
        let pool = WorkerPool::new(|_| one_segment, 3).unwrap();
        let stats = pool.stats();
        assert_eq!(stats.size, 3);
        assert_eq!(stats.idle, 3);
        assert_eq!(stats.pending, 0);
        assert_eq!(pool.size(), 3);
    }

    #[test]
    fn dropped_pool_closes_pending_handles() {
        let (_gate_tx, gate_rx) = mpsc::channel::<()>();
        let gate = std::sync::Mutex::new(Some(gate_rx));
        let pool = WorkerPool::new(
            |_| {
                let gate = gate.lock().unwrap().take();
                move |_: TaskId, _: &PixelBuffer| -> Result<Vectorized, DetectionError> {
                    if let Some(gate) = &gate {
                        let _ = gate.recv();
                    }
                    Ok(Vectorized::default())
                }
            },
            1,
        )
        .unwrap();

        let running = pool.submit(input());
        let queued = pool.submit(input());
        drop(pool);

        assert_eq!(block_on(running), Err(TaskError::PoolClosed));
        assert_eq!(block_on(queued), Err(TaskError::PoolClosed));
    }
}
