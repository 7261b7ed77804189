//! Execution units: one OS thread per unit, each owning its runner.
//!
//! A unit receives [`JobMessage`]s on its own channel, runs them one at a
//! time and reports every job, success or failure, as a
//! [`ResultMessage`] on the dispatcher's event channel. A panicking runner
//! is reported as a failed job and the unit keeps serving.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::thread;

use rand::SeedableRng;
use rand::rngs::StdRng;
use victor_pipeline::{
    DetectionError, LineDetector, PixelBuffer, SegmentStitcher, StitchConfig, Vectorized,
};

use crate::protocol::{JobMessage, JobOutcome, ResultMessage, TaskId, UnitId};

/// Work performed by an execution unit for each job.
///
/// Each unit owns its runner exclusively, so `run` takes `&mut self` and
/// may keep per-unit state (models, scratch buffers).
pub trait JobRunner: Send + 'static {
    /// Process the pixels of task `id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DetectionError`] that rejects only this task.
    fn run(&mut self, id: TaskId, buffer: &PixelBuffer) -> Result<Vectorized, DetectionError>;
}

impl<F> JobRunner for F
where
    F: FnMut(TaskId, &PixelBuffer) -> Result<Vectorized, DetectionError> + Send + 'static,
{
    fn run(&mut self, id: TaskId, buffer: &PixelBuffer) -> Result<Vectorized, DetectionError> {
        self(id, buffer)
    }
}

/// The standard job: detect segments, then stitch them.
#[derive(Debug, Clone)]
pub struct DetectAndStitch<D> {
    detector: D,
    stitcher: SegmentStitcher,
    seed: Option<u64>,
}

impl<D> DetectAndStitch<D> {
    /// Build a runner around `detector`.
    ///
    /// With a `seed`, each task's bridge jitter comes from a generator
    /// seeded with `seed ^ task id`, so results are reproducible no matter
    /// which unit runs the task. Without one, jitter draws from entropy.
    #[must_use]
    pub const fn new(detector: D, stitch: StitchConfig, seed: Option<u64>) -> Self {
        Self {
            detector,
            stitcher: SegmentStitcher::new(stitch),
            seed,
        }
    }
}

impl<D> JobRunner for DetectAndStitch<D>
where
    D: LineDetector + Send + 'static,
{
    fn run(&mut self, id: TaskId, buffer: &PixelBuffer) -> Result<Vectorized, DetectionError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ id.get()),
            None => StdRng::from_entropy(),
        };
        victor_pipeline::vectorize(&self.detector, &self.stitcher, buffer, &mut rng)
    }
}

/// Spawn the thread for `unit`.
///
/// Results are wrapped with `wrap` before being sent on `events`, so the
/// unit does not need to know the dispatcher's event type. The thread
/// exits when its job channel closes or the event channel is gone.
pub(crate) fn spawn<R, E>(
    unit: UnitId,
    mut runner: R,
    events: Sender<E>,
    wrap: fn(UnitId, ResultMessage) -> E,
) -> io::Result<Sender<JobMessage>>
where
    R: JobRunner,
    E: Send + 'static,
{
    let (jobs_tx, jobs_rx) = mpsc::channel::<JobMessage>();

    thread::Builder::new()
        .name(format!("victor-unit-{}", unit.index()))
        .spawn(move || {
            for job in jobs_rx {
                let id = job.id;
                tracing::debug!(%unit, %id, "job started");
                let outcome = run_job(&mut runner, job);
                if events.send(wrap(unit, ResultMessage { id, outcome })).is_err() {
                    break;
                }
            }
            tracing::debug!(%unit, "execution unit stopped");
        })?;

    Ok(jobs_tx)
}

/// Run one job to an outcome. Never unwinds.
pub(crate) fn run_job<R: JobRunner + ?Sized>(runner: &mut R, job: JobMessage) -> JobOutcome {
    let JobMessage {
        id,
        pixel_data,
        width,
        height,
    } = job;

    let buffer = match PixelBuffer::new(width, height, pixel_data) {
        Ok(buffer) => buffer,
        Err(e) => {
            return JobOutcome::Failed {
                error: e.to_string(),
            };
        }
    };

    // The runner may be left mid-update by a panic; it is reused anyway
    // since every job builds its own state from the buffer.
    match panic::catch_unwind(AssertUnwindSafe(|| runner.run(id, &buffer))) {
        Ok(Ok(vectorized)) => JobOutcome::Done(vectorized),
        Ok(Err(e)) => JobOutcome::Failed {
            error: e.to_string(),
        },
        Err(payload) => JobOutcome::Failed {
            error: format!("runner panicked: {}", panic_message(payload.as_ref())),
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}
