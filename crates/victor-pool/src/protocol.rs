//! Messages exchanged between the dispatcher and execution units.
//!
//! Units share no memory with the dispatcher: a job goes out as a
//! [`JobMessage`] and comes back as a [`ResultMessage`] carrying the same
//! [`TaskId`]. Both are serde-serializable so the same protocol can cross
//! a process or worker boundary. The JSON shapes are:
//!
//! - job: `{"id", "pixelData", "width", "height"}`
//! - success: `{"id", "segments", "groups"}`
//! - failure: `{"id", "error"}`

use std::fmt;

use serde::{Deserialize, Serialize};
use victor_pipeline::{PixelBuffer, Vectorized};

use crate::TaskError;

/// Correlation id of one submitted task.
///
/// Unique for the lifetime of a pool; the only key used to route a
/// result back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Index of an execution unit within its pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(usize);

impl UnitId {
    /// Wrap a raw index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// The raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

/// A job sent to an execution unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobMessage {
    /// Correlation id echoed back in the result.
    pub id: TaskId,
    /// Raw RGBA bytes, row-major.
    pub pixel_data: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl JobMessage {
    /// Package a pixel buffer for task `id`.
    #[must_use]
    pub fn new(id: TaskId, buffer: PixelBuffer) -> Self {
        let (width, height) = (buffer.width(), buffer.height());
        Self {
            id,
            pixel_data: buffer.into_pixels(),
            width,
            height,
        }
    }
}

/// What a unit reports for a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobOutcome {
    /// The job produced segments and groups.
    Done(Vectorized),
    /// The job failed; no partial result is delivered.
    Failed {
        /// Human-readable failure description.
        error: String,
    },
}

impl JobOutcome {
    /// Convert into the value a caller's future resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Detection`] for a failed job.
    pub fn into_result(self) -> Result<Vectorized, TaskError> {
        match self {
            Self::Done(vectorized) => Ok(vectorized),
            Self::Failed { error } => Err(TaskError::Detection(error)),
        }
    }
}

/// A unit's reply for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage {
    /// Correlation id copied from the [`JobMessage`].
    pub id: TaskId,
    /// Success payload or failure description.
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use victor_pipeline::{RawSegment, SegmentGroup};

    use super::*;

    #[test]
    fn job_message_wire_shape() {
        let buffer = PixelBuffer::new(1, 1, vec![1, 2, 3, 4]).unwrap();
        let job = JobMessage::new(TaskId::new(7), buffer);
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 7, "pixelData": [1, 2, 3, 4], "width": 1, "height": 1})
        );
    }

    #[test]
    fn success_result_wire_shape() {
        let segment = RawSegment::from_coords(0.0, 0.0, 1.0, 1.0);
        let message = ResultMessage {
            id: TaskId::new(3),
            outcome: JobOutcome::Done(Vectorized {
                segments: vec![segment],
                groups: vec![SegmentGroup::starting_with(segment)],
            }),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["segments"], serde_json::json!([[0.0, 0.0, 1.0, 1.0]]));
        assert_eq!(
            json["groups"],
            serde_json::json!([[{"detected": [0.0, 0.0, 1.0, 1.0]}]])
        );
        assert!(json.get("error").is_none());

        let back: ResultMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, message);
    }

    #[test]
    fn failure_result_wire_shape() {
        let json = serde_json::json!({"id": 9, "error": "detector crashed"});
        let message: ResultMessage = serde_json::from_value(json).unwrap();
        assert_eq!(message.id, TaskId::new(9));
        assert!(matches!(
            message.outcome.into_result(),
            Err(TaskError::Detection(ref e)) if e == "detector crashed"
        ));
    }

    #[test]
    fn ids_display_with_kind() {
        assert_eq!(TaskId::new(4).to_string(), "task#4");
        assert_eq!(UnitId::new(1).to_string(), "unit#1");
    }
}
