//! Core types for the motion log decoder library
//!
//! This module defines the records read from the log, the payload shapes of
//! the motion topics, and the error type shared by every component.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// A single decoded record from a framed log stream
///
/// Records are opaque structured maps. Main log records carry a topic (`q`)
/// and a payload (`params`); index records carry `status` and
/// `file_position`.
pub type Record = Value;

/// Errors that can occur during decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Unknown dataset '{0}'")]
    UnknownDataset(String),

    #[error("Invalid number of parameters for {category}: expected {expected}, found {found}")]
    InvalidParameterCount {
        category: String,
        expected: usize,
        found: usize,
    },

    #[error("Unknown {category} data selection '{selection}'")]
    UnknownSelection { category: String, selection: String },

    #[error("Topic not registered with the dispatcher: {0}")]
    UnregisteredTopic(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Index log contains no snapshots")]
    EmptyIndex,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Topic name of the status records that drive the flow-control watermark
pub const STATUS_TOPIC: &str = "status";

/// A status snapshot (the `status` map of an index record)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot(Value);

impl StatusSnapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Raw status map
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Look up a field of one status object, e.g. `("toolhead", "position")`
    pub fn field(&self, object: &str, field: &str) -> Option<&Value> {
        self.0.get(object)?.get(field)
    }

    /// `toolhead.estimated_print_time`, required in every snapshot
    pub fn estimated_print_time(&self) -> Result<f64> {
        self.field("toolhead", "estimated_print_time")
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                DecoderError::MalformedRecord(
                    "status snapshot without toolhead.estimated_print_time".to_string(),
                )
            })
    }

    /// Time of the snapshot: the later of the estimated and scheduled print times
    pub fn effective_time(&self) -> Result<f64> {
        let estimated = self.estimated_print_time()?;
        let print_time = self
            .field("toolhead", "print_time")
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        Ok(estimated.max(print_time))
    }
}

/// One entry of the index log
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSnapshot {
    /// Full status at the time the snapshot was written
    pub status: StatusSnapshot,
    /// Offset of a full-flush boundary in the main log's compressed stream
    pub file_position: u64,
}

impl IndexSnapshot {
    pub fn from_record(record: &Record) -> Result<Self> {
        let status = record
            .get("status")
            .cloned()
            .ok_or_else(|| DecoderError::MalformedRecord("index record without status".into()))?;
        let file_position = record
            .get("file_position")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                DecoderError::MalformedRecord("index record without file_position".into())
            })?;
        Ok(Self {
            status: StatusSnapshot::new(status),
            file_position,
        })
    }
}

/// One constant-acceleration segment of a trapezoidal move
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "MoveTuple", into = "MoveTuple")]
pub struct MoveSegment {
    pub print_time: f64,
    pub move_t: f64,
    pub start_v: f64,
    pub accel: f64,
    pub start_pos: [f64; 3],
    pub axes_r: [f64; 3],
}

type MoveTuple = (f64, f64, f64, f64, [f64; 3], [f64; 3]);

impl From<MoveTuple> for MoveSegment {
    fn from(t: MoveTuple) -> Self {
        Self {
            print_time: t.0,
            move_t: t.1,
            start_v: t.2,
            accel: t.3,
            start_pos: t.4,
            axes_r: t.5,
        }
    }
}

impl From<MoveSegment> for MoveTuple {
    fn from(m: MoveSegment) -> Self {
        (m.print_time, m.move_t, m.start_v, m.accel, m.start_pos, m.axes_r)
    }
}

impl MoveSegment {
    /// Time at which the segment finishes
    pub fn end_time(&self) -> f64 {
        self.print_time + self.move_t
    }

    /// Time into the segment, clamped to `[0, move_t]`
    pub fn offset_at(&self, req_time: f64) -> f64 {
        (req_time - self.print_time).min(self.move_t).max(0.0)
    }

    /// Distance travelled along the move after `mtime` seconds
    pub fn distance(&self, mtime: f64) -> f64 {
        (self.start_v + 0.5 * self.accel * mtime) * mtime
    }
}

/// Payload of a trapq topic record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveBatch {
    pub data: Vec<MoveSegment>,
}

/// One run-length encoded group of steps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(i64, i64, i64)", into = "(i64, i64, i64)")]
pub struct StepRun {
    pub interval: i64,
    pub count: i64,
    pub add: i64,
}

impl From<(i64, i64, i64)> for StepRun {
    fn from((interval, count, add): (i64, i64, i64)) -> Self {
        Self { interval, count, add }
    }
}

impl From<StepRun> for (i64, i64, i64) {
    fn from(r: StepRun) -> Self {
        (r.interval, r.count, r.add)
    }
}

/// Payload of a stepq topic record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepBlock {
    pub first_clock: i64,
    pub first_step_time: f64,
    pub last_clock: i64,
    pub last_step_time: f64,
    pub step_distance: f64,
    pub start_position: f64,
    pub data: Vec<StepRun>,
}

impl StepBlock {
    /// Seconds per clock tick for this block (zero for a single-clock block)
    pub fn inv_freq(&self) -> f64 {
        let cdiff = self.last_clock - self.first_clock;
        if cdiff == 0 {
            return 0.0;
        }
        (self.last_step_time - self.first_step_time) / cdiff as f64
    }
}

/// Decode a topic payload into one of the typed shapes above
pub(crate) fn decode_payload<T: serde::de::DeserializeOwned>(
    topic: &str,
    payload: Record,
) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|e| DecoderError::MalformedRecord(format!("{} payload: {}", topic, e)))
}

/// Cartesian axis selected by a per-axis dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which quantity a dataset reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    Velocity,
    Accel,
    AxisPosition(Axis),
    AxisVelocity(Axis),
    AxisAccel(Axis),
    StepPosition,
}

/// Description of a selected dataset
///
/// The descriptor is also the handle passed back to
/// [`Session::pull`](crate::Session::pull) to read values.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetDescriptor {
    /// Full dataset name as requested (`category:instance[:selector]`)
    pub name: String,
    /// Human readable label
    pub label: String,
    /// Axis unit string
    pub unit: &'static str,
    /// Dispatcher topic the values are reconstructed from
    pub topic: String,
    /// Quantity to compute
    pub selection: Selection,
}
