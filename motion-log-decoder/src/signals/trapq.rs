//! Trapezoidal move reconstruction
//!
//! A trapq topic carries batches of constant-acceleration segments. Each
//! segment moves a scalar distance along a fixed direction (`axes_r`), so
//! position, velocity, and acceleration along any Cartesian axis are closed
//! form functions of the time into the segment.

use crate::dispatcher::TopicSource;
use crate::types::{
    decode_payload, Axis, DatasetDescriptor, DecoderError, MoveBatch, MoveSegment, Result,
    Selection,
};

pub const CATEGORY: &str = "trapq";

const VELOCITY_UNIT: &str = "Velocity\n(mm/s)";
const ACCEL_UNIT: &str = "Acceleration\n(mm/s^2)";
const POSITION_UNIT: &str = "Position\n(mm)";

/// Parse a trapq selector such as `velocity` or `axis_y_accel`
pub fn parse_selection(selector: &str) -> Option<Selection> {
    match selector {
        "velocity" => return Some(Selection::Velocity),
        "accel" => return Some(Selection::Accel),
        _ => {}
    }
    let rest = selector.strip_prefix("axis_")?;
    let axis = Axis::ALL.into_iter().find(|a| rest.starts_with(a.name()))?;
    match &rest[axis.name().len()..] {
        "" => Some(Selection::AxisPosition(axis)),
        "_velocity" => Some(Selection::AxisVelocity(axis)),
        "_accel" => Some(Selection::AxisAccel(axis)),
        _ => None,
    }
}

/// Every selector accepted by [`parse_selection`]
pub fn selectors() -> Vec<String> {
    let mut names = vec!["velocity".to_string(), "accel".to_string()];
    for axis in Axis::ALL {
        names.push(format!("axis_{}", axis));
        names.push(format!("axis_{}_velocity", axis));
        names.push(format!("axis_{}_accel", axis));
    }
    names
}

/// Cursor over the move segments of one trapq topic
#[derive(Debug, Clone)]
pub struct TrapqReconstructor {
    topic: String,
    segments: Vec<MoveSegment>,
    pos: usize,
}

impl TrapqReconstructor {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            segments: vec![MoveSegment::default()],
            pos: 0,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Drop loaded segments and start over from the zero segment
    pub fn reset(&mut self) {
        self.segments = vec![MoveSegment::default()];
        self.pos = 0;
    }

    /// Build the descriptor for `trapq:<instance>:<selector>`
    pub fn describe(&self, name: &str, parts: &[&str]) -> Result<DatasetDescriptor> {
        let (instance, selector) = (parts[1], parts[2]);
        let unknown = || DecoderError::UnknownSelection {
            category: CATEGORY.to_string(),
            selection: selector.to_string(),
        };
        let selection = parse_selection(selector).ok_or_else(unknown)?;
        let (label, unit) = match selection {
            Selection::Velocity => (format!("{} velocity", instance), VELOCITY_UNIT),
            Selection::Accel => (format!("{} acceleration", instance), ACCEL_UNIT),
            Selection::AxisPosition(a) => {
                (format!("{} axis {} position", instance, a), POSITION_UNIT)
            }
            Selection::AxisVelocity(a) => {
                (format!("{} axis {} velocity", instance, a), VELOCITY_UNIT)
            }
            Selection::AxisAccel(a) => {
                (format!("{} axis {} acceleration", instance, a), ACCEL_UNIT)
            }
            Selection::StepPosition => return Err(unknown()),
        };
        Ok(DatasetDescriptor {
            name: name.to_string(),
            label,
            unit,
            topic: self.topic.clone(),
            selection,
        })
    }

    /// Find the segment covering `req_time` and the clamped time into it
    ///
    /// Holds the last known segment (at its end) once the topic runs dry.
    pub fn locate<S: TopicSource>(
        &mut self,
        source: &mut S,
        req_time: f64,
    ) -> Result<(MoveSegment, f64)> {
        loop {
            let segment = self.segments[self.pos];
            if req_time <= segment.end_time() {
                return Ok((segment, segment.offset_at(req_time)));
            }
            if self.pos + 1 < self.segments.len() {
                self.pos += 1;
                continue;
            }
            let payload = match source.pull(req_time, &self.topic)? {
                Some(payload) => payload,
                None => return Ok((segment, segment.move_t)),
            };
            let batch: MoveBatch = decode_payload(&self.topic, payload)?;
            if batch.data.is_empty() {
                log::debug!("Skipping empty move batch on '{}'", self.topic);
                continue;
            }
            log::trace!("Loaded {} moves on '{}'", batch.data.len(), self.topic);
            self.segments = batch.data;
            self.pos = 0;
        }
    }

    /// Evaluate `selection` at `req_time`
    pub fn pull<S: TopicSource>(
        &mut self,
        source: &mut S,
        selection: Selection,
        req_time: f64,
    ) -> Result<f64> {
        let (m, mtime) = self.locate(source, req_time)?;
        let finished = mtime >= m.move_t;
        let value = match selection {
            Selection::AxisPosition(a) => {
                m.start_pos[a.index()] + m.axes_r[a.index()] * m.distance(mtime)
            }
            Selection::StepPosition => {
                return Err(DecoderError::UnknownSelection {
                    category: CATEGORY.to_string(),
                    selection: "position".to_string(),
                })
            }
            // Segment finished: no motion until the next one starts
            _ if finished => 0.0,
            Selection::Velocity => m.start_v + m.accel * mtime,
            Selection::Accel => m.accel,
            Selection::AxisVelocity(a) => (m.start_v + m.accel * mtime) * m.axes_r[a.index()],
            Selection::AxisAccel(a) => m.accel * m.axes_r[a.index()],
        };
        Ok(value)
    }
}
