//! Topic dispatcher
//!
//! The main log interleaves records for every subscribed topic in one
//! ordered stream. The dispatcher reads that stream lazily and files each
//! record's payload into a per-topic queue, so every reconstructor can
//! consume its own topic at its own pace.
//!
//! Reading is bounded by a watermark: the `estimated_print_time` of the
//! most recent status record. Once the stream has moved more than
//! `flow_control_slack` seconds past a request without producing a record
//! for the requested topic, the topic is reported as exhausted for that
//! request instead of reading on.

use crate::formats::FrameReader;
use crate::types::{DecoderError, Record, Result, STATUS_TOPIC};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::io::{Read, Seek};

/// Source of per-topic record payloads
///
/// Implemented by [`TopicDispatcher`]; reconstructors only depend on this
/// trait so they can be driven from any ordered payload source.
pub trait TopicSource {
    /// Pull the next payload for `topic` needed to answer a query at
    /// `request_time`, or `None` if no more data is available for it
    fn pull(&mut self, request_time: f64, topic: &str) -> Result<Option<Record>>;
}

/// Demultiplexes the main log stream into per-topic FIFO queues
pub struct TopicDispatcher<R: Read + Seek> {
    reader: FrameReader<R>,
    queues: HashMap<String, VecDeque<Record>>,
    last_read_time: f64,
    end_of_stream: bool,
    flow_control_slack: f64,
}

impl<R: Read + Seek> TopicDispatcher<R> {
    pub fn new(reader: FrameReader<R>, flow_control_slack: f64) -> Self {
        Self {
            reader,
            queues: HashMap::new(),
            last_read_time: 0.0,
            end_of_stream: false,
            flow_control_slack,
        }
    }

    /// Create an empty queue for `topic` (no-op if it already exists)
    pub fn register_topic(&mut self, topic: &str) {
        if !self.queues.contains_key(topic) {
            log::debug!("Registering topic '{}'", topic);
            self.queues.insert(topic.to_string(), VecDeque::new());
        }
    }

    pub fn is_registered(&self, topic: &str) -> bool {
        self.queues.contains_key(topic)
    }

    /// Most recent status time seen in the stream
    pub fn last_read_time(&self) -> f64 {
        self.last_read_time
    }

    /// True once the stream is exhausted and every queue has been consumed
    pub fn is_drained(&self) -> bool {
        self.end_of_stream && self.queues.values().all(VecDeque::is_empty)
    }

    /// Move the main stream to a full-flush boundary, discarding queued data
    pub fn reposition(&mut self, offset: u64) -> Result<()> {
        self.reader.seek(offset)?;
        self.reset();
        Ok(())
    }

    /// Move the main stream back to its start, discarding queued data
    pub fn rewind(&mut self) -> Result<()> {
        self.reader.rewind()?;
        self.reset();
        Ok(())
    }

    fn reset(&mut self) {
        self.queues.values_mut().for_each(VecDeque::clear);
        self.last_read_time = 0.0;
        self.end_of_stream = false;
    }

    /// File one raw record into its topic queue and update the watermark
    fn route(&mut self, mut record: Record) -> Result<()> {
        let topic = match record.get("q").and_then(Value::as_str) {
            Some(topic) => topic.to_string(),
            None => {
                log::trace!("Ignoring record without a topic");
                return Ok(());
            }
        };

        if topic == STATUS_TOPIC {
            let print_time = record
                .get("params")
                .and_then(|p| p.get("toolhead"))
                .and_then(|t| t.get("estimated_print_time"))
                .and_then(Value::as_f64);
            if let Some(print_time) = print_time {
                self.last_read_time = print_time;
            }
        }

        if let Some(queue) = self.queues.get_mut(&topic) {
            let params = record
                .get_mut("params")
                .map(Value::take)
                .ok_or_else(|| {
                    DecoderError::MalformedRecord(format!("'{}' record without params", topic))
                })?;
            log::trace!("Queued record for '{}'", topic);
            queue.push_back(params);
        }
        Ok(())
    }
}

impl<R: Read + Seek> TopicSource for TopicDispatcher<R> {
    fn pull(&mut self, request_time: f64, topic: &str) -> Result<Option<Record>> {
        loop {
            let queue = self
                .queues
                .get_mut(topic)
                .ok_or_else(|| DecoderError::UnregisteredTopic(topic.to_string()))?;
            if let Some(record) = queue.pop_front() {
                return Ok(Some(record));
            }
            if request_time + self.flow_control_slack < self.last_read_time {
                return Ok(None);
            }
            match self.reader.pull_record()? {
                Some(record) => self.route(record)?,
                None => {
                    if !self.end_of_stream {
                        log::debug!("End of main log stream");
                    }
                    self.end_of_stream = true;
                    return Ok(None);
                }
            }
        }
    }
}
