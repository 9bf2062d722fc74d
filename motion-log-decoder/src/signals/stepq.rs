//! Stepper position reconstruction
//!
//! A stepq topic carries blocks of run-length encoded step timings as queued
//! to a micro-controller. Replaying them yields the exact step times, but a
//! literal staircase would have infinite velocity at every step, so each
//! step is drawn as a short linear ramp of half-width `smoothing_time`
//! centred on the step. Steps closer together than two half-widths are
//! joined by a single ramp between them.
//!
//! Evaluation is incremental: the decoder only moves forward, and the
//! current ramp is reused for every query that falls inside it.

use crate::dispatcher::TopicSource;
use crate::types::{decode_payload, DatasetDescriptor, Result, Selection, StepBlock, StepRun};

pub const CATEGORY: &str = "stepq";

const POSITION_UNIT: &str = "Position\n(mm)";

/// Linear piece of the reconstructed position curve
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Slope {
    start_time: f64,
    end_time: f64,
    start_pos: f64,
    slope: f64,
}

impl Slope {
    fn position_at(&self, req_time: f64) -> f64 {
        self.start_pos + (req_time - self.start_time) * self.slope
    }
}

/// Active block: clock to time mapping plus its runs
#[derive(Debug, Clone, Default)]
struct Block {
    first_clock: i64,
    first_time: f64,
    last_time: f64,
    inv_freq: f64,
    step_dist: f64,
    runs: Vec<StepRun>,
    /// Next run to load
    data_pos: usize,
}

impl Block {
    fn clock_to_time(&self, clock: i64) -> f64 {
        self.first_time + (clock - self.first_clock) as f64 * self.inv_freq
    }
}

/// Run currently being replayed
#[derive(Debug, Clone, Copy, Default)]
struct RunCursor {
    interval: i64,
    count: i64,
    add: i64,
    dist: f64,
    prev_dist: f64,
}

/// Decoder state for one stepq topic
#[derive(Debug, Clone)]
pub struct StepqReconstructor {
    topic: String,
    smoothing_time: f64,
    next_step_time: f64,
    next_step_clock: i64,
    next_step_pos: f64,
    last_step_pos: f64,
    run: RunCursor,
    slope: Slope,
    block: Block,
}

impl StepqReconstructor {
    pub fn new(topic: impl Into<String>, smoothing_time: f64) -> Self {
        Self {
            topic: topic.into(),
            smoothing_time,
            next_step_time: 0.0,
            next_step_clock: 0,
            next_step_pos: 0.0,
            last_step_pos: 0.0,
            run: RunCursor::default(),
            slope: Slope::default(),
            block: Block::default(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Forget all decoded state, as if no block had been read
    pub fn reset(&mut self) {
        *self = Self::new(std::mem::take(&mut self.topic), self.smoothing_time);
    }

    /// Build the descriptor for `stepq:<stepper>`
    pub fn describe(&self, name: &str, parts: &[&str]) -> DatasetDescriptor {
        DatasetDescriptor {
            name: name.to_string(),
            label: format!("{} position", parts[1]),
            unit: POSITION_UNIT,
            topic: self.topic.clone(),
            selection: Selection::StepPosition,
        }
    }

    /// Smoothed stepper position at `req_time`
    ///
    /// Holds the last known position once the topic runs dry.
    pub fn pull_position<S: TopicSource>(&mut self, source: &mut S, req_time: f64) -> Result<f64> {
        let smtime = self.smoothing_time;
        loop {
            if req_time <= self.slope.end_time {
                return Ok(self.slope.position_at(req_time));
            }

            if req_time <= self.next_step_time {
                let check_time = self.next_step_time - smtime;
                if req_time < check_time {
                    // Settled between steps
                    self.slope.start_pos = self.last_step_pos;
                    self.slope.end_time = check_time;
                    self.slope.slope = 0.0;
                    continue;
                }
                // Leading half of the upcoming step's ramp
                self.slope = Slope {
                    start_time: check_time,
                    end_time: self.next_step_time,
                    start_pos: self.last_step_pos,
                    slope: 0.5 * self.run.dist / smtime,
                };
                continue;
            }

            if self.run.count > 0 {
                self.take_step();
                continue;
            }

            if req_time > self.block.last_time {
                let payload = match source.pull(req_time, &self.topic)? {
                    Some(payload) => payload,
                    None => return Ok(self.next_step_pos),
                };
                let block: StepBlock = decode_payload(&self.topic, payload)?;
                self.load_block(block);
                continue;
            }

            let run = match self.block.runs.get(self.block.data_pos) {
                Some(run) => *run,
                None => return Ok(self.next_step_pos),
            };
            self.block.data_pos += 1;
            let (count, dist) = if run.count < 0 {
                (-run.count, -self.block.step_dist)
            } else {
                (run.count, self.block.step_dist)
            };
            self.run.interval = run.interval;
            self.run.add = run.add;
            self.run.count = count;
            self.run.dist = dist;
        }
    }

    /// Replay one step of the active run and build its trailing ramp
    fn take_step(&mut self) {
        let smtime = self.smoothing_time;
        self.last_step_pos = self.next_step_pos;
        self.run.count -= 1;
        self.next_step_clock += self.run.interval;
        self.run.interval += self.run.add;
        let last_step_time = self.next_step_time;
        self.next_step_time = self.block.clock_to_time(self.next_step_clock);
        self.next_step_pos += self.run.dist;

        let gap = self.next_step_time - last_step_time;
        let prev_dist = self.run.prev_dist;
        // Steps on the same clock tick get a one-sided ramp
        self.slope = if gap > 0.0 && gap <= 2.0 * smtime {
            Slope {
                start_time: last_step_time,
                end_time: self.next_step_time,
                start_pos: self.last_step_pos - 0.5 * prev_dist,
                slope: 0.5 * (prev_dist + self.run.dist) / gap,
            }
        } else {
            Slope {
                start_time: last_step_time,
                end_time: last_step_time + smtime,
                start_pos: self.last_step_pos - 0.5 * prev_dist,
                slope: 0.5 * prev_dist / smtime,
            }
        };
        self.run.prev_dist = self.run.dist;
    }

    fn load_block(&mut self, block: StepBlock) {
        log::trace!(
            "Loaded step block on '{}': {} runs from {:.6} to {:.6}",
            self.topic,
            block.data.len(),
            block.first_step_time,
            block.last_step_time
        );
        let inv_freq = block.inv_freq();
        // Back-project one tick so the first run's step lands on first_clock
        let first_interval = block.data.first().map_or(0, |run| run.interval);
        self.next_step_clock = block.first_clock - first_interval;
        self.next_step_pos = block.start_position;
        self.block = Block {
            first_clock: block.first_clock,
            first_time: block.first_step_time,
            last_time: block.last_step_time,
            inv_freq,
            step_dist: block.step_distance,
            runs: block.data,
            data_pos: 0,
        };
    }
}
