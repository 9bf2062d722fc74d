//! Session configuration types
//!
//! The defaults reproduce the timing constants the data logger's reader has
//! always used; they are exposed mainly so tests and the CLI can tune them.

use serde::{Deserialize, Serialize};

/// Configuration for a replay session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bytes inflated per read from a compressed stream
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Grace window (seconds) before a topic pull is declared exhausted
    #[serde(default = "default_one_second")]
    pub flow_control_slack: f64,

    /// Safety margin (seconds) subtracted from a seek target
    #[serde(default = "default_one_second")]
    pub seek_margin: f64,

    /// Half-width (seconds) of the ramp drawn around each stepper step
    #[serde(default = "default_smoothing_time")]
    pub smoothing_time: f64,
}

fn default_chunk_size() -> usize {
    8192
}

fn default_one_second() -> f64 {
    1.0
}

fn default_smoothing_time() -> f64 {
    0.005
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            flow_control_slack: default_one_second(),
            seek_margin: default_one_second(),
            smoothing_time: default_smoothing_time(),
        }
    }
}

impl SessionConfig {
    /// Create a new session configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the inflate chunk size (clamped to at least 1 byte)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Builder method: set the dispatcher flow-control slack
    pub fn with_flow_control_slack(mut self, slack: f64) -> Self {
        self.flow_control_slack = slack;
        self
    }

    /// Builder method: set the seek safety margin
    pub fn with_seek_margin(mut self, margin: f64) -> Self {
        self.seek_margin = margin;
        self
    }

    /// Builder method: set the step smoothing half-width
    pub fn with_smoothing_time(mut self, smoothing_time: f64) -> Self {
        self.smoothing_time = smoothing_time;
        self
    }
}
