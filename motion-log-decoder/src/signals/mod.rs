//! Signal reconstruction from motion topics
//!
//! Each dataset category maps to one reconstructor type. The set of
//! categories is closed and fixed at compile time.

pub mod stepq;
pub mod trapq;

pub use stepq::StepqReconstructor;
pub use trapq::TrapqReconstructor;

use crate::dispatcher::TopicSource;
use crate::types::{DatasetDescriptor, Result, Selection};

/// Dataset categories understood by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetCategory {
    /// `trapq:<instance>:<selector>` - trapezoidal motion queue
    TrapezoidalMove,
    /// `stepq:<stepper>` - stepper step queue
    StepRun,
}

/// Lookup table of every category, in name order
pub const CATEGORIES: [DatasetCategory; 2] =
    [DatasetCategory::StepRun, DatasetCategory::TrapezoidalMove];

impl DatasetCategory {
    pub fn from_name(name: &str) -> Option<Self> {
        CATEGORIES.into_iter().find(|c| c.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            DatasetCategory::TrapezoidalMove => trapq::CATEGORY,
            DatasetCategory::StepRun => stepq::CATEGORY,
        }
    }

    /// Number of leading name parts that identify the topic
    pub fn topic_parts(self) -> usize {
        2
    }

    /// Number of colon-separated parts in a dataset name
    pub fn total_parts(self) -> usize {
        match self {
            DatasetCategory::TrapezoidalMove => 3,
            DatasetCategory::StepRun => 2,
        }
    }

    /// Valid values for the final name part, if the category has one
    pub fn selectors(self) -> Vec<String> {
        match self {
            DatasetCategory::TrapezoidalMove => trapq::selectors(),
            DatasetCategory::StepRun => Vec::new(),
        }
    }
}

/// A stateful decoder bound to one topic
#[derive(Debug, Clone)]
pub enum Reconstructor {
    TrapezoidalMove(TrapqReconstructor),
    StepRun(StepqReconstructor),
}

impl Reconstructor {
    pub fn new(category: DatasetCategory, topic: &str, smoothing_time: f64) -> Self {
        match category {
            DatasetCategory::TrapezoidalMove => {
                Reconstructor::TrapezoidalMove(TrapqReconstructor::new(topic))
            }
            DatasetCategory::StepRun => {
                Reconstructor::StepRun(StepqReconstructor::new(topic, smoothing_time))
            }
        }
    }

    pub fn category(&self) -> DatasetCategory {
        match self {
            Reconstructor::TrapezoidalMove(_) => DatasetCategory::TrapezoidalMove,
            Reconstructor::StepRun(_) => DatasetCategory::StepRun,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            Reconstructor::TrapezoidalMove(r) => r.topic(),
            Reconstructor::StepRun(r) => r.topic(),
        }
    }

    /// Build the descriptor for an already arity-checked dataset name
    pub fn describe(&self, name: &str, parts: &[&str]) -> Result<DatasetDescriptor> {
        match self {
            Reconstructor::TrapezoidalMove(r) => r.describe(name, parts),
            Reconstructor::StepRun(r) => Ok(r.describe(name, parts)),
        }
    }

    /// Value of `selection` at `req_time`
    pub fn pull<S: TopicSource>(
        &mut self,
        source: &mut S,
        selection: Selection,
        req_time: f64,
    ) -> Result<f64> {
        match self {
            Reconstructor::TrapezoidalMove(r) => r.pull(source, selection, req_time),
            Reconstructor::StepRun(r) => r.pull_position(source, req_time),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Reconstructor::TrapezoidalMove(r) => r.reset(),
            Reconstructor::StepRun(r) => r.reset(),
        }
    }
}
