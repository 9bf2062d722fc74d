//! Motion Log Decoder Library
//!
//! Replays the compressed event logs written by a motion controller's data
//! logger and reconstructs continuous position, velocity, and acceleration
//! signals from the sparse motion records they contain.
//!
//! # Architecture
//!
//! - [`formats`]: inflates a gzip log and splits it into JSON records
//! - [`dispatcher`]: demultiplexes the main log into per-topic queues
//! - [`index`]: uses the snapshot index to seek into the main log
//! - [`signals`]: trapq (trapezoidal move) and stepq (step queue) decoders
//! - [`Session`]: binds it all together behind dataset names
//!
//! Evaluation is lazy and single threaded: the log is only read as far as
//! the latest queried time requires.
//!
//! The library does NOT:
//! - Write logs
//! - Plot or otherwise present values
//! - Support rewinding queries except through [`Session::seek`]
//!
//! # Example Usage
//!
//! ```no_run
//! use motion_log_decoder::{Session, SessionConfig};
//! use std::path::Path;
//!
//! let config = SessionConfig::new().with_smoothing_time(0.002);
//! let mut session = Session::open_with_config(Path::new("/tmp/data"), config).unwrap();
//! session.initialize().unwrap();
//! session.seek(10.0).unwrap();
//!
//! let x = session.select_dataset("trapq:toolhead:axis_x").unwrap();
//! let stepper = session.select_dataset("stepq:stepper_x").unwrap();
//!
//! let start = session.start_time();
//! for i in 0..1000 {
//!     let t = start + i as f64 * 0.001;
//!     let planned = session.pull(&x, t).unwrap();
//!     let actual = session.pull(&stepper, t).unwrap();
//!     println!("{:.3} {} {}", t - start, planned, actual);
//! }
//! ```

// Public modules
pub mod config;
pub mod dispatcher;
pub mod formats;
pub mod index;
pub mod session;
pub mod signals;
pub mod types;

// Re-export main types for convenience
pub use config::SessionConfig;
pub use dispatcher::{TopicDispatcher, TopicSource};
pub use formats::FrameReader;
pub use index::IndexController;
pub use session::Session;
pub use signals::{DatasetCategory, Reconstructor};
pub use types::{
    Axis, DatasetDescriptor, DecoderError, IndexSnapshot, MoveSegment, Record, Result, Selection,
    StatusSnapshot, StepBlock, StepRun,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
