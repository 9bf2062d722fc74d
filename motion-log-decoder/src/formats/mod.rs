//! Compressed log stream readers
//!
//! Both log files written by the data logger (the main message log and its
//! snapshot index) share the same framing, so a single reader serves both.

pub mod framed;

pub use framed::{FrameReader, FRAME_DELIMITER};
