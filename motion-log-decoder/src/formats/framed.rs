//! Framed JSON stream reader
//!
//! A log file is a gzip stream of JSON documents, each terminated by the
//! `0x03` byte. The writer performs a full deflate flush at every index
//! snapshot, so the reader can also be restarted at one of those offsets as
//! a raw (headerless) deflate stream.
//!
//! Frames that fail to parse are skipped with a warning. A stream that ends
//! in the middle of the gzip container (a log still being written) is
//! treated as ending at the last complete frame.

use crate::types::{DecoderError, Record, Result};
use flate2::read::{DeflateDecoder, GzDecoder};
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::mem;

/// Byte separating consecutive records
pub const FRAME_DELIMITER: u8 = 0x03;

/// Inflater state for the two ways a stream can be entered
enum Inflater<R: Read> {
    /// From the start of the file, with the gzip header
    Gzip(GzDecoder<R>),
    /// From a full-flush boundary, no header
    Raw(DeflateDecoder<R>),
}

impl<R: Read> Inflater<R> {
    fn into_inner(self) -> R {
        match self {
            Inflater::Gzip(d) => d.into_inner(),
            Inflater::Raw(d) => d.into_inner(),
        }
    }
}

impl<R: Read> Read for Inflater<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Inflater::Gzip(d) => d.read(buf),
            Inflater::Raw(d) => d.read(buf),
        }
    }
}

/// Reader producing one decoded record per delimited frame
pub struct FrameReader<R: Read + Seek> {
    inflater: Option<Inflater<R>>,
    chunk: Vec<u8>,
    /// Complete frames not yet decoded
    frames: VecDeque<Vec<u8>>,
    /// Unterminated tail of the last chunk
    partial: Vec<u8>,
    exhausted: bool,
    skipped: usize,
}

impl<R: Read + Seek> FrameReader<R> {
    /// Start reading a gzip stream from the beginning of `source`
    pub fn new(source: R, chunk_size: usize) -> Self {
        Self {
            inflater: Some(Inflater::Gzip(GzDecoder::new(source))),
            chunk: vec![0; chunk_size.max(1)],
            frames: VecDeque::new(),
            partial: Vec::new(),
            exhausted: false,
            skipped: 0,
        }
    }

    /// Pull the next record, or `None` once the stream is exhausted
    pub fn pull_record(&mut self) -> Result<Option<Record>> {
        loop {
            if let Some(frame) = self.frames.pop_front() {
                match serde_json::from_slice::<Record>(&frame) {
                    Ok(record) => return Ok(Some(record)),
                    Err(e) => {
                        self.skipped += 1;
                        log::warn!("Unable to parse log record ({} bytes): {}", frame.len(), e);
                        continue;
                    }
                }
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fill()?;
        }
    }

    /// Restart decoding at `offset` as a raw deflate stream
    ///
    /// `offset` must be a full-flush boundary written by the logger; this is
    /// not verified.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        log::debug!("Seeking log stream to offset {}", offset);
        let source = self.reposition(offset)?;
        self.inflater = Some(Inflater::Raw(DeflateDecoder::new(source)));
        Ok(())
    }

    /// Restart decoding at the beginning of the stream
    pub fn rewind(&mut self) -> Result<()> {
        log::debug!("Rewinding log stream");
        let source = self.reposition(0)?;
        self.inflater = Some(Inflater::Gzip(GzDecoder::new(source)));
        Ok(())
    }

    /// Number of frames discarded because they failed to decode
    pub fn skipped_records(&self) -> usize {
        self.skipped
    }

    fn reposition(&mut self, offset: u64) -> Result<R> {
        let mut source = self
            .inflater
            .take()
            .ok_or_else(|| {
                DecoderError::IoError(std::io::Error::new(
                    ErrorKind::Other,
                    "log stream lost after a failed reposition",
                ))
            })?
            .into_inner();
        source.seek(SeekFrom::Start(offset))?;
        self.frames.clear();
        self.partial.clear();
        self.exhausted = false;
        Ok(source)
    }

    /// Inflate one chunk and split it into frames
    fn fill(&mut self) -> Result<()> {
        let inflater = match self.inflater.as_mut() {
            Some(inflater) => inflater,
            None => {
                self.exhausted = true;
                return Ok(());
            }
        };
        let n = match inflater.read(&mut self.chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => return Ok(()),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                log::warn!("Compressed log stream ends early: {}", e);
                0
            }
            Err(e) => return Err(e.into()),
        };
        if n == 0 {
            if !self.partial.is_empty() {
                log::debug!("Dropping {} trailing bytes with no delimiter", self.partial.len());
                self.partial.clear();
            }
            self.exhausted = true;
            return Ok(());
        }

        let mut pieces = self.chunk[..n].split(|b| *b == FRAME_DELIMITER);
        if let Some(first) = pieces.next() {
            self.partial.extend_from_slice(first);
        }
        for piece in pieces {
            let complete = mem::replace(&mut self.partial, piece.to_vec());
            self.frames.push_back(complete);
        }
        Ok(())
    }
}
