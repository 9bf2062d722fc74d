//! Index log and seeking
//!
//! The data logger writes a status snapshot to the index log at regular
//! intervals together with the main log's compressed offset at that moment.
//! The first snapshot defines the session's reference time; later ones are
//! used to jump into the main log without inflating everything before the
//! requested time.

use crate::formats::FrameReader;
use crate::types::{DecoderError, IndexSnapshot, Result, StatusSnapshot};
use std::io::{Read, Seek};

/// Scans the index log to find resume points in the main log
pub struct IndexController<R: Read + Seek> {
    reader: FrameReader<R>,
    initial_time: f64,
    seek_margin: f64,
}

impl<R: Read + Seek> IndexController<R> {
    pub fn new(reader: FrameReader<R>, seek_margin: f64) -> Self {
        Self {
            reader,
            initial_time: 0.0,
            seek_margin,
        }
    }

    /// Read the first snapshot, which defines the reference time
    pub fn load_initial(&mut self) -> Result<StatusSnapshot> {
        let record = self.reader.pull_record()?.ok_or(DecoderError::EmptyIndex)?;
        let status = record
            .get("status")
            .cloned()
            .map(StatusSnapshot::new)
            .ok_or_else(|| DecoderError::MalformedRecord("index record without status".into()))?;
        self.initial_time = status.estimated_print_time()?;
        log::info!("Log reference time: {:.6}", self.initial_time);
        Ok(status)
    }

    /// Reference time established by [`load_initial`](Self::load_initial)
    pub fn initial_time(&self) -> f64 {
        self.initial_time
    }

    /// Find the last snapshot at or before `target_time - seek_margin`
    ///
    /// Scans forward from the current index position. Returns `None` when
    /// the target precedes every remaining snapshot.
    pub fn seek_to(&mut self, target_time: f64) -> Result<Option<IndexSnapshot>> {
        let threshold = (target_time - self.seek_margin).max(self.initial_time);
        let mut found = None;
        while let Some(record) = self.reader.pull_record()? {
            let snapshot = IndexSnapshot::from_record(&record)?;
            if snapshot.status.effective_time()? > threshold {
                break;
            }
            found = Some(snapshot);
        }
        match &found {
            Some(s) => log::debug!(
                "Index snapshot at {:.6} (offset {}) precedes {:.6}",
                s.status.effective_time()?,
                s.file_position,
                target_time
            ),
            None => log::debug!("No index snapshot precedes {:.6}", target_time),
        }
        Ok(found)
    }

    /// Restart the scan just after the initial snapshot
    pub fn rewind(&mut self) -> Result<()> {
        self.reader.rewind()?;
        if self.reader.pull_record()?.is_none() {
            return Err(DecoderError::EmptyIndex);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::FRAME_DELIMITER;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use serde_json::{json, Value};
    use std::io::{Cursor, Write};

    fn snapshot(time: f64, pos: u64) -> Value {
        json!({"status": {"toolhead": {"estimated_print_time": time}}, "file_position": pos})
    }

    fn controller(records: &[Value]) -> IndexController<Cursor<Vec<u8>>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        for r in records {
            encoder.write_all(&serde_json::to_vec(r).unwrap()).unwrap();
            encoder.write_all(&[FRAME_DELIMITER]).unwrap();
        }
        let source = Cursor::new(encoder.finish().unwrap());
        IndexController::new(FrameReader::new(source, 8192), 1.0)
    }

    #[test]
    fn test_load_initial_sets_reference() {
        let mut index = controller(&[snapshot(100.0, 0), snapshot(101.0, 50)]);
        let status = index.load_initial().unwrap();
        assert_eq!(status.estimated_print_time().unwrap(), 100.0);
        assert_eq!(index.initial_time(), 100.0);
    }

    #[test]
    fn test_empty_index() {
        let mut index = controller(&[]);
        assert!(matches!(index.load_initial(), Err(DecoderError::EmptyIndex)));
    }

    #[test]
    fn test_seek_picks_previous_snapshot() {
        let records = [
            snapshot(100.0, 0),
            snapshot(102.0, 200),
            snapshot(104.0, 400),
            snapshot(106.0, 600),
        ];
        let mut index = controller(&records);
        index.load_initial().unwrap();

        // Threshold 104.5 - 1.0 = 103.5: the 104.0 snapshot is past it
        let found = index.seek_to(104.5).unwrap().unwrap();
        assert_eq!(found.file_position, 200);

        index.rewind().unwrap();
        let found = index.seek_to(105.0).unwrap().unwrap();
        assert_eq!(found.file_position, 400);

        index.rewind().unwrap();
        let found = index.seek_to(200.0).unwrap().unwrap();
        assert_eq!(found.file_position, 600);
    }

    #[test]
    fn test_seek_before_first_snapshot() {
        let mut index = controller(&[snapshot(100.0, 0), snapshot(102.0, 200)]);
        index.load_initial().unwrap();
        assert_eq!(index.seek_to(100.5).unwrap(), None);
    }

    #[test]
    fn test_seek_uses_later_print_time() {
        let records = [
            snapshot(100.0, 0),
            json!({"status": {"toolhead": {"estimated_print_time": 101.0, "print_time": 110.0}},
                   "file_position": 200}),
        ];
        let mut index = controller(&records);
        index.load_initial().unwrap();
        assert_eq!(index.seek_to(105.0).unwrap(), None);
    }
}
