//! Log fixtures shared by the integration tests
//!
//! Produces the same layout as the data logger: a gzip main log with a full
//! deflate flush at every index snapshot, and a gzip index log pointing at
//! those flush offsets.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::{Compress, Compression, Crc, FlushCompress, Status};
use serde_json::{json, Value};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0xff];
const DELIMITER: u8 = 0x03;

/// Gzip writer that can emit full flush points
pub struct FlushingGzWriter {
    compress: Compress,
    crc: Crc,
    out: Vec<u8>,
}

impl FlushingGzWriter {
    pub fn new() -> Self {
        Self {
            compress: Compress::new(Compression::default(), false),
            crc: Crc::new(),
            out: GZIP_HEADER.to_vec(),
        }
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.deflate(bytes, FlushCompress::None);
    }

    pub fn write_record(&mut self, record: &Value) {
        let mut bytes = serde_json::to_vec(record).unwrap();
        bytes.push(DELIMITER);
        self.write_raw(&bytes);
    }

    /// Flush so a raw inflater can start here; returns the file offset
    pub fn full_flush(&mut self) -> u64 {
        self.deflate(&[], FlushCompress::Full);
        self.out.len() as u64
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.deflate(&[], FlushCompress::Finish);
        let (sum, amount) = (self.crc.sum(), self.crc.amount());
        self.out.extend_from_slice(&sum.to_le_bytes());
        self.out.extend_from_slice(&amount.to_le_bytes());
        self.out
    }

    fn deflate(&mut self, input: &[u8], flush: FlushCompress) {
        self.crc.update(input);
        let finishing = matches!(flush, FlushCompress::Finish);
        let mut consumed = 0;
        loop {
            self.out.reserve(input.len() - consumed + 4096);
            let before = self.compress.total_in();
            let status = self
                .compress
                .compress_vec(&input[consumed..], &mut self.out, flush)
                .unwrap();
            consumed += (self.compress.total_in() - before) as usize;
            let room_left = self.out.len() < self.out.capacity();
            let done = match status {
                Status::StreamEnd => true,
                _ => !finishing && consumed == input.len() && room_left,
            };
            if done {
                break;
            }
        }
    }
}

pub fn status_record(time: f64) -> Value {
    json!({"q": "status", "params": {"toolhead": {"estimated_print_time": time}}})
}

/// A trapq batch record; each move is `(print_time, move_t, start_v, accel, start_pos, axes_r)`
pub fn trapq_record(topic: &str, moves: &[(f64, f64, f64, f64, [f64; 3], [f64; 3])]) -> Value {
    let data: Vec<Value> = moves
        .iter()
        .map(|m| json!([m.0, m.1, m.2, m.3, m.4, m.5]))
        .collect();
    json!({"q": topic, "params": {"data": data}})
}

/// A stepq block on a 1 MHz clock where clock 0 is print time 0
pub fn stepq_record(
    topic: &str,
    first_clock: i64,
    start_position: f64,
    step_distance: f64,
    runs: &[(i64, i64, i64)],
) -> Value {
    let mut clock = first_clock - runs[0].0;
    for &(interval, count, add) in runs {
        let mut interval = interval;
        for _ in 0..count.abs() {
            clock += interval;
            interval += add;
        }
    }
    let last_clock = clock;
    let data: Vec<Value> = runs.iter().map(|r| json!([r.0, r.1, r.2])).collect();
    json!({"q": topic, "params": {
        "first_clock": first_clock, "first_step_time": first_clock as f64 * 1e-6,
        "last_clock": last_clock, "last_step_time": last_clock as f64 * 1e-6,
        "step_distance": step_distance, "start_position": start_position,
        "data": data,
    }})
}

/// Builder for a main log plus its index
pub struct LogFixture {
    main: FlushingGzWriter,
    index: Vec<Value>,
}

impl LogFixture {
    pub fn new() -> Self {
        Self {
            main: FlushingGzWriter::new(),
            index: Vec::new(),
        }
    }

    pub fn record(&mut self, record: Value) -> &mut Self {
        self.main.write_record(&record);
        self
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.main.write_raw(bytes);
        self
    }

    /// Add an index snapshot at the current main log position
    pub fn snapshot(&mut self, time: f64) -> &mut Self {
        let offset = self.main.full_flush();
        self.index.push(json!({
            "status": {"toolhead": {"estimated_print_time": time}},
            "file_position": offset,
        }));
        self
    }

    /// Compressed (main, index) byte streams
    pub fn finish(self) -> (Vec<u8>, Vec<u8>) {
        let mut index = GzEncoder::new(Vec::new(), Compression::default());
        for record in &self.index {
            index.write_all(&serde_json::to_vec(record).unwrap()).unwrap();
            index.write_all(&[DELIMITER]).unwrap();
        }
        (self.main.finish(), index.finish().unwrap())
    }

    pub fn into_cursors(self) -> (Cursor<Vec<u8>>, Cursor<Vec<u8>>) {
        let (main, index) = self.finish();
        (Cursor::new(main), Cursor::new(index))
    }

    /// Write `<dir>/<name>.json.gz` and `<dir>/<name>.index.gz`, returning the prefix
    pub fn write_to(self, dir: &Path, name: &str) -> PathBuf {
        let (main, index) = self.finish();
        std::fs::write(dir.join(format!("{}.json.gz", name)), main).unwrap();
        std::fs::write(dir.join(format!("{}.index.gz", name)), index).unwrap();
        dir.join(name)
    }
}

/// One second per snapshot: the toolhead moves +x at 1 mm/s so x == t
pub fn linear_motion_log(seconds: usize) -> LogFixture {
    let mut log = LogFixture::new();
    for i in 0..seconds {
        let t = i as f64;
        log.snapshot(t);
        log.record(status_record(t));
        log.record(trapq_record(
            "trapq:toolhead",
            &[(t, 1.0, 1.0, 0.0, [t, 0.0, 0.0], [1.0, 0.0, 0.0])],
        ));
    }
    log
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
