//! Fixed-interval sampling of selected datasets into CSV

use crate::config::SamplingConfig;
use anyhow::{bail, Context, Result};
use motion_log_decoder::{DatasetDescriptor, Session};
use std::io::{Read, Seek, Write};

/// Number of sample rows for a sampling plan, including both endpoints
pub fn sample_count(sampling: &SamplingConfig) -> Result<usize> {
    if !sampling.interval.is_finite() || sampling.interval <= 0.0 {
        bail!("Sampling interval must be positive, got {}", sampling.interval);
    }
    if sampling.duration.is_nan() || sampling.duration < 0.0 {
        bail!("Sampling duration must not be negative, got {}", sampling.duration);
    }
    // Tolerate rounding so an exact multiple still includes the last sample
    let steps = (sampling.duration / sampling.interval + 1e-9).floor();
    Ok(steps as usize + 1)
}

/// Seek to the plan's start and write one CSV row per sample time
///
/// Times in the first column are relative to the session's reference time.
/// Returns the number of rows written, excluding the header.
pub fn write_csv<R: Read + Seek, W: Write>(
    session: &mut Session<R>,
    datasets: &[DatasetDescriptor],
    sampling: &SamplingConfig,
    out: &mut W,
) -> Result<usize> {
    let count = sample_count(sampling)?;
    if sampling.start != 0.0 {
        session
            .seek(sampling.start)
            .with_context(|| format!("Failed to seek to {}s", sampling.start))?;
    }
    let reference = session.start_time();

    let header: Vec<&str> = std::iter::once("time")
        .chain(datasets.iter().map(|d| d.label.as_str()))
        .collect();
    writeln!(out, "{}", header.join(","))?;

    let mut row = Vec::with_capacity(datasets.len() + 1);
    for k in 0..count {
        let offset = k as f64 * sampling.interval;
        let time = reference + offset;
        row.clear();
        row.push(format!("{:.6}", offset));
        for dataset in datasets {
            let value = session
                .pull(dataset, time)
                .with_context(|| format!("Failed to read '{}' at {:.6}", dataset.name, time))?;
            row.push(value.to_string());
        }
        writeln!(out, "{}", row.join(","))?;
    }
    log::info!(
        "Wrote {} samples of {} datasets (read up to {:.6})",
        count,
        datasets.len(),
        session.last_read_time()
    );
    Ok(count)
}
