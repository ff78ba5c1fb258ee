//! Black-bar detection with FFmpeg's cropdetect filter.
//!
//! Decodes a short low-framerate sample starting a quarter of the way
//! into the file and keeps the `crop=` value the filter reports most
//! often. Very short clips can yield no samples at all; that is
//! reported as [`CropDetectError::NoCropDetected`].

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use super::error::CropDetectError;
use super::supervisor::ProcessSupervisor;

/// Length of the sampled window, mm:ss.
const SAMPLE_WINDOW: &str = "01:20";

/// Build the analysis command: decode to a null muxer with a
/// 1-frame-per-5-seconds cropdetect filter.
pub fn detect_command(ffmpeg: &Path, input: &Path, duration_seconds: f64) -> Vec<String> {
    let start_offset = (duration_seconds / 4.0).max(0.0) as u64;
    vec![
        ffmpeg.to_string_lossy().into_owned(),
        "-ss".to_string(),
        start_offset.to_string(),
        "-i".to_string(),
        input.to_string_lossy().into_owned(),
        "-t".to_string(),
        SAMPLE_WINDOW.to_string(),
        "-vsync".to_string(),
        "vfr".to_string(),
        "-vf".to_string(),
        "fps=0.2,cropdetect".to_string(),
        "-f".to_string(),
        "null".to_string(),
        "-".to_string(),
    ]
}

/// Run the analysis and return the winning crop expression, e.g.
/// "1920:800:0:140", suitable for the crop option as-is.
pub fn detect(
    supervisor: &ProcessSupervisor,
    ffmpeg: &Path,
    input: &Path,
    duration_seconds: f64,
) -> Result<String, CropDetectError> {
    let job = supervisor.start(detect_command(ffmpeg, input, duration_seconds))?;

    let mut samples: Vec<String> = Vec::new();
    if let Some(lines) = job.subscribe() {
        for line in lines {
            if let Some(value) = crop_value(&line) {
                samples.push(value.to_string());
            }
        }
    }
    job.wait();
    debug!(input = %input.display(), samples = samples.len(), "cropdetect finished");

    most_common(&samples).ok_or(CropDetectError::NoCropDetected)
}

/// The `crop=W:H:X:Y` value cropdetect appends to each detection line.
fn crop_value(line: &str) -> Option<&str> {
    let start = line.rfind("crop=")? + "crop=".len();
    let rest = &line[start..];
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let value = &rest[..end];
    if value.is_empty() { None } else { Some(value) }
}

/// Most frequent sample; ties go to the value seen first.
fn most_common(samples: &[String]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for sample in samples {
        *counts.entry(sample).or_insert(0) += 1;
    }

    let mut best: Option<(&String, usize)> = None;
    for sample in samples {
        let count = counts[sample.as_str()];
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((sample, count));
        }
    }
    best.map(|(sample, _)| sample.clone())
}
