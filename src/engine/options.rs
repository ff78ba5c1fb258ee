//! User-adjustable encode parameters and their validation rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::ValidationError;

/// Named point on the encoder's speed/quality trade-off ladder.
/// These are the preset names the SVT-HEVC FFmpeg wrapper accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    Medium,
    Slow,
    Slower,
    Veryslow,
    Placebo,
}

impl Preset {
    pub const ALL: [Preset; 10] = [
        Preset::Ultrafast,
        Preset::Superfast,
        Preset::Veryfast,
        Preset::Faster,
        Preset::Fast,
        Preset::Medium,
        Preset::Slow,
        Preset::Slower,
        Preset::Veryslow,
        Preset::Placebo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Ultrafast => "ultrafast",
            Preset::Superfast => "superfast",
            Preset::Veryfast => "veryfast",
            Preset::Faster => "faster",
            Preset::Fast => "fast",
            Preset::Medium => "medium",
            Preset::Slow => "slow",
            Preset::Slower => "slower",
            Preset::Veryslow => "veryslow",
            Preset::Placebo => "placebo",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .iter()
            .find(|p| p.as_str() == s.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| format!("unknown preset '{}'", s))
    }
}

/// Strategy governing how output bitrate is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateControl {
    /// Constant Rate Factor: quality target in [0,51], lower is better.
    Crf,
    /// Constant bitrate: quality is the target kbps.
    Cbr,
    /// Variable bitrate: quality is the average target kbps.
    Vbr,
}

impl RateControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateControl::Crf => "crf",
            RateControl::Cbr => "cbr",
            RateControl::Vbr => "vbr",
        }
    }
}

impl FromStr for RateControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crf" => Ok(RateControl::Crf),
            "cbr" => Ok(RateControl::Cbr),
            "vbr" => Ok(RateControl::Vbr),
            other => Err(format!("unknown rate control mode '{}'", other)),
        }
    }
}

/// The full set of user-selected encode parameters for one job.
///
/// `extra_flags` is the documented escape hatch: the builder appends it
/// verbatim after every generated flag, so users can override defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionModel {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub preset: Preset,
    pub rate_control: RateControl,
    /// CRF value or target bitrate in kbps, depending on `rate_control`.
    pub quality: i64,
    /// Uniform downscale factor in (0,1]; None keeps the source size.
    #[serde(default)]
    pub resolution_scale: Option<f64>,
    /// Drop all audio tracks (-an).
    #[serde(default)]
    pub skip_audio: bool,
    /// Unsharp filter amount; useful around 0.2-0.3 when transcoding.
    #[serde(default)]
    pub sharpen: Option<f64>,
    /// Crop filter expression, e.g. "1920:800:0:140".
    #[serde(default)]
    pub crop: Option<String>,
    /// Trim start timestamp (-ss), e.g. "00:01:30.000".
    #[serde(default)]
    pub start_time: Option<String>,
    /// Trim end timestamp (-to).
    #[serde(default)]
    pub end_time: Option<String>,
    /// Encode only the first N frames (test encode).
    #[serde(default)]
    pub test_frames: Option<u32>,
    /// Replace an existing output file instead of rejecting it.
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub extra_flags: Vec<String>,
}

impl OptionModel {
    pub fn new(input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            input_path,
            output_path,
            preset: Preset::Medium,
            rate_control: RateControl::Crf,
            quality: 23,
            resolution_scale: None,
            skip_audio: false,
            sharpen: None,
            crop: None,
            start_time: None,
            end_time: None,
            test_frames: None,
            overwrite: false,
            extra_flags: Vec::new(),
        }
    }
}

/// Validate an option model before building a command.
///
/// Rules run in a fixed order and the first violation wins, so the same
/// bad model always reports the same error:
/// 1. input_path exists and is a regular file
/// 2. output_path's parent directory exists and is writable
/// 3. output_path differs from input_path
/// 4. quality is legal for the selected rate control mode
/// 5. resolution_scale, if present, is in (0,1]
/// 6. output_path does not already exist, unless overwrite is set
pub fn validate(model: &OptionModel) -> Result<(), ValidationError> {
    if !model.input_path.is_file() {
        return Err(ValidationError::new(
            "input_path",
            format!("{} is not a readable file", model.input_path.display()),
        ));
    }

    let parent = match model.output_path.parent() {
        // A bare filename means the current directory.
        Some(p) if p.as_os_str().is_empty() => PathBuf::from("."),
        Some(p) => p.to_path_buf(),
        None => {
            return Err(ValidationError::new(
                "output_path",
                "output path has no parent directory",
            ));
        }
    };
    if !parent.is_dir() {
        return Err(ValidationError::new(
            "output_path",
            format!("output directory {} does not exist", parent.display()),
        ));
    }
    if std::fs::metadata(&parent)
        .map(|m| m.permissions().readonly())
        .unwrap_or(true)
    {
        return Err(ValidationError::new(
            "output_path",
            format!("output directory {} is not writable", parent.display()),
        ));
    }

    // Compare real paths so aliases like ./in.mp4 cannot slip past.
    // The input exists per rule 1 and the parent per rule 2; the output
    // file itself may not exist yet, so canonicalize parent + name.
    let same_file = match (model.input_path.canonicalize(), parent.canonicalize()) {
        (Ok(input_real), Ok(parent_real)) => model
            .output_path
            .file_name()
            .is_some_and(|name| parent_real.join(name) == input_real),
        _ => model.output_path == model.input_path,
    };
    if same_file {
        return Err(ValidationError::new(
            "output_path",
            "output path must differ from input path",
        ));
    }

    match model.rate_control {
        RateControl::Crf => {
            if !(0..=51).contains(&model.quality) {
                return Err(ValidationError::new(
                    "quality",
                    format!("CRF must be in [0,51], got {}", model.quality),
                ));
            }
        }
        RateControl::Cbr | RateControl::Vbr => {
            if model.quality <= 0 {
                return Err(ValidationError::new(
                    "quality",
                    format!("bitrate must be > 0 kbps, got {}", model.quality),
                ));
            }
        }
    }

    if let Some(scale) = model.resolution_scale {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(ValidationError::new(
                "resolution_scale",
                format!("scale must be in (0,1], got {}", scale),
            ));
        }
    }

    if model.output_path.exists() && !model.overwrite {
        return Err(ValidationError::new(
            "output_path",
            format!(
                "{} already exists; enable overwrite to replace it",
                model.output_path.display()
            ),
        ));
    }

    Ok(())
}
