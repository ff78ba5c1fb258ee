use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::options::{Preset, RateControl};

#[derive(Parser)]
#[command(name = "svtenc")]
#[command(about = "SVT-HEVC encode front-end for FFmpeg", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Encode options shared by `encode` and `dry-run`.
#[derive(clap::Args, Debug)]
pub struct EncodeArgs {
    /// Input video file
    pub input: PathBuf,

    /// Output file path
    pub output: PathBuf,

    /// Speed/quality preset (ultrafast..placebo)
    #[arg(long)]
    pub preset: Option<Preset>,

    /// Rate control mode: crf, cbr or vbr
    #[arg(long, value_name = "MODE")]
    pub rate_control: Option<RateControl>,

    /// Quality value: CRF in [0,51] for crf mode, kbps otherwise
    #[arg(long, short)]
    pub quality: Option<i64>,

    /// Uniform downscale factor in (0,1]
    #[arg(long, value_name = "FACTOR")]
    pub scale: Option<f64>,

    /// Drop all audio tracks
    #[arg(long)]
    pub no_audio: bool,

    /// Unsharp filter amount (try 0.2-0.3)
    #[arg(long, value_name = "AMOUNT")]
    pub sharpen: Option<f64>,

    /// Crop expression, e.g. 1920:800:0:140
    #[arg(long, value_name = "W:H:X:Y")]
    pub crop: Option<String>,

    /// Detect black bars with cropdetect and fill the crop filter
    #[arg(long, conflicts_with = "crop")]
    pub autocrop: bool,

    /// Trim start timestamp, e.g. 00:01:30.000
    #[arg(long, value_name = "TIMESTAMP")]
    pub start: Option<String>,

    /// Trim end timestamp
    #[arg(long, value_name = "TIMESTAMP")]
    pub end: Option<String>,

    /// Test encode: only encode the first N frames
    #[arg(long, value_name = "FRAMES")]
    pub test_frames: Option<u32>,

    /// Replace the output file if it already exists
    #[arg(long)]
    pub overwrite: bool,

    /// Extra FFmpeg arguments appended after all generated flags
    /// (shell-style quoting), e.g. --extra-args "-tune 0"
    #[arg(long, value_name = "ARGS")]
    pub extra_args: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the configured encoder and ffprobe binaries run
    CheckFfmpeg,

    /// Probe a video file and print its metadata
    Probe {
        /// Path to the video file
        file: PathBuf,
    },

    /// Detect black bars and print the crop expression for --crop
    DetectCrop {
        /// Path to the video file
        file: PathBuf,
    },

    /// Validate options and print the encode command without executing
    DryRun(EncodeArgs),

    /// Run one encode and stream the encoder log until it finishes
    Encode(EncodeArgs),

    /// Show config status and location, or create default config if missing
    InitConfig,
}

pub fn parse() -> Cli {
    Cli::parse()
}
