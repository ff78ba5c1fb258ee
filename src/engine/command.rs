//! Compiles a validated [`OptionModel`] into the encoder's argument vector.
//!
//! The builder is pure: no I/O, no mutation, and byte-identical output for
//! equal inputs. The token order is a fixed external protocol targeted at
//! the FFmpeg + SVT-HEVC build:
//!
//! 1. encoder binary
//! 2. `-i <input>`
//! 3. trim window (`-ss`, `-to`) when set
//! 4. `-an` when audio is skipped
//! 5. `-preset <preset>`
//! 6. rate-control flags for the selected mode
//! 7. `-vf <filters>` when any filter applies (scale, unsharp, crop)
//! 8. `-vframes <n>` for test encodes
//! 9. `-y` when overwrite is enabled
//! 10. user extra flags, verbatim
//! 11. output path
//!
//! extra flags are always last before the output path so they can override
//! any generated default; nothing may ever be reordered around them.

use std::path::Path;

use super::options::{OptionModel, RateControl};

/// Build the complete argument vector for one encode, starting with the
/// encoder binary itself.
pub fn build(model: &OptionModel, ffmpeg: &Path) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    args.push(ffmpeg.to_string_lossy().into_owned());
    args.push("-i".to_string());
    args.push(model.input_path.to_string_lossy().into_owned());

    if let Some(start) = &model.start_time {
        args.push("-ss".to_string());
        args.push(start.clone());
    }
    if let Some(end) = &model.end_time {
        args.push("-to".to_string());
        args.push(end.clone());
    }

    if model.skip_audio {
        args.push("-an".to_string());
    }

    args.push("-preset".to_string());
    args.push(model.preset.as_str().to_string());

    match model.rate_control {
        RateControl::Crf => {
            args.push("-crf".to_string());
            args.push(model.quality.to_string());
        }
        RateControl::Cbr => {
            args.push("-b:v".to_string());
            args.push(format!("{}k", model.quality));
            args.push("-minrate".to_string());
            args.push(format!("{}k", model.quality));
            args.push("-maxrate".to_string());
            args.push(format!("{}k", model.quality));
        }
        RateControl::Vbr => {
            args.push("-b:v".to_string());
            args.push(format!("{}k", model.quality));
        }
    }

    let filters = build_filters(model);
    if !filters.is_empty() {
        args.push("-vf".to_string());
        args.push(filters.join(","));
    }

    if let Some(frames) = model.test_frames {
        args.push("-vframes".to_string());
        args.push(frames.to_string());
    }

    if model.overwrite {
        args.push("-y".to_string());
    }

    args.extend(model.extra_flags.iter().cloned());

    args.push(model.output_path.to_string_lossy().into_owned());

    args
}

/// Filter chain in fixed order: scale, unsharp, crop.
fn build_filters(model: &OptionModel) -> Vec<String> {
    let mut filters = Vec::new();

    if let Some(scale) = model.resolution_scale {
        // trunc(../2)*2 keeps dimensions even; HEVC rejects odd sizes.
        filters.push(format!(
            "scale=trunc(iw*{s}/2)*2:trunc(ih*{s}/2)*2",
            s = scale
        ));
    }

    if let Some(amount) = model.sharpen {
        filters.push(format!("unsharp=5:5:{a}:5:5:{a}", a = amount));
    }

    if let Some(crop) = &model.crop {
        filters.push(format!("crop={}", crop));
    }

    filters
}

/// Format a built command as a shell-safe string for display (dry runs,
/// logs). Quotes any token containing whitespace.
pub fn format_command(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if arg.contains(' ') {
                format!("\"{}\"", arg)
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
