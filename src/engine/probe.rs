// Input probing using ffprobe

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::error::MediaReadError;

/// Immutable metadata snapshot for one media file. Produced by
/// [`inspect`] and discarded when a new file is selected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub video_codec: String,
    pub bitrate_kbps: u64,
}

/// Inspect a media file with ffprobe and return its video metadata.
///
/// Fails with [`MediaReadError`] if the file does not exist, ffprobe
/// cannot be run, the container is unparseable, or there is no video
/// stream. No retry; the caller surfaces the error directly.
pub fn inspect(ffprobe: &Path, input_path: &Path) -> Result<MediaInfo, MediaReadError> {
    if !input_path.is_file() {
        return Err(MediaReadError::NotFound(input_path.to_path_buf()));
    }

    let output = Command::new(ffprobe)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
            "-select_streams",
            "v:0", // First video stream only
        ])
        .arg(input_path)
        .output()?;

    if !output.status.success() {
        return Err(MediaReadError::Unparseable {
            path: input_path.to_path_buf(),
            detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value =
        serde_json::from_str(&json_str).map_err(|e| MediaReadError::Unparseable {
            path: input_path.to_path_buf(),
            detail: format!("bad ffprobe JSON: {}", e),
        })?;

    parse_probe_json(&json, input_path)
}

/// Extract MediaInfo fields from ffprobe's JSON document.
fn parse_probe_json(
    json: &serde_json::Value,
    input_path: &Path,
) -> Result<MediaInfo, MediaReadError> {
    let no_video = || MediaReadError::NoVideoStream(input_path.to_path_buf());

    let streams = json["streams"].as_array().ok_or_else(no_video)?;
    let video_stream = streams.first().ok_or_else(no_video)?;

    let width = video_stream["width"].as_u64().ok_or_else(no_video)? as u32;
    let height = video_stream["height"].as_u64().ok_or_else(no_video)? as u32;
    let video_codec = video_stream["codec_name"]
        .as_str()
        .unwrap_or("unknown")
        .to_string();

    // Duration and bitrate live in the format section; both are strings
    // in ffprobe output. Some containers omit them.
    let duration_seconds = json["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
        .max(0.0);

    let bitrate_kbps = json["format"]["bit_rate"]
        .as_str()
        .and_then(|s| s.parse::<u64>().ok())
        .map(|bps| bps / 1000)
        .unwrap_or(0);

    Ok(MediaInfo {
        path: input_path.to_path_buf(),
        duration_seconds,
        width,
        height,
        video_codec,
        bitrate_kbps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "streams": [{
                "codec_name": "h264",
                "width": 1920,
                "height": 1080
            }],
            "format": {
                "duration": "123.456",
                "bit_rate": "4500000"
            }
        })
    }

    #[test]
    fn test_parse_probe_json() {
        let info = parse_probe_json(&sample_json(), Path::new("test.mp4")).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert_eq!(info.video_codec, "h264");
        assert_eq!(info.duration_seconds, 123.456);
        assert_eq!(info.bitrate_kbps, 4500);
    }

    #[test]
    fn test_parse_probe_json_missing_optional_fields() {
        let json = serde_json::json!({
            "streams": [{ "codec_name": "hevc", "width": 640, "height": 480 }],
            "format": {}
        });
        let info = parse_probe_json(&json, Path::new("test.mkv")).unwrap();
        assert_eq!(info.duration_seconds, 0.0);
        assert_eq!(info.bitrate_kbps, 0);
    }

    #[test]
    fn test_parse_probe_json_no_video_stream() {
        let json = serde_json::json!({ "streams": [], "format": {} });
        let err = parse_probe_json(&json, Path::new("audio.flac")).unwrap_err();
        assert!(matches!(err, MediaReadError::NoVideoStream(_)));
    }

    #[test]
    fn test_inspect_missing_file() {
        let err = inspect(Path::new("ffprobe"), Path::new("/nonexistent/clip.mp4")).unwrap_err();
        assert!(matches!(err, MediaReadError::NotFound(_)));
    }
}
