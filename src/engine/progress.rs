//! Parser for FFmpeg's stderr stats lines.
//!
//! The encoder is launched without any machine-readable progress flags
//! (the argument vector is a fixed protocol), so live progress comes from
//! the human-readable stats lines interleaved in the log stream:
//!
//! `frame=  120 fps= 25 q=28.0 size=    1024kB time=00:00:05.12 bitrate=... speed=1.2x`

/// Incremental parser; feed it every subscribed log line and read the
/// latest values between lines.
#[derive(Debug, Default, Clone)]
pub struct StatsParser {
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    pub size_kb: Option<u64>,
    pub out_time_s: Option<f64>,
    pub speed: Option<f64>,
}

impl StatsParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the line was a stats line and updated the state.
    pub fn parse_line(&mut self, line: &str) -> bool {
        if !line.starts_with("frame=") {
            return false;
        }

        self.frame = field_value(line, "frame=").and_then(|v| v.parse().ok());
        self.fps = field_value(line, "fps=").and_then(|v| v.parse().ok());
        self.size_kb = field_value(line, "size=")
            .map(|v| v.trim_end_matches("kB").to_string())
            .and_then(|v| v.parse().ok());
        self.out_time_s = field_value(line, "time=").and_then(|v| parse_timestamp(&v));
        self.speed = field_value(line, "speed=")
            .map(|v| v.trim_end_matches('x').to_string())
            .and_then(|v| v.parse().ok());

        true
    }

    /// Progress percentage against the probed duration, clamped to 100.
    pub fn progress_pct(&self, duration_s: Option<f64>) -> f64 {
        match (self.out_time_s, duration_s) {
            (Some(t), Some(dur)) if dur > 0.0 => (t / dur * 100.0).min(100.0),
            _ => 0.0,
        }
    }
}

/// Value of `key=` up to the next field key, trimmed. Stats lines pad
/// values with spaces after the '=', so splitting on whitespace alone
/// would misalign fields.
fn field_value(line: &str, key: &str) -> Option<String> {
    let start = line.find(key)? + key.len();
    let rest = line[start..].trim_start();
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let value = &rest[..end];
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parse "HH:MM:SS.cc" into seconds.
fn parse_timestamp(ts: &str) -> Option<f64> {
    let mut parts = ts.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "frame=  120 fps= 25 q=28.0 size=    1024kB time=00:00:05.12 bitrate=1638.4kbits/s speed=1.28x";

    #[test]
    fn test_parse_stats_line() {
        let mut parser = StatsParser::new();
        assert!(parser.parse_line(SAMPLE));

        assert_eq!(parser.frame, Some(120));
        assert_eq!(parser.fps, Some(25.0));
        assert_eq!(parser.size_kb, Some(1024));
        assert_eq!(parser.out_time_s, Some(5.12));
        assert_eq!(parser.speed, Some(1.28));
    }

    #[test]
    fn test_non_stats_lines_are_ignored() {
        let mut parser = StatsParser::new();
        assert!(!parser.parse_line("Stream #0:0: Video: h264"));
        assert!(!parser.parse_line(""));
        assert_eq!(parser.frame, None);
    }

    #[test]
    fn test_progress_percentage() {
        let mut parser = StatsParser::new();
        parser.parse_line(SAMPLE); // 5.12s

        assert!((parser.progress_pct(Some(10.24)) - 50.0).abs() < 1e-9);
        assert_eq!(parser.progress_pct(Some(5.0)), 100.0);
        assert_eq!(parser.progress_pct(None), 0.0);
        assert_eq!(parser.progress_pct(Some(0.0)), 0.0);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:00:05.12"), Some(5.12));
        assert_eq!(parse_timestamp("01:02:03.00"), Some(3723.0));
        assert_eq!(parse_timestamp("garbage"), None);
    }
}
