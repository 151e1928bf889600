//! ffprobe/ffmpeg subprocess wrappers for audio measurement.

use super::{detect_issues, AudioMetrics};
use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::warn;

lazy_static! {
    static ref MAX_VOLUME_RE: Regex = Regex::new(r"max_volume:\s*(-?[\d.]+)\s*dB").unwrap();
    static ref MEAN_VOLUME_RE: Regex = Regex::new(r"mean_volume:\s*(-?[\d.]+)\s*dB").unwrap();
    static ref SILENCE_START_RE: Regex = Regex::new(r"silence_start:\s*([\d.]+)").unwrap();
    static ref SILENCE_END_RE: Regex = Regex::new(r"silence_end:\s*([\d.]+)").unwrap();
}

/// Extracts loudness and silence statistics from audio files by driving
/// ffprobe and ffmpeg as subprocesses.
pub struct MetricsExtractor {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl MetricsExtractor {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Measure the file at `path`.
    ///
    /// Never fails: corrupt or non-audio input yields a partial metrics
    /// object whose `issues` explain what went wrong, so the analyze flow
    /// can always complete.
    pub async fn analyze(&self, path: &Path) -> AudioMetrics {
        let mut metrics = AudioMetrics {
            rms_level: -20.0,
            ..Default::default()
        };

        match self.probe_format(path).await {
            Ok(probe) => {
                metrics.duration = probe.duration;
                metrics.sample_rate = probe.sample_rate;
                metrics.channels = probe.channels;
                metrics.bit_rate = probe.bit_rate;
                metrics.codec = probe.codec;
            }
            Err(e) => {
                warn!("ffprobe failed for {}: {:#}", path.display(), e);
                metrics.issues.push(format!("Analysis error: {}", e));
                return metrics;
            }
        }

        match self.volume_stats(path).await {
            Ok((peak, rms)) => {
                metrics.peak_level = peak;
                metrics.rms_level = rms;
                metrics.dynamic_range = (peak - rms).abs();
            }
            Err(e) => {
                warn!("Volume detection failed for {}: {:#}", path.display(), e);
                metrics
                    .issues
                    .push(format!("Volume detection error: {}", e));
            }
        }

        match self.silence_ratio(path, metrics.duration).await {
            Ok(ratio) => metrics.silence_ratio = ratio,
            Err(e) => {
                warn!("Silence detection failed for {}: {:#}", path.display(), e);
            }
        }

        detect_issues(&mut metrics);
        metrics
    }

    async fn probe_format(&self, path: &Path) -> Result<ProbeData> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .context("failed to spawn ffprobe")?;

        if !output.status.success() {
            bail!("ffprobe exited with {}", output.status);
        }

        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("malformed ffprobe output")?;

        let audio_stream = json
            .get("streams")
            .and_then(|s| s.as_array())
            .and_then(|streams| {
                streams.iter().find(|s| {
                    s.get("codec_type").and_then(|t| t.as_str()) == Some("audio")
                })
            })
            .context("no audio stream found in file")?;

        let format = json.get("format");

        Ok(ProbeData {
            duration: format
                .and_then(|f| f.get("duration"))
                .and_then(|d| d.as_str())
                .and_then(|d| d.parse().ok())
                .unwrap_or(0.0),
            sample_rate: audio_stream
                .get("sample_rate")
                .and_then(|s| s.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(44100),
            channels: audio_stream
                .get("channels")
                .and_then(|c| c.as_u64())
                .unwrap_or(2) as u32,
            bit_rate: format
                .and_then(|f| f.get("bit_rate"))
                .and_then(|b| b.as_str())
                .and_then(|b| b.parse().ok())
                .unwrap_or(0),
            codec: audio_stream
                .get("codec_name")
                .and_then(|c| c.as_str())
                .unwrap_or("unknown")
                .to_string(),
        })
    }

    async fn volume_stats(&self, path: &Path) -> Result<(f64, f64)> {
        let output = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(path)
            .args(["-af", "volumedetect", "-f", "null", "-"])
            .output()
            .await
            .context("failed to spawn ffmpeg for volumedetect")?;

        // volumedetect reports on stderr
        let text = String::from_utf8_lossy(&output.stderr);
        parse_volume_stats(&text).context("volumedetect produced no level statistics")
    }

    async fn silence_ratio(&self, path: &Path, duration: f64) -> Result<f64> {
        let output = Command::new(&self.ffmpeg)
            .arg("-i")
            .arg(path)
            .args(["-af", "silencedetect=noise=-50dB:d=0.5", "-f", "null", "-"])
            .output()
            .await
            .context("failed to spawn ffmpeg for silencedetect")?;

        let text = String::from_utf8_lossy(&output.stderr);
        Ok(parse_silence_ratio(&text, duration))
    }
}

struct ProbeData {
    duration: f64,
    sample_rate: u32,
    channels: u32,
    bit_rate: u64,
    codec: String,
}

/// Parse `max_volume` and `mean_volume` out of ffmpeg volumedetect output.
fn parse_volume_stats(output: &str) -> Option<(f64, f64)> {
    let peak = MAX_VOLUME_RE
        .captures(output)
        .and_then(|c| c[1].parse().ok());
    let rms = MEAN_VOLUME_RE
        .captures(output)
        .and_then(|c| c[1].parse().ok());
    match (peak, rms) {
        (Some(p), Some(r)) => Some((p, r)),
        _ => None,
    }
}

/// Compute the silent percentage of the file from silencedetect output.
fn parse_silence_ratio(output: &str, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }

    let starts: Vec<f64> = SILENCE_START_RE
        .captures_iter(output)
        .filter_map(|c| c[1].parse().ok())
        .collect();
    let ends: Vec<f64> = SILENCE_END_RE
        .captures_iter(output)
        .filter_map(|c| c[1].parse().ok())
        .collect();

    let total_silence: f64 = starts
        .iter()
        .zip(ends.iter())
        .map(|(start, end)| end - start)
        .sum();

    (total_silence / duration) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_volume_stats() {
        let output = "\
[Parsed_volumedetect_0 @ 0x55d] n_samples: 4410000\n\
[Parsed_volumedetect_0 @ 0x55d] mean_volume: -21.4 dB\n\
[Parsed_volumedetect_0 @ 0x55d] max_volume: -3.2 dB\n";
        assert_eq!(parse_volume_stats(output), Some((-3.2, -21.4)));
    }

    #[test]
    fn test_parse_volume_stats_missing_fields() {
        assert_eq!(parse_volume_stats("no levels here"), None);
    }

    #[test]
    fn test_parse_silence_ratio() {
        let output = "\
[silencedetect @ 0x55d] silence_start: 1.0\n\
[silencedetect @ 0x55d] silence_end: 3.0 | silence_duration: 2.0\n\
[silencedetect @ 0x55d] silence_start: 8.0\n\
[silencedetect @ 0x55d] silence_end: 9.0 | silence_duration: 1.0\n";
        let ratio = parse_silence_ratio(output, 10.0);
        assert!((ratio - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_silence_ratio_zero_duration() {
        assert_eq!(parse_silence_ratio("", 0.0), 0.0);
    }
}
