//! Audio measurement: loudness and silence statistics via ffprobe/ffmpeg.

mod extractor;

pub use extractor::MetricsExtractor;

use serde::{Deserialize, Serialize};

/// Measured statistics for an uploaded audio file.
///
/// Best-effort: fields default to zero when a probe step fails, with an
/// explanatory entry appended to `issues` instead of a hard error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioMetrics {
    /// Duration in seconds.
    pub duration: f64,
    pub sample_rate: u32,
    pub channels: u32,
    pub bit_rate: u64,
    #[serde(default)]
    pub codec: String,
    /// Peak level in dB (0 = full scale).
    pub peak_level: f64,
    /// Mean (RMS) level in dB.
    pub rms_level: f64,
    /// |peak - rms| in dB.
    pub dynamic_range: f64,
    /// Percentage of the file detected as silence (0-100).
    pub silence_ratio: f64,
    /// Detected problems, in detection order. May be empty.
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Apply the fixed issue-detection rules to measured levels.
///
/// These thresholds are the core's own judgement; the external tools only
/// supply the raw numbers.
pub fn detect_issues(metrics: &mut AudioMetrics) {
    if metrics.peak_level > -0.5 {
        metrics
            .issues
            .push("Clipping detected - peaks are too hot".to_string());
    } else if metrics.peak_level > -3.0 {
        metrics
            .issues
            .push("Peaks are close to clipping - consider reducing gain".to_string());
    }

    if metrics.rms_level < -30.0 {
        metrics
            .issues
            .push("Very quiet recording - may need gain or normalization".to_string());
    } else if metrics.rms_level > -10.0 {
        metrics
            .issues
            .push("Recording is quite loud - watch for compression artifacts".to_string());
    }

    if metrics.dynamic_range < 6.0 {
        metrics
            .issues
            .push("Low dynamic range - may sound over-compressed".to_string());
    } else if metrics.dynamic_range > 25.0 {
        metrics
            .issues
            .push("High dynamic range - may need compression for consistency".to_string());
    }

    if metrics.silence_ratio > 30.0 {
        metrics
            .issues
            .push("Significant silence detected - consider trimming".to_string());
    }
}

/// Render metrics as plain text for inclusion in an LLM prompt.
pub fn format_metrics_for_prompt(metrics: &AudioMetrics) -> String {
    let channels = match metrics.channels {
        1 => "Mono".to_string(),
        2 => "Stereo".to_string(),
        n => format!("{} channels", n),
    };

    let issues = if metrics.issues.is_empty() {
        "No major issues detected.".to_string()
    } else {
        format!(
            "DETECTED ISSUES:\n{}",
            metrics
                .issues
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    format!(
        "AUDIO FILE ANALYSIS RESULTS:\n\
         ============================\n\
         Duration: {:.2} seconds\n\
         Sample Rate: {} Hz\n\
         Channels: {}\n\
         Codec: {}\n\
         \n\
         LEVELS:\n\
         - Peak Level: {:.1} dB\n\
         - RMS Level: {:.1} dB\n\
         - Dynamic Range: {:.1} dB\n\
         - Silence Ratio: {:.1}%\n\
         \n\
         {}",
        metrics.duration,
        metrics.sample_rate,
        channels,
        metrics.codec,
        metrics.peak_level,
        metrics.rms_level,
        metrics.dynamic_range,
        metrics.silence_ratio,
        issues
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(peak: f64, rms: f64, range: f64, silence: f64) -> AudioMetrics {
        AudioMetrics {
            peak_level: peak,
            rms_level: rms,
            dynamic_range: range,
            silence_ratio: silence,
            ..Default::default()
        }
    }

    #[test]
    fn test_clipping_thresholds() {
        let mut m = metrics(-0.2, -20.0, 19.8, 0.0);
        detect_issues(&mut m);
        assert!(m.issues[0].contains("Clipping detected"));

        let mut m = metrics(-2.0, -20.0, 18.0, 0.0);
        detect_issues(&mut m);
        assert!(m.issues[0].contains("close to clipping"));

        let mut m = metrics(-6.0, -20.0, 14.0, 0.0);
        detect_issues(&mut m);
        assert!(!m.issues.iter().any(|i| i.contains("lipping")));
    }

    #[test]
    fn test_level_thresholds() {
        let mut m = metrics(-10.0, -35.0, 25.0, 0.0);
        detect_issues(&mut m);
        assert!(m.issues.iter().any(|i| i.contains("Very quiet")));

        let mut m = metrics(-1.0, -8.0, 7.0, 0.0);
        detect_issues(&mut m);
        assert!(m.issues.iter().any(|i| i.contains("quite loud")));
    }

    #[test]
    fn test_dynamic_range_and_silence_thresholds() {
        let mut m = metrics(-4.0, -8.5, 4.5, 35.0);
        detect_issues(&mut m);
        assert!(m.issues.iter().any(|i| i.contains("over-compressed")));
        assert!(m.issues.iter().any(|i| i.contains("trimming")));

        let mut m = metrics(-3.5, -30.0, 26.5, 0.0);
        detect_issues(&mut m);
        assert!(m
            .issues
            .iter()
            .any(|i| i.contains("may need compression")));
    }

    #[test]
    fn test_healthy_recording_has_no_issues() {
        let mut m = metrics(-6.0, -18.0, 12.0, 5.0);
        detect_issues(&mut m);
        assert!(m.issues.is_empty());
    }

    #[test]
    fn test_prompt_formatting_mentions_issues() {
        let mut m = metrics(-0.1, -20.0, 19.9, 0.0);
        m.sample_rate = 44100;
        m.channels = 2;
        m.codec = "pcm_s16le".to_string();
        detect_issues(&mut m);

        let text = format_metrics_for_prompt(&m);
        assert!(text.contains("Stereo"));
        assert!(text.contains("DETECTED ISSUES"));
        assert!(text.contains("Clipping detected"));
    }
}
