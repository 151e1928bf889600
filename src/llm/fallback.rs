//! Deterministic local advisory-text generation.
//!
//! Used when no hosted provider is configured or the provider call fails.
//! The output deliberately contains the same keyword vocabulary the
//! recommendation parser matches on, so the downstream pipeline still
//! derives a sensible configuration from it.

use super::advisor::ChatModes;
use crate::analysis::AudioMetrics;

/// Produce a templated analysis from measured metrics alone.
pub fn local_analysis(
    metrics: &AudioMetrics,
    reference_context: &str,
    vision_context: &str,
) -> String {
    let mut parts = vec!["Quick Assessment: This audio has been analyzed by Engnr.".to_string()];

    if metrics.peak_level > -1.0 {
        parts.push("Peaks are high; recommend limiter/clip prevention.".to_string());
    }
    if metrics.rms_level < -30.0 {
        parts.push("Recording is quiet; recommend normalization and bring up the level.".to_string());
    }
    if metrics.dynamic_range < 6.0 {
        parts.push("Low dynamic range; consider compression.".to_string());
    }
    if metrics.silence_ratio > 20.0 {
        parts.push("Significant silence detected; consider trimming.".to_string());
    }

    let mut hints = Vec::new();
    if metrics.rms_level < -24.0 {
        hints.push("normalize");
    }
    if metrics.peak_level > -3.0 {
        hints.push("limiter");
    }
    if metrics.dynamic_range < 8.0 {
        hints.push("compress");
    }
    if metrics.silence_ratio > 20.0 {
        hints.push("trim");
    }
    if !reference_context.is_empty() {
        hints.push("professional");
    }
    if !vision_context.is_empty() {
        hints.push("user-vision");
    }

    let recommendations = if hints.is_empty() {
        "basic normalization".to_string()
    } else {
        hints.join(", ")
    };

    parts.push(format!("Recommendations: {}", recommendations));
    parts.push(
        "Pro Processing Chain: normalize, compression, de-essing if needed, EQ, limiter"
            .to_string(),
    );
    parts.push("Polish: gentle high-shelf for air, midrange presence around 3kHz".to_string());

    parts.join("\n\n")
}

/// Produce a templated chat reply.
pub fn local_chat(prompt: &str, modes: &ChatModes) -> String {
    if modes.fast {
        return "Short: Understood. Quick tip: check gain staging and de-ess.".to_string();
    }
    format!("Engnr reply: I read your prompt and can help. You asked: {}", prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_analysis_is_deterministic() {
        let metrics = AudioMetrics {
            peak_level: -0.5,
            rms_level: -32.0,
            dynamic_range: 5.0,
            silence_ratio: 25.0,
            ..Default::default()
        };
        let a = local_analysis(&metrics, "", "");
        let b = local_analysis(&metrics, "", "");
        assert_eq!(a, b);
    }

    #[test]
    fn test_local_analysis_emits_parser_keywords() {
        let metrics = AudioMetrics {
            peak_level: -0.5,
            rms_level: -32.0,
            dynamic_range: 5.0,
            silence_ratio: 25.0,
            ..Default::default()
        };
        let text = local_analysis(&metrics, "sound like the reference", "");
        assert!(text.contains("normalize"));
        assert!(text.contains("limiter"));
        assert!(text.contains("compress"));
        assert!(text.contains("professional"));
    }

    #[test]
    fn test_local_analysis_quiet_defaults() {
        let metrics = AudioMetrics {
            peak_level: -12.0,
            rms_level: -18.0,
            dynamic_range: 10.0,
            ..Default::default()
        };
        let text = local_analysis(&metrics, "", "");
        assert!(text.contains("basic normalization"));
    }

    #[test]
    fn test_local_chat_modes() {
        let fast = local_chat("help", &ChatModes { fast: true, ..Default::default() });
        assert!(fast.starts_with("Short:"));

        let normal = local_chat("help with my mix", &ChatModes::default());
        assert!(normal.contains("help with my mix"));
    }
}
