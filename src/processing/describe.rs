//! Human-readable rendering of a filter pipeline.

use super::FilterPipeline;

/// Render a pipeline as one line per active feature, in a fixed canonical
/// order. Purely formatting: the same pipeline always yields the same lines,
/// so the pre-processing preview and the post-processing confirmation agree.
pub fn describe_pipeline(pipeline: &FilterPipeline) -> Vec<String> {
    let mut descriptions = Vec::new();

    if let Some(target) = pipeline.normalize {
        descriptions.push(format!("Normalize to {} LUFS", target));
    }
    if let Some(freq) = pipeline.highpass {
        descriptions.push(format!("High-pass filter at {}Hz", freq));
    }
    if let Some(freq) = pipeline.lowpass {
        descriptions.push(format!("Low-pass filter at {}Hz", freq));
    }
    if pipeline.noise_reduction.is_some() {
        descriptions.push("Noise reduction".to_string());
    }
    if let Some(eq) = &pipeline.eq {
        let bands = eq
            .iter()
            .map(|b| {
                let sign = if b.gain > 0.0 { "+" } else { "" };
                format!("{}{}dB at {}Hz", sign, b.gain, b.freq)
            })
            .collect::<Vec<_>>()
            .join(", ");
        descriptions.push(format!("EQ: {}", bands));
    }
    if pipeline.de_ess.is_some() {
        descriptions.push("De-esser".to_string());
    }
    if let Some(comp) = &pipeline.compression {
        descriptions.push(format!(
            "Compression ({}:1 ratio, {}dB threshold)",
            comp.ratio, comp.threshold_db
        ));
    }
    if let Some(threshold) = pipeline.limiter {
        descriptions.push(format!("Limiter at {}dB", threshold));
    }

    descriptions
}
