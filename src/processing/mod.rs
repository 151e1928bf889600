//! Audio processing pipeline: parsing advisory text into a filter pipeline,
//! describing it for users, and executing it with ffmpeg.

mod describe;
mod executor;
mod parser;

pub use describe::describe_pipeline;
pub use executor::{PipelineExecutor, ProcessedOutput};
pub use parser::parse_recommendations;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while executing a filter pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffmpeg exited with {status}: {stderr}")]
    FfmpegFailed { status: i32, stderr: String },

    #[error("Invalid input path: {0}")]
    InvalidInput(String),
}

/// User-controlled knobs for how aggressive the derived processing should be.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub professional: bool,
}

/// A single parametric EQ band. `width` is an octave value (ffmpeg
/// `width_type=o`); bands apply in list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqBand {
    pub freq: u32,
    pub gain: f64,
    pub width: f64,
}

/// Dynamics compressor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressorSettings {
    pub ratio: f64,
    pub threshold_db: f64,
    pub attack_ms: f64,
    pub release_ms: f64,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            ratio: 4.0,
            threshold_db: -20.0,
            attack_ms: 10.0,
            release_ms: 200.0,
        }
    }
}

/// The filter pipeline derived from measured metrics and advisory text.
///
/// Field presence means the feature is enabled; a disabled feature is always
/// represented by `None`, never by a present-but-inert value. The `eq` list
/// is non-empty whenever present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPipeline {
    /// Cut below this frequency (Hz).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highpass: Option<u32>,

    /// Cut above this frequency (Hz).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowpass: Option<u32>,

    /// Broadband noise-floor reduction strength (0..1).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_reduction: Option<f64>,

    /// Parametric EQ bands, applied in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eq: Option<Vec<EqBand>>,

    /// High-shelf attenuation targeting sibilance; value is the shelf
    /// frequency (Hz).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub de_ess: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<CompressorSettings>,

    /// Peak limiter threshold (dB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limiter: Option<f64>,

    /// Loudness normalization target (LUFS).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize: Option<f64>,

    /// Stereo image factor: >1 widens, <1 narrows, 1 is a no-op.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stereo_width: Option<f64>,
}

impl FilterPipeline {
    /// True when no feature at all is enabled.
    pub fn is_empty(&self) -> bool {
        self.highpass.is_none()
            && self.lowpass.is_none()
            && self.noise_reduction.is_none()
            && self.eq.is_none()
            && self.de_ess.is_none()
            && self.compression.is_none()
            && self.limiter.is_none()
            && self.normalize.is_none()
            && self.stereo_width.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pipeline() {
        let pipeline = FilterPipeline::default();
        assert!(pipeline.is_empty());

        let pipeline = FilterPipeline {
            highpass: Some(80),
            ..Default::default()
        };
        assert!(!pipeline.is_empty());
    }

    #[test]
    fn test_disabled_features_are_absent_from_json() {
        let pipeline = FilterPipeline {
            highpass: Some(80),
            normalize: Some(-14.0),
            ..Default::default()
        };
        let json = serde_json::to_value(&pipeline).unwrap();
        assert_eq!(json["highpass"], 80);
        assert_eq!(json["normalize"], -14.0);
        assert!(json.get("compression").is_none());
        assert!(json.get("eq").is_none());
    }
}
