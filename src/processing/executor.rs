//! Applies a filter pipeline to an audio file via ffmpeg.

use super::{FilterPipeline, ProcessingError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Result of a successful pipeline execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedOutput {
    pub output_path: PathBuf,
    pub output_filename: String,
    pub download_url: String,
}

/// Build the ordered ffmpeg audio-filter chain for a pipeline.
///
/// Order is fixed and matters: EQ bands are not commutative when they
/// overlap, and the de-esser and compressor must run before the limiter and
/// loudness normalization.
pub fn build_filter_chain(pipeline: &FilterPipeline) -> Vec<String> {
    let mut filters = Vec::new();

    if let Some(freq) = pipeline.highpass {
        filters.push(format!("highpass=f={}", freq));
    }
    if let Some(freq) = pipeline.lowpass {
        filters.push(format!("lowpass=f={}", freq));
    }
    if let Some(amount) = pipeline.noise_reduction {
        filters.push(format!("afftdn=nf={}", amount));
    }
    if let Some(eq) = &pipeline.eq {
        for band in eq {
            filters.push(format!(
                "equalizer=f={}:width_type=o:width={}:g={}",
                band.freq, band.width, band.gain
            ));
        }
    }
    if let Some(freq) = pipeline.de_ess {
        filters.push(format!("highshelf=f={}:g=-4", freq));
    }
    if let Some(comp) = &pipeline.compression {
        filters.push(format!(
            "acompressor=threshold={}dB:ratio={}:attack={}:release={}",
            comp.threshold_db, comp.ratio, comp.attack_ms, comp.release_ms
        ));
    }
    if let Some(threshold) = pipeline.limiter {
        filters.push(format!("alimiter=limit={}dB:level=disabled", threshold));
    }
    if let Some(target) = pipeline.normalize {
        filters.push(format!("loudnorm=I={}:TP=-1:LRA=11", target));
    }
    if let Some(width) = pipeline.stereo_width {
        if width > 1.0 {
            filters.push(format!("stereotools=mlev=1:slev={}", width));
        } else if width < 1.0 {
            filters.push(format!("stereotools=mlev={}:slev={}", 2.0 - width, width));
        }
        // width == 1.0 is a no-op
    }

    filters
}

/// Executes filter pipelines by spawning ffmpeg, writing 24-bit 48kHz WAV
/// output into a fixed directory.
pub struct PipelineExecutor {
    ffmpeg: PathBuf,
    processed_dir: PathBuf,
}

impl PipelineExecutor {
    pub fn new(ffmpeg: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            processed_dir: processed_dir.into(),
        }
    }

    /// Apply `pipeline` to the file at `input_path`.
    ///
    /// Fails if the input is unreadable or ffmpeg rejects the filter graph;
    /// the error carries ffmpeg's stderr so the caller can report it.
    pub async fn process(
        &self,
        input_path: &Path,
        pipeline: &FilterPipeline,
    ) -> Result<ProcessedOutput, ProcessingError> {
        let stem = input_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ProcessingError::InvalidInput(input_path.display().to_string()))?;

        let output_filename = format!(
            "{}_processed_{}.wav",
            stem,
            chrono::Utc::now().timestamp_millis()
        );
        let output_path = self.processed_dir.join(&output_filename);

        let filters = build_filter_chain(pipeline);

        let mut command = Command::new(&self.ffmpeg);
        command.arg("-y").arg("-i").arg(input_path);
        if !filters.is_empty() {
            command.arg("-af").arg(filters.join(","));
        }
        command
            .args(["-acodec", "pcm_s24le", "-ar", "48000", "-f", "wav"])
            .arg(&output_path);

        debug!(?filters, input = %input_path.display(), "Running ffmpeg filter pipeline");

        let output = command.output().await?;
        if !output.status.success() {
            // Don't leave a partial output file behind on failure.
            let _ = std::fs::remove_file(&output_path);
            return Err(ProcessingError::FfmpegFailed {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        info!(output = %output_path.display(), "Pipeline execution complete");

        Ok(ProcessedOutput {
            download_url: format!("/processed/{}", output_filename),
            output_filename,
            output_path,
        })
    }
}
