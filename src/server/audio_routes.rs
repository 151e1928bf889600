//! Audio HTTP routes.
//!
//! Provides endpoints for:
//! - Uploading a track for analysis (multipart/form-data)
//! - Applying the recommended processing chain to an analyzed track

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use super::state::ServerState;
use crate::analysis::AudioMetrics;
use crate::conversation_store::MessageRole;
use crate::processing::{describe_pipeline, parse_recommendations, UserPreferences};
use crate::session::{generate_processing_id, PendingSession};

// Uploads are whole audio files; cap them well above typical WAV masters.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub metrics: AudioMetrics,
    pub ai_reply: String,
    pub conversation_id: i64,
    pub processing_id: String,
    pub processing_steps: Vec<String>,
    pub can_process: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessBody {
    #[serde(default)]
    pub processing_id: String,
    /// Redirects the confirmation messages to another conversation.
    pub conversation_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub download_url: String,
    pub filename: String,
    pub message: String,
    pub conversation_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// POST /api/analyze - Upload a file for analysis (multipart/form-data)
async fn analyze_audio(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut original_name: Option<String> = None;
    let mut data: Option<Vec<u8>> = None;
    let mut conversation_id: Option<i64> = None;
    let mut reference_track: Option<String> = None;
    let mut user_vision: Option<String> = None;
    let mut professional = false;

    while let Ok(Some(field)) = multipart.next_field().await {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "audio" => {
                original_name = field.file_name().map(|s| s.to_string());
                match field.bytes().await {
                    Ok(bytes) => data = Some(bytes.to_vec()),
                    Err(e) => {
                        warn!("Failed to read audio data: {}", e);
                        return error_response(StatusCode::BAD_REQUEST, "Failed to read audio");
                    }
                }
            }
            "conversationId" => {
                if let Ok(bytes) = field.bytes().await {
                    conversation_id = String::from_utf8_lossy(&bytes).trim().parse().ok();
                }
            }
            "referenceTrack" => {
                if let Ok(bytes) = field.bytes().await {
                    let value = String::from_utf8_lossy(&bytes).to_string();
                    if !value.is_empty() {
                        reference_track = Some(value);
                    }
                }
            }
            "userVision" => {
                if let Ok(bytes) = field.bytes().await {
                    let value = String::from_utf8_lossy(&bytes).to_string();
                    if !value.is_empty() {
                        user_vision = Some(value);
                    }
                }
            }
            "professional" => {
                if let Ok(bytes) = field.bytes().await {
                    professional = String::from_utf8_lossy(&bytes).trim() == "true";
                }
            }
            _ => {}
        }
    }

    let original_name = match original_name {
        Some(n) if !n.is_empty() => n,
        _ => return error_response(StatusCode::BAD_REQUEST, "No audio file provided"),
    };
    let data = match data {
        Some(d) if !d.is_empty() => d,
        _ => return error_response(StatusCode::BAD_REQUEST, "No audio data provided"),
    };

    debug!(
        "Analyzing upload: {} ({} bytes, professional={})",
        original_name,
        data.len(),
        professional
    );

    let processing_id = generate_processing_id();
    let safe_name = sanitize_filename(&original_name);
    let file_path = state
        .uploads_dir
        .join(format!("{}_{}", processing_id, safe_name));

    if let Err(e) = tokio::fs::write(&file_path, &data).await {
        warn!("Failed to save upload {}: {}", file_path.display(), e);
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to save uploaded file",
        );
    }

    let metrics = state.extractor.analyze(&file_path).await;

    let prefs = effective_preferences(professional, reference_track.as_deref());

    let reference_context = reference_track
        .map(|r| {
            format!(
                "\n\nThe user wants this track to sound like: {}. Compare against that \
                 reference style in your recommendations.",
                r
            )
        })
        .unwrap_or_default();
    let vision_context = user_vision
        .map(|v| format!("\n\nThe user's vision for this track: {}.", v))
        .unwrap_or_default();

    let ai_reply = state
        .advisor
        .generate_analysis(&metrics, &reference_context, &vision_context)
        .await;

    let pipeline = parse_recommendations(&metrics, &ai_reply, &prefs);
    let processing_steps = describe_pipeline(&pipeline);
    let can_process = !pipeline.is_empty();
    let full_reply = compose_analysis_reply(&metrics, &ai_reply, &processing_steps);

    let conversation_id = match resolve_conversation(&state, conversation_id, &original_name) {
        Ok(id) => id,
        Err(e) => {
            warn!("Failed to resolve conversation: {}", e);
            let _ = tokio::fs::remove_file(&file_path).await;
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save analysis");
        }
    };

    let user_message = format!("[Audio Upload] {}", original_name);
    if let Err(e) = state
        .store
        .insert_message(conversation_id, MessageRole::User, &user_message)
        .and_then(|_| {
            state
                .store
                .insert_message(conversation_id, MessageRole::Assistant, &full_reply)
        })
    {
        warn!("Failed to persist analysis messages: {}", e);
    }

    state.sessions.insert(
        processing_id.clone(),
        PendingSession {
            file_path,
            original_name: original_name.clone(),
            metrics: metrics.clone(),
            pipeline,
            conversation_id,
            created_at: std::time::Instant::now(),
        },
    );

    info!(
        "Analysis complete for {} ({} issue(s), {} processing step(s))",
        original_name,
        metrics.issues.len(),
        processing_steps.len()
    );

    Json(AnalyzeResponse {
        metrics,
        ai_reply: full_reply,
        conversation_id,
        processing_id,
        processing_steps,
        can_process,
    })
    .into_response()
}

/// POST /api/process - Apply the recommended pipeline to an analyzed upload
async fn process_audio(
    State(state): State<ServerState>,
    Json(body): Json<ProcessBody>,
) -> impl IntoResponse {
    if body.processing_id.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No processing ID provided");
    }

    let session = match state.sessions.consume(&body.processing_id) {
        Some(s) => s,
        None => {
            return error_response(
                StatusCode::NOT_FOUND,
                "Processing session expired or not found. Please re-analyze the file.",
            );
        }
    };

    let result = state
        .executor
        .process(&session.file_path, &session.pipeline)
        .await;

    // The uploaded source is single-use; remove it whether or not ffmpeg
    // succeeded.
    if let Err(e) = tokio::fs::remove_file(&session.file_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(
                "Failed to remove upload {}: {}",
                session.file_path.display(),
                e
            );
        }
    }

    let output = match result {
        Ok(o) => o,
        Err(e) => {
            warn!("Processing failed for {}: {}", session.original_name, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Audio processing failed");
        }
    };

    // The client may redirect the confirmation into another conversation.
    let conversation_id = body.conversation_id.unwrap_or(session.conversation_id);

    let steps = describe_pipeline(&session.pipeline);
    let user_message = format!(
        "[Processing Request] Apply recommended chain to {}",
        session.original_name
    );
    let assistant_message = format!(
        "Processing complete. Applied:\n{}\n\nYour enhanced file is ready: {}",
        steps.join("\n"),
        output.download_url
    );
    if let Err(e) = state
        .store
        .insert_message(conversation_id, MessageRole::User, &user_message)
        .and_then(|_| {
            state
                .store
                .insert_message(conversation_id, MessageRole::Assistant, &assistant_message)
        })
    {
        warn!("Failed to persist processing messages: {}", e);
    }

    info!(
        "Processed {} -> {}",
        session.original_name, output.output_filename
    );

    Json(ProcessResponse {
        success: true,
        download_url: output.download_url,
        filename: output.output_filename,
        message: "Processing complete".to_string(),
        conversation_id,
    })
    .into_response()
}

/// Derive the processing preferences for an upload. Supplying a reference
/// track implies the user wants a professional-grade match, independent of
/// what the advisory text ends up mentioning.
fn effective_preferences(professional: bool, reference_track: Option<&str>) -> UserPreferences {
    UserPreferences {
        professional: professional || reference_track.is_some(),
    }
}

/// Compose the assistant message for an analyze turn: measured levels, the
/// advisory text, and the proposed step list in one reply.
fn compose_analysis_reply(metrics: &AudioMetrics, ai_reply: &str, steps: &[String]) -> String {
    let issues_block = if metrics.issues.is_empty() {
        String::new()
    } else {
        format!(
            "\n**Issues Detected:**\n{}\n",
            metrics
                .issues
                .iter()
                .map(|i| format!("- {}", i))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    let steps_block = if steps.is_empty() {
        "- Basic normalization and optimization".to_string()
    } else {
        steps
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "**Audio Analysis Results:**\n\
         - Duration: {:.1}s\n\
         - Peak Level: {:.1} dB\n\
         - RMS Level: {:.1} dB\n\
         - Dynamic Range: {:.1} dB\n\
         {}\n\
         {}\n\n\
         ---\n\n\
         **Would you like me to apply these improvements?**\n\
         I can process your audio with the following adjustments:\n\
         {}\n\n\
         Click \"Apply Changes\" below to create an improved version of your audio.",
        metrics.duration,
        metrics.peak_level,
        metrics.rms_level,
        metrics.dynamic_range,
        issues_block,
        ai_reply,
        steps_block
    )
}

fn resolve_conversation(
    state: &ServerState,
    conversation_id: Option<i64>,
    original_name: &str,
) -> anyhow::Result<i64> {
    if let Some(id) = conversation_id {
        return Ok(id);
    }
    let title = format!("Analysis: {}", original_name);
    Ok(state.store.create_conversation(Some(&title))?.id)
}

fn sanitize_filename(filename: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0' => '_',
            _ => c,
        })
        .collect();

    if sanitized.is_empty() || sanitized.starts_with('.') {
        "upload".to_string()
    } else {
        sanitized
    }
}

/// Build the audio routes.
///
/// - POST /analyze - Upload a file for analysis
/// - POST /process - Apply the recommended pipeline
pub fn audio_routes() -> Router<ServerState> {
    let analyze_route = Router::new()
        .route("/analyze", post(analyze_audio))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES));

    analyze_route.route("/process", post(process_audio))
}
