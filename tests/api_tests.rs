//! HTTP API tests.
//!
//! Exercise the router in-process with an in-memory advisory fallback and a
//! real SQLite store in a temp directory. No ffmpeg and no network needed:
//! routes that would spawn ffmpeg are only tested for their error paths.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use engnr_server::analysis::{AudioMetrics, MetricsExtractor};
use engnr_server::conversation_store::{ConversationStore, SqliteConversationStore};
use engnr_server::llm::Advisor;
use engnr_server::processing::{FilterPipeline, PipelineExecutor};
use engnr_server::server::{app, ServerState};
use engnr_server::session::{PendingSession, SessionRegistry};

struct TestApp {
    data_dir: TempDir,
    router: Router,
    store: Arc<SqliteConversationStore>,
    sessions: Arc<SessionRegistry>,
}

fn spawn_app() -> TestApp {
    spawn_app_with_ffmpeg("ffmpeg")
}

/// `ffmpeg` is whatever command the executor should spawn; tests that walk
/// the process route substitute `true` so the run succeeds without ffmpeg
/// installed.
fn spawn_app_with_ffmpeg(ffmpeg: &str) -> TestApp {
    let data_dir = TempDir::new().unwrap();
    let uploads_dir = data_dir.path().join("uploads");
    let processed_dir = data_dir.path().join("processed");
    std::fs::create_dir_all(&uploads_dir).unwrap();
    std::fs::create_dir_all(&processed_dir).unwrap();

    let store =
        Arc::new(SqliteConversationStore::new(data_dir.path().join("conversations.db")).unwrap());
    let sessions = Arc::new(SessionRegistry::new(Duration::from_secs(60)));

    let state = ServerState {
        store: store.clone() as Arc<dyn ConversationStore>,
        sessions: sessions.clone(),
        advisor: Arc::new(Advisor::new(None, Duration::from_secs(1))),
        extractor: Arc::new(MetricsExtractor::new("ffmpeg", "ffprobe")),
        executor: Arc::new(PipelineExecutor::new(ffmpeg, &processed_dir)),
        uploads_dir,
        processed_dir,
    };

    TestApp {
        router: app(state),
        data_dir,
        store,
        sessions,
    }
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app();

    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_conversations_empty_initially() {
    let app = spawn_app();

    let response = app
        .router
        .oneshot(
            Request::get("/api/conversations")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_chat_creates_conversation_and_persists_messages() {
    let app = spawn_app();

    let response = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chat",
            serde_json::json!({"prompt": "how loud should my master be?"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let conversation_id = body["conversationId"].as_i64().unwrap();
    assert!(!body["reply"].as_str().unwrap().is_empty());

    // Both sides of the exchange are persisted, oldest first.
    let messages = app.store.get_messages(conversation_id).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "how loud should my master be?");

    // Conversation title comes from the first message.
    let conversations = app.store.list_conversations().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].title, "how loud should my master be?");
}

#[tokio::test]
async fn test_chat_continues_existing_conversation() {
    let app = spawn_app();

    let first = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chat",
            serde_json::json!({"prompt": "first question"}),
        ))
        .await
        .unwrap();
    let conversation_id = body_json(first).await["conversationId"].as_i64().unwrap();

    let second = app
        .router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/chat",
            serde_json::json!({
                "prompt": "follow-up question",
                "conversationId": conversation_id,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::OK);
    let body = body_json(second).await;
    assert_eq!(body["conversationId"].as_i64().unwrap(), conversation_id);

    assert_eq!(app.store.get_messages(conversation_id).unwrap().len(), 4);
    assert_eq!(app.store.list_conversations().unwrap().len(), 1);
}

#[tokio::test]
async fn test_chat_rejects_empty_prompt_without_lyrics() {
    let app = spawn_app();

    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/chat",
            serde_json::json!({"prompt": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some());
}

#[tokio::test]
async fn test_get_messages_returns_camel_case_fields() {
    let app = spawn_app();

    let conv = app.store.create_conversation(Some("fields")).unwrap();
    app.store
        .insert_message(
            conv.id,
            engnr_server::conversation_store::MessageRole::User,
            "hi",
        )
        .unwrap();

    let response = app
        .router
        .oneshot(
            Request::get(format!("/api/conversations/{}/messages", conv.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let message = &body.as_array().unwrap()[0];
    assert_eq!(message["conversationId"].as_i64().unwrap(), conv.id);
    assert_eq!(message["role"], "user");
    assert!(message["createdAt"].as_i64().is_some());
}

#[tokio::test]
async fn test_delete_conversation() {
    let app = spawn_app();

    let conv = app.store.create_conversation(Some("doomed")).unwrap();
    app.store
        .insert_message(
            conv.id,
            engnr_server::conversation_store::MessageRole::User,
            "bye",
        )
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::delete(format!("/api/conversations/{}", conv.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.store.list_conversations().unwrap().is_empty());
    assert!(app.store.get_messages(conv.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_process_unknown_session_is_not_found() {
    let app = spawn_app();

    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/process",
            serde_json::json!({"processingId": "proc_doesnotexist"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn test_process_redirects_confirmation_to_requested_conversation() {
    let app = spawn_app_with_ffmpeg("true");

    let analyzed = app.store.create_conversation(Some("Analysis: mix.wav")).unwrap();
    let redirect = app.store.create_conversation(Some("main thread")).unwrap();

    let file_path = app.data_dir.path().join("uploads").join("proc_test_mix.wav");
    std::fs::write(&file_path, b"fake audio").unwrap();

    app.sessions.insert(
        "proc_test".to_string(),
        PendingSession {
            file_path: file_path.clone(),
            original_name: "mix.wav".to_string(),
            metrics: AudioMetrics::default(),
            pipeline: FilterPipeline::default(),
            conversation_id: analyzed.id,
            created_at: std::time::Instant::now(),
        },
    );

    let response = app
        .router
        .oneshot(json_request(
            "POST",
            "/api/process",
            serde_json::json!({
                "processingId": "proc_test",
                "conversationId": redirect.id,
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["conversationId"].as_i64().unwrap(), redirect.id);

    // Both confirmation messages land in the requested conversation, not the
    // one the analysis started in.
    assert_eq!(app.store.get_messages(redirect.id).unwrap().len(), 2);
    assert!(app.store.get_messages(analyzed.id).unwrap().is_empty());

    // The uploaded source is single-use.
    assert!(!file_path.exists());
}

#[tokio::test]
async fn test_analyze_without_file_is_bad_request() {
    let app = spawn_app();

    let boundary = "test-boundary";
    let multipart_body = format!(
        "--{boundary}\r\ncontent-disposition: form-data; name=\"professional\"\r\n\r\ntrue\r\n--{boundary}--\r\n"
    );

    let response = app
        .router
        .oneshot(
            Request::post("/api/analyze")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(multipart_body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("audio"));
}
