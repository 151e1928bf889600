//! Shared state for HTTP handlers.

use crate::analysis::MetricsExtractor;
use crate::conversation_store::ConversationStore;
use crate::llm::Advisor;
use crate::processing::PipelineExecutor;
use crate::session::SessionRegistry;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct ServerState {
    pub store: Arc<dyn ConversationStore>,
    pub sessions: Arc<SessionRegistry>,
    pub advisor: Arc<Advisor>,
    pub extractor: Arc<MetricsExtractor>,
    pub executor: Arc<PipelineExecutor>,
    pub uploads_dir: PathBuf,
    pub processed_dir: PathBuf,
}
