//! Pending-processing session registry.
//!
//! Links a completed analysis (uploaded file + derived filter pipeline) to an
//! opaque id so the user can confirm processing later. Sessions are consumed
//! exactly once or expire after a TTL; expiry deletes the temporary file.

use crate::analysis::AudioMetrics;
use crate::processing::FilterPipeline;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// State held between the analyze step and the apply step.
#[derive(Debug, Clone)]
pub struct PendingSession {
    pub file_path: PathBuf,
    pub original_name: String,
    pub metrics: AudioMetrics,
    pub pipeline: FilterPipeline,
    pub conversation_id: i64,
    pub created_at: Instant,
}

/// Generate an opaque processing identifier.
pub fn generate_processing_id() -> String {
    format!("proc_{}", Uuid::new_v4().simple())
}

/// In-memory registry of pending sessions.
///
/// All operations serialize on one mutex, so a sweep and a concurrent
/// consume cannot both claim the same id: whichever runs first wins and the
/// loser observes not-found. Id collisions are not guarded against (ids
/// carry UUID entropy); if one ever occurs, last write wins.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, PendingSession>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn insert(&self, id: String, session: PendingSession) {
        self.sessions.lock().unwrap().insert(id, session);
    }

    /// Look up a live (unexpired) session without consuming it.
    pub fn get(&self, id: &str) -> Option<PendingSession> {
        let sessions = self.sessions.lock().unwrap();
        sessions
            .get(id)
            .filter(|s| s.created_at.elapsed() < self.ttl)
            .cloned()
    }

    /// Remove and return a live session. A second consume of the same id,
    /// or a consume after expiry, reports not-found.
    pub fn consume(&self, id: &str) -> Option<PendingSession> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions.remove(id)?;
        if session.created_at.elapsed() >= self.ttl {
            // Expired before the sweep got to it; clean up as the sweep would.
            remove_session_file(&session);
            return None;
        }
        Some(session)
    }

    /// Drop every expired session and delete its temporary file. Returns the
    /// number of sessions removed.
    pub fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap();
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.created_at.elapsed() >= self.ttl)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(session) = sessions.remove(id) {
                remove_session_file(&session);
            }
        }

        if !expired.is_empty() {
            info!("Expired {} pending processing session(s)", expired.len());
        }
        expired.len()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

fn remove_session_file(session: &PendingSession) {
    if let Err(e) = std::fs::remove_file(&session.file_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(
                "Failed to remove temp file {}: {}",
                session.file_path.display(),
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn session_with_file(dir: &std::path::Path, name: &str) -> PendingSession {
        let file_path = dir.join(name);
        fs::write(&file_path, b"fake audio").unwrap();
        PendingSession {
            file_path,
            original_name: name.to_string(),
            metrics: AudioMetrics::default(),
            pipeline: FilterPipeline::default(),
            conversation_id: 1,
            created_at: Instant::now(),
        }
    }

    #[test]
    fn test_consume_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = generate_processing_id();
        registry.insert(id.clone(), session_with_file(dir.path(), "a.wav"));

        assert!(registry.get(&id).is_some());
        assert!(registry.consume(&id).is_some());
        assert!(registry.consume(&id).is_none());
        assert!(registry.get(&id).is_none());
    }

    #[test]
    fn test_expired_session_is_not_found_and_file_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(Duration::ZERO);
        let id = generate_processing_id();
        let session = session_with_file(dir.path(), "b.wav");
        let file_path = session.file_path.clone();
        registry.insert(id.clone(), session);

        assert!(registry.get(&id).is_none());
        assert_eq!(registry.sweep_expired(), 1);
        assert!(!file_path.exists());
        assert!(registry.consume(&id).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_sweep_leaves_live_sessions_alone() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = generate_processing_id();
        let session = session_with_file(dir.path(), "c.wav");
        let file_path = session.file_path.clone();
        registry.insert(id.clone(), session);

        assert_eq!(registry.sweep_expired(), 0);
        assert!(file_path.exists());
        assert!(registry.get(&id).is_some());
    }

    #[test]
    fn test_consume_of_expired_session_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new(Duration::ZERO);
        let id = generate_processing_id();
        let session = session_with_file(dir.path(), "d.wav");
        let file_path = session.file_path.clone();
        registry.insert(id.clone(), session);

        assert!(registry.consume(&id).is_none());
        assert!(!file_path.exists());
    }

    #[test]
    fn test_processing_ids_are_unique() {
        let a = generate_processing_id();
        let b = generate_processing_id();
        assert!(a.starts_with("proc_"));
        assert_ne!(a, b);
    }
}
