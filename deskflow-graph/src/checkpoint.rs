//! Checkpointing: the persistence seam for pause/resume and transcripts.
//!
//! A thread's latest checkpoint *is* its session: graph state (including
//! the conversation transcript channel) plus where execution stands.

use crate::error::{GraphError, Result};
use crate::interrupt::ApprovalRequest;
use crate::state::State;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub thread_id: String,
    pub checkpoint_id: String,
    pub state: State,
    pub step: usize,
    /// Nodes queued to run next; the resume point after a pause.
    pub pending_nodes: Vec<String>,
    /// Approval the run is waiting on, if paused.
    pub interrupt: Option<ApprovalRequest>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Checkpoint {
    pub fn new(thread_id: &str, state: State, step: usize, pending_nodes: Vec<String>) -> Self {
        Self {
            thread_id: thread_id.to_string(),
            checkpoint_id: uuid::Uuid::new_v4().to_string(),
            state,
            step,
            pending_nodes,
            interrupt: None,
            created_at: chrono::Utc::now(),
        }
    }

    pub fn with_interrupt(mut self, request: ApprovalRequest) -> Self {
        self.interrupt = Some(request);
        self
    }
}

#[async_trait]
pub trait Checkpointer: Send + Sync {
    async fn save(&self, checkpoint: Checkpoint) -> Result<String>;

    /// Latest checkpoint for a thread, if any.
    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// All checkpoints for a thread, oldest first.
    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>>;

    async fn delete(&self, thread_id: &str) -> Result<()>;
}

/// In-process checkpoint store. Sessions live and die with the process.
#[derive(Default)]
pub struct MemoryCheckpointer {
    threads: Arc<RwLock<HashMap<String, Vec<Checkpoint>>>>,
}

impl MemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for MemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<String> {
        let id = checkpoint.checkpoint_id.clone();
        let mut threads = self.threads.write().await;
        threads.entry(checkpoint.thread_id.clone()).or_default().push(checkpoint);
        Ok(id)
    }

    async fn latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).and_then(|cps| cps.last()).cloned())
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let threads = self.threads.read().await;
        Ok(threads.get(thread_id).cloned().unwrap_or_default())
    }

    async fn delete(&self, thread_id: &str) -> Result<()> {
        let mut threads = self.threads.write().await;
        threads.remove(thread_id);
        Ok(())
    }
}

/// Load the latest checkpoint or fail with a thread-scoped error.
pub(crate) async fn require_latest(
    checkpointer: &dyn Checkpointer,
    thread_id: &str,
) -> Result<Checkpoint> {
    checkpointer
        .latest(thread_id)
        .await?
        .ok_or_else(|| GraphError::NoCheckpoint(thread_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_latest_wins() {
        let store = MemoryCheckpointer::new();

        store.save(Checkpoint::new("t1", State::new(), 0, vec!["a".into()])).await.unwrap();
        let mut state = State::new();
        state.insert("v".into(), json!(1));
        store.save(Checkpoint::new("t1", state, 1, vec!["b".into()])).await.unwrap();

        let latest = store.latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.step, 1);
        assert_eq!(latest.pending_nodes, vec!["b".to_string()]);

        assert_eq!(store.list("t1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_clears_thread() {
        let store = MemoryCheckpointer::new();
        store.save(Checkpoint::new("t1", State::new(), 0, vec![])).await.unwrap();
        store.delete("t1").await.unwrap();
        assert!(store.latest("t1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_interrupt_rides_the_checkpoint() {
        let store = MemoryCheckpointer::new();
        let cp = Checkpoint::new("t1", State::new(), 2, vec!["tools".into()])
            .with_interrupt(ApprovalRequest::new("delete_ticket", json!({"id": 9}), "Delete 9"));
        store.save(cp).await.unwrap();

        let latest = store.latest("t1").await.unwrap().unwrap();
        assert_eq!(latest.interrupt.unwrap().tool_name, "delete_ticket");
    }
}
