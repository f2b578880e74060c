use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier handed out when a print job is accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A raw printer payload waiting for dispatch
///
/// Consumed once by the dispatcher; its outcome is logged, never stored.
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub id: SubmissionId,
    pub payload: Vec<u8>,
    pub submitted_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            id: SubmissionId::new(),
            payload,
            submitted_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
