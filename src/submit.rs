//! Submission Coordinator: remote-then-local persistence of a prediction.
//!
//! The remote endpoint is treated as a mirror of the local store, not the
//! other way around: a successful remote reply is followed by a local
//! write, and any remote failure (404, timeout, transport error) falls
//! back synchronously to a local-only write marked with `local_backup`.
//! There is no retry queue; a failed remote attempt is abandoned once the
//! local fallback has succeeded or definitively failed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::catalog::AnswerSet;
use crate::store::{StoreError, StudentStore};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("unknown student: {0}")]
    UnknownStudent(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// The only unrecoverable path: both the remote endpoint and the local
    /// store refused the submission.
    #[error("local save failed after remote fallback: {0}")]
    LocalSaveFailed(#[source] StoreError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPath {
    Remote,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub persisted: bool,
    pub via: SubmissionPath,
}

pub struct SubmissionCoordinator {
    store: Arc<dyn StudentStore>,
    client: Client,
    endpoint: String,
}

impl SubmissionCoordinator {
    pub fn new(
        store: Arc<dyn StudentStore>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SubmitError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            store,
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Persists one completed prediction. Each call appends a new record;
    /// repeated submission is safe because readers resolve "last response"
    /// by recency.
    pub async fn submit(
        &self,
        student_id: &str,
        domain: &str,
        confidence: f32,
        raw_answers: &AnswerSet,
    ) -> Result<SubmissionOutcome, SubmitError> {
        // Validate locally before touching the network.
        let Some(student) = self.store.get_student_info(student_id).await? else {
            warn!("submission refused: student {student_id} is not registered");
            return Err(SubmitError::UnknownStudent(student_id.to_string()));
        };

        let payload = json!({
            "student_id": student_id,
            "full_name": student.full_name,
            "class_name": student.class_name,
            "domaine": domain,
            "confidence": confidence,
            "answers": raw_answers,
        });

        let remote_ok = match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(resp) if resp.status() == StatusCode::NOT_FOUND => {
                warn!("remote endpoint does not know student {student_id}; saving locally");
                false
            }
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!("remote submission returned {}; saving locally", resp.status());
                false
            }
            Err(e) => {
                warn!("remote submission unreachable ({e}); saving locally");
                false
            }
        };

        if remote_ok {
            // Deliberate mirror write; the stores are not otherwise synced.
            let record = json!({
                "domaine": domain,
                "confidence": confidence,
                "submission_date": Utc::now().to_rfc3339(),
                "answers": raw_answers,
            });
            if let Err(e) = self.store.save_response(student_id, record).await {
                error!("local mirror write failed after remote success: {e}");
            }
            info!("submission for {student_id} accepted remotely");
            return Ok(SubmissionOutcome {
                persisted: true,
                via: SubmissionPath::Remote,
            });
        }

        let record = json!({
            "domaine": domain,
            "confidence": confidence,
            "submission_date": Utc::now().to_rfc3339(),
            "answers": raw_answers,
            "local_backup": true,
        });
        self.store
            .save_response(student_id, record)
            .await
            .map_err(SubmitError::LocalSaveFailed)?;

        info!("submission for {student_id} saved locally");
        Ok(SubmissionOutcome {
            persisted: true,
            via: SubmissionPath::Local,
        })
    }
}
