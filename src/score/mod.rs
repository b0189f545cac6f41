//! Score records, the submission client, and leaderboard retrieval.
//!
//! The backend is best-effort by design: every remote failure, transport or
//! status or undecodable payload alike, degrades to the local store and is
//! reported as an outcome rather than an error. A finished session must be
//! able to complete regardless of network state.

pub mod leaderboard;
pub mod local;

pub use leaderboard::{LeaderboardEntry, LeaderboardView, RequesterRank};
pub use local::{LocalScoreStore, StoredScore, MAX_RECORDS};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;

use crate::config::BackendConfig;
use crate::metrics;

/// Failures talking to the score backend. All variants are recoverable and
/// route the caller onto the local fallback path.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network unreachable, connection reset, TLS failure.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("backend returned status {0}")]
    Backend(u16),

    /// The backend answered 2xx but the payload did not decode. Treated the
    /// same as a transport failure.
    #[error("unreadable backend payload: {0}")]
    Decode(#[source] reqwest::Error),

    /// No answer within the configured deadline.
    #[error("request timed out after {0}s")]
    Timeout(u64),
}

/// One completed session's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: i64,
    pub user_name: String,
    pub score: u32,
    pub date: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn new(user_id: i64, user_name: String, score: u32) -> Self {
        ScoreRecord {
            user_id,
            user_name,
            score,
            date: Utc::now(),
        }
    }
}

/// Body of `POST /api/save_score`.
#[derive(Debug, Serialize)]
struct SaveScoreRequest<'a> {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "userName")]
    user_name: &'a str,
    score: u32,
}

/// How a submission landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The backend acknowledged the score; the local store was updated too.
    Remote,
    /// The backend was unreachable or unhappy; only the local record exists.
    LocalOnly,
}

impl SubmitOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, SubmitOutcome::LocalOnly)
    }
}

/// Client for the score backend plus the local fallback store.
pub struct ScoreClient {
    pub(crate) client: reqwest::Client,
    pub(crate) config: BackendConfig,
    pub(crate) store: LocalScoreStore,
}

impl ScoreClient {
    pub fn new(config: BackendConfig, store: LocalScoreStore) -> Self {
        ScoreClient {
            client: reqwest::Client::new(),
            config,
            store,
        }
    }

    /// Submit a finished session's result. Remote first; the local store is
    /// upserted on both paths (keep-max per player). Never returns an error:
    /// the session's end transition must not depend on the network.
    pub async fn submit(&self, record: &ScoreRecord) -> SubmitOutcome {
        match self.push_remote(record).await {
            Ok(()) => {
                debug!(
                    "score {} for user {} acknowledged by backend",
                    record.score, record.user_id
                );
                metrics::record_submission(false);
                self.store.upsert(record);
                SubmitOutcome::Remote
            }
            Err(e) => {
                warn!(
                    "score submission for user {} failed: {}; keeping local record only",
                    record.user_id, e
                );
                metrics::record_submission(true);
                self.store.upsert(record);
                SubmitOutcome::LocalOnly
            }
        }
    }

    /// The stored local best for one player, if any.
    pub fn local_best(&self, user_id: i64) -> Option<StoredScore> {
        self.store.best_for(user_id)
    }

    async fn push_remote(&self, record: &ScoreRecord) -> Result<(), BackendError> {
        let url = format!(
            "{}/api/save_score",
            self.config.base_url.trim_end_matches('/')
        );
        let body = SaveScoreRequest {
            user_id: record.user_id,
            user_name: &record.user_name,
            score: record.score,
        };
        let response = timeout(
            self.config.timeout(),
            self.client.post(&url).json(&body).send(),
        )
        .await
        .map_err(|_| BackendError::Timeout(self.config.timeout_seconds))??;

        if !response.status().is_success() {
            return Err(BackendError::Backend(response.status().as_u16()));
        }
        // Any JSON acknowledgement counts; an unreadable body does not.
        let _ack: serde_json::Value = response.json().await.map_err(BackendError::Decode)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_score_wire_field_names() {
        let body = SaveScoreRequest {
            user_id: 42,
            user_name: "Alice",
            score: 17,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"userId": 42, "userName": "Alice", "score": 17})
        );
    }

    #[test]
    fn outcome_degradation_flag() {
        assert!(SubmitOutcome::LocalOnly.is_degraded());
        assert!(!SubmitOutcome::Remote.is_degraded());
    }
}
