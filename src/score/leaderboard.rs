//! Leaderboard retrieval.
//!
//! The backend's ranked standings and the local best-score table are
//! deliberately distinct shapes: [`LeaderboardView::Ranked`] carries server
//! ranks and the requesting player's out-of-top position, while
//! [`LeaderboardView::LocalFallback`] is client-sorted and unranked by any
//! server. Callers must branch; conflating the two would present local
//! guesses as authoritative ranks.

use log::warn;
use serde::Deserialize;
use tokio::time::timeout;

use super::local::StoredScore;
use super::{BackendError, ScoreClient};

/// Wire shape of `GET /api/leaderboard?user_id=<id>`. Decoded strictly; a
/// payload that does not fit is a transport-class failure, never a crash.
#[derive(Debug, Deserialize)]
struct LeaderboardResponse {
    leaderboard: Vec<WireEntry>,
    #[serde(rename = "userInTop")]
    user_in_top: bool,
    #[serde(rename = "userRank", default)]
    user_rank: Option<u32>,
    #[serde(rename = "totalPlayers", default)]
    total_players: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireEntry {
    rank: u32,
    #[serde(rename = "userName")]
    user_name: String,
    score: i64,
    #[serde(default)]
    date: String,
    #[serde(rename = "isCurrentUser", default)]
    is_current_user: bool,
}

/// One ranked row as the server reported it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_name: String,
    pub score: i64,
    pub date: String,
    pub is_current_user: bool,
}

/// The requesting player's position when they fall outside the returned
/// top set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequesterRank {
    pub rank: u32,
    pub total_players: u32,
}

#[derive(Debug, Clone)]
pub enum LeaderboardView {
    /// Server-ranked standings.
    Ranked {
        entries: Vec<LeaderboardEntry>,
        /// Present only when the requester is not in `entries`.
        requester: Option<RequesterRank>,
    },
    /// Degraded mode: the local best-score-per-player table, client-sorted
    /// descending. Callers must render a degraded indicator.
    LocalFallback { records: Vec<StoredScore> },
}

impl ScoreClient {
    /// Fetch standings for display. Any failure, transport or decode alike,
    /// falls back to the local table; this method never errors.
    pub async fn leaderboard(&self, user_id: i64) -> LeaderboardView {
        match self.fetch_ranked(user_id).await {
            Ok(view) => view,
            Err(e) => {
                warn!("leaderboard fetch failed: {}; serving local records", e);
                LeaderboardView::LocalFallback {
                    records: self.store.best_scores(),
                }
            }
        }
    }

    async fn fetch_ranked(&self, user_id: i64) -> Result<LeaderboardView, BackendError> {
        let url = format!(
            "{}/api/leaderboard?user_id={}",
            self.config.base_url.trim_end_matches('/'),
            user_id
        );
        let response = timeout(self.config.timeout(), self.client.get(&url).send())
            .await
            .map_err(|_| BackendError::Timeout(self.config.timeout_seconds))??;
        if !response.status().is_success() {
            return Err(BackendError::Backend(response.status().as_u16()));
        }
        let decoded: LeaderboardResponse =
            response.json().await.map_err(BackendError::Decode)?;
        Ok(ranked_view(decoded))
    }
}

fn ranked_view(wire: LeaderboardResponse) -> LeaderboardView {
    let requester = if wire.user_in_top {
        None
    } else {
        match (wire.user_rank, wire.total_players) {
            (Some(rank), Some(total_players)) => Some(RequesterRank {
                rank,
                total_players,
            }),
            _ => None,
        }
    };
    let entries = wire
        .leaderboard
        .into_iter()
        .map(|e| LeaderboardEntry {
            rank: e.rank,
            user_name: e.user_name,
            score: e.score,
            date: e.date,
            is_current_user: e.is_current_user,
        })
        .collect();
    LeaderboardView::Ranked { entries, requester }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_ranked_response_with_requester_in_top() {
        let raw = r#"{
            "leaderboard": [
                {"rank": 1, "userName": "Alice", "score": 44, "date": "2025-12-30", "isCurrentUser": false},
                {"rank": 2, "userName": "Bob", "score": 31, "date": "2025-12-29", "isCurrentUser": true}
            ],
            "userInTop": true
        }"#;
        let wire: LeaderboardResponse = serde_json::from_str(raw).unwrap();
        match ranked_view(wire) {
            LeaderboardView::Ranked { entries, requester } => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].rank, 1);
                assert_eq!(entries[0].user_name, "Alice");
                assert!(entries[1].is_current_user);
                assert!(requester.is_none(), "in-top requester has no extra pair");
            }
            LeaderboardView::LocalFallback { .. } => panic!("expected ranked view"),
        }
    }

    #[test]
    fn decodes_out_of_top_requester_pair() {
        let raw = r#"{
            "leaderboard": [
                {"rank": 1, "userName": "Alice", "score": 44, "date": "2025-12-30", "isCurrentUser": false}
            ],
            "userInTop": false,
            "userRank": 57,
            "totalPlayers": 420
        }"#;
        let wire: LeaderboardResponse = serde_json::from_str(raw).unwrap();
        match ranked_view(wire) {
            LeaderboardView::Ranked { requester, .. } => {
                let requester = requester.expect("out-of-top pair");
                assert_eq!(requester.rank, 57);
                assert_eq!(requester.total_players, 420);
            }
            LeaderboardView::LocalFallback { .. } => panic!("expected ranked view"),
        }
    }

    #[test]
    fn missing_optional_fields_still_decode() {
        let raw = r#"{
            "leaderboard": [{"rank": 1, "userName": "Alice", "score": 44}],
            "userInTop": false
        }"#;
        let wire: LeaderboardResponse = serde_json::from_str(raw).unwrap();
        match ranked_view(wire) {
            LeaderboardView::Ranked { entries, requester } => {
                assert_eq!(entries[0].date, "");
                assert!(!entries[0].is_current_user);
                assert!(requester.is_none(), "half a pair is no pair");
            }
            LeaderboardView::LocalFallback { .. } => panic!("expected ranked view"),
        }
    }

    #[test]
    fn malformed_payload_fails_decode() {
        let raw = r#"{"leaderboard": "nope", "userInTop": false}"#;
        assert!(serde_json::from_str::<LeaderboardResponse>(raw).is_err());
    }
}
