//! Submission and leaderboard degradation when the backend is unreachable.

use clickrush::config::BackendConfig;
use clickrush::score::{LeaderboardView, LocalScoreStore, ScoreClient, ScoreRecord, SubmitOutcome};
use tempfile::tempdir;

fn unreachable_client(base_dir: &std::path::Path) -> ScoreClient {
    // Nothing listens on the discard port; connections are refused fast.
    let config = BackendConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_seconds: 2,
    };
    ScoreClient::new(config, LocalScoreStore::new(base_dir))
}

#[tokio::test]
async fn transport_failure_still_upserts_the_local_record() {
    let tmp = tempdir().unwrap();
    let client = unreachable_client(tmp.path());

    let outcome = client
        .submit(&ScoreRecord::new(7, "Offline Ollie".to_string(), 7))
        .await;
    assert_eq!(outcome, SubmitOutcome::LocalOnly);
    assert!(outcome.is_degraded());

    let best = client.local_best(7).expect("local record written");
    assert_eq!(best.score, 7);
    assert_eq!(best.user_name, "Offline Ollie");
}

#[tokio::test]
async fn repeated_degraded_submissions_keep_the_best_score() {
    let tmp = tempdir().unwrap();
    let client = unreachable_client(tmp.path());

    for score in [12, 5, 30, 18] {
        let outcome = client
            .submit(&ScoreRecord::new(3, "Alice".to_string(), score))
            .await;
        assert_eq!(outcome, SubmitOutcome::LocalOnly);
    }
    assert_eq!(client.local_best(3).unwrap().score, 30);
}

#[tokio::test]
async fn leaderboard_falls_back_to_local_records_sorted_descending() {
    let tmp = tempdir().unwrap();
    let client = unreachable_client(tmp.path());

    client
        .submit(&ScoreRecord::new(1, "low".to_string(), 2))
        .await;
    client
        .submit(&ScoreRecord::new(2, "high".to_string(), 41))
        .await;
    client
        .submit(&ScoreRecord::new(3, "mid".to_string(), 19))
        .await;

    match client.leaderboard(2).await {
        LeaderboardView::LocalFallback { records } => {
            let scores: Vec<u32> = records.iter().map(|r| r.score).collect();
            assert_eq!(scores, vec![41, 19, 2]);
        }
        LeaderboardView::Ranked { .. } => {
            panic!("an unreachable backend must yield the local fallback view")
        }
    }
}

#[tokio::test]
async fn empty_store_falls_back_to_an_empty_table() {
    let tmp = tempdir().unwrap();
    let client = unreachable_client(tmp.path());
    match client.leaderboard(1).await {
        LeaderboardView::LocalFallback { records } => assert!(records.is_empty()),
        LeaderboardView::Ranked { .. } => panic!("expected fallback"),
    }
}
