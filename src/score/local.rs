//! Local fallback score store.
//!
//! A JSON table at `<data_dir>/scores/records.json` keyed by user id, one
//! best record per player. File access is guarded with fs2 locks (shared
//! for read, exclusive for write) so a relay process and a game process on
//! the same data dir cannot tear the file. The table is bounded at
//! [`MAX_RECORDS`]; when full, the lowest scores are evicted first.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::ScoreRecord;

/// Upper bound on stored records.
pub const MAX_RECORDS: usize = 100;

/// One stored best result. Field names match the submission wire contract
/// so an exported table reads the same as the backend's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredScore {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub score: u32,
    pub date: DateTime<Utc>,
}

impl From<&ScoreRecord> for StoredScore {
    fn from(record: &ScoreRecord) -> Self {
        StoredScore {
            user_id: record.user_id,
            user_name: record.user_name.clone(),
            score: record.score,
            date: record.date,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RecordsFile {
    records: HashMap<String, StoredScore>,
}

#[derive(Debug, Clone)]
pub struct LocalScoreStore {
    base_dir: PathBuf,
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

impl LocalScoreStore {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        LocalScoreStore {
            base_dir: base_dir.into(),
        }
    }

    fn file_path(&self) -> PathBuf {
        self.base_dir.join("scores").join("records.json")
    }

    fn load(&self) -> RecordsFile {
        let path = self.file_path();
        if let Ok(mut f) = fs::OpenOptions::new().read(true).open(&path) {
            let _ = f.lock_shared();
            let mut s = String::new();
            if let Err(e) = f.read_to_string(&mut s) {
                log::warn!("score store: failed reading {:?}: {}", path, e);
                return RecordsFile::default();
            }
            let _ = f.unlock();
            serde_json::from_str(s.trim_start_matches('\0')).unwrap_or_default()
        } else {
            RecordsFile::default()
        }
    }

    fn save(&self, table: &RecordsFile) {
        let dir = self.base_dir.join("scores");
        if let Err(e) = ensure_dir(&dir) {
            log::warn!("score store: unable to ensure dir {:?}: {}", dir, e);
            return;
        }
        match serde_json::to_string_pretty(table) {
            Ok(data) => {
                if let Ok(mut f) = fs::OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(self.file_path())
                {
                    if f.lock_exclusive().is_ok() {
                        let _ = f.write_all(data.as_bytes());
                        let _ = f.flush();
                        let _ = f.sync_all();
                        let _ = f.unlock();
                    }
                }
            }
            Err(e) => log::warn!("score store: serialize error: {}", e),
        }
    }

    /// Upsert a finished session's record, keeping the higher score per
    /// player. An equal score keeps the existing record, so replays do not
    /// churn the stored date; the display name is refreshed either way.
    pub fn upsert(&self, record: &ScoreRecord) {
        let mut table = self.load();
        let key = record.user_id.to_string();
        match table.records.get_mut(&key) {
            Some(existing) if existing.score >= record.score => {
                existing.user_name = record.user_name.clone();
            }
            Some(existing) => *existing = StoredScore::from(record),
            None => {
                table.records.insert(key, StoredScore::from(record));
            }
        }
        enforce_cap(&mut table);
        self.save(&table);
    }

    /// All stored records, sorted descending by score (older record wins a
    /// tie). This is the degraded-mode leaderboard.
    pub fn best_scores(&self) -> Vec<StoredScore> {
        let table = self.load();
        let mut all: Vec<StoredScore> = table.records.into_values().collect();
        sort_descending(&mut all);
        all
    }

    /// The stored best record for one player, if any.
    pub fn best_for(&self, user_id: i64) -> Option<StoredScore> {
        self.load().records.remove(&user_id.to_string())
    }
}

fn sort_descending(records: &mut [StoredScore]) {
    records.sort_by(|a, b| b.score.cmp(&a.score).then(a.date.cmp(&b.date)));
}

fn enforce_cap(table: &mut RecordsFile) {
    if table.records.len() <= MAX_RECORDS {
        return;
    }
    let mut all: Vec<StoredScore> = table.records.drain().map(|(_, v)| v).collect();
    sort_descending(&mut all);
    all.truncate(MAX_RECORDS);
    table.records = all
        .into_iter()
        .map(|r| (r.user_id.to_string(), r))
        .collect();
}
