//! # Session State Machine
//!
//! The synchronous core of one timed play-through. A session moves through
//! `Idle -> Active -> Ended` and may be restarted from either end state;
//! every restart fully resets score, countdown, and the active-item set.
//!
//! All methods are guarded by the current phase: calls that arrive in the
//! wrong phase (a click racing the end of the session, a second `end`)
//! are silent no-ops rather than errors, because they occur naturally when
//! timers race user input.
//!
//! The async shell in [`super::driver`] owns the timers; this type never
//! blocks and never talks to the clock beyond stamping spawn times.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::items::{self, Item};

/// Tunable rules for one play-through.
#[derive(Debug, Clone)]
pub struct SessionRules {
    /// Session length in countdown ticks.
    pub duration_secs: u32,
    /// Cadence of one countdown tick in milliseconds. One second in
    /// production; tests shrink it.
    pub countdown_tick_ms: u64,
    /// Upper bound on simultaneously active items.
    pub max_active_items: usize,
    /// Jitter window for the delay between spawn waves.
    pub spawn_delay_ms: (u64, u64),
    /// Jitter window for an item's lifetime before it expires.
    pub item_lifetime_ms: (u64, u64),
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            duration_secs: 45,
            countdown_tick_ms: 1_000,
            max_active_items: 15,
            spawn_delay_ms: (300, 800),
            item_lifetime_ms: (2_000, 4_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Active,
    Ended,
}

/// A spawned, clickable, not-yet-resolved item instance. The matching
/// expiry timer handle lives in the driver, keyed by `id`.
#[derive(Debug, Clone)]
pub struct ActiveItem {
    pub id: Uuid,
    pub item: Item,
    pub spawned_at: DateTime<Utc>,
}

/// Verdict band for a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultTier {
    Scoreless,
    Beginner,
    Solid,
    Excellent,
    Incredible,
    Legendary,
}

impl ResultTier {
    pub fn for_score(score: u32) -> Self {
        match score {
            0 => ResultTier::Scoreless,
            1..=9 => ResultTier::Beginner,
            10..=19 => ResultTier::Solid,
            20..=29 => ResultTier::Excellent,
            30..=39 => ResultTier::Incredible,
            _ => ResultTier::Legendary,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ResultTier::Scoreless => "🤔 Try again!",
            ResultTier::Beginner => "💪 Not bad for a start!",
            ResultTier::Solid => "👍 Good result!",
            ResultTier::Excellent => "🔥 Great game!",
            ResultTier::Incredible => "⭐ Incredible!",
            ResultTier::Legendary => "🏆 You're a legend!",
        }
    }
}

/// End-of-session summary handed to the UI and the submission client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub final_score: u32,
    pub tier: ResultTier,
}

/// Result of a resolved click.
#[derive(Debug, Clone)]
pub struct ClickOutcome {
    pub delta: i32,
    pub score: u32,
    pub item: Item,
}

/// Result of one countdown tick.
#[derive(Debug, Clone, Copy)]
pub struct TickOutcome {
    pub remaining: u32,
    /// The countdown reached zero; the caller must end the session.
    pub finished: bool,
}

#[derive(Debug)]
pub struct Session {
    rules: SessionRules,
    phase: SessionPhase,
    score: u32,
    time_remaining: u32,
    active: HashMap<Uuid, ActiveItem>,
    generation: u64,
}

impl Session {
    pub fn new(rules: SessionRules) -> Self {
        Session {
            rules,
            phase: SessionPhase::Idle,
            score: 0,
            time_remaining: 0,
            active: HashMap::new(),
            generation: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Monotonic counter bumped on every `start`. Timer events carry the
    /// generation they were armed under; a mismatch marks them stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn rules(&self) -> &SessionRules {
        &self.rules
    }

    /// Begin a play-through. Valid from `Idle` or `Ended`; calling while
    /// `Active` is a no-op and returns false. Resets every field, so no
    /// state carries over between sessions.
    pub fn start(&mut self) -> bool {
        if self.phase == SessionPhase::Active {
            return false;
        }
        self.phase = SessionPhase::Active;
        self.score = 0;
        self.time_remaining = self.rules.duration_secs;
        self.active.clear();
        self.generation += 1;
        true
    }

    /// One step of the countdown process.
    pub fn countdown_tick(&mut self) -> Option<TickOutcome> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        Some(TickOutcome {
            remaining: self.time_remaining,
            finished: self.time_remaining == 0,
        })
    }

    /// One step of the spawn process: generate 1 to 3 new items, never
    /// exceeding the active-item cap. Returns the spawned instances so the
    /// caller can arm expiry timers and notify the UI.
    pub fn spawn_wave(&mut self, rng: &mut impl Rng) -> Vec<ActiveItem> {
        if self.phase != SessionPhase::Active {
            return Vec::new();
        }
        let want = rng.gen_range(1..=3usize);
        let mut spawned = Vec::with_capacity(want);
        for _ in 0..want {
            if self.active.len() >= self.rules.max_active_items {
                break;
            }
            let entry = ActiveItem {
                id: Uuid::new_v4(),
                item: items::generate(rng),
                spawned_at: Utc::now(),
            };
            self.active.insert(entry.id, entry.clone());
            spawned.push(entry);
        }
        spawned
    }

    /// Resolve a click on an active item. Returns `None` when the item is
    /// unknown (already expired or already clicked) or the session is not
    /// active. The score is floored at zero on every update.
    pub fn resolve_click(&mut self, id: Uuid) -> Option<ClickOutcome> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        let entry = self.active.remove(&id)?;
        let delta = entry.item.points;
        let next = i64::from(self.score) + i64::from(delta);
        self.score = next.clamp(0, i64::from(u32::MAX)) as u32;
        Some(ClickOutcome {
            delta,
            score: self.score,
            item: entry.item,
        })
    }

    /// Resolve an expiry timer firing. No score effect. Returns whether the
    /// item was still present.
    pub fn resolve_expiry(&mut self, id: Uuid) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        self.active.remove(&id).is_some()
    }

    /// End the session. Valid only while `Active`; the second call in a row
    /// is a no-op returning `None`. Drains the remaining items and returns
    /// their ids so the caller can cancel the matching expiry timers.
    pub fn end(&mut self) -> Option<(SessionSummary, Vec<Uuid>)> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        self.phase = SessionPhase::Ended;
        self.time_remaining = 0;
        let leftover: Vec<Uuid> = self.active.keys().copied().collect();
        self.active.clear();
        let summary = SessionSummary {
            final_score: self.score,
            tier: ResultTier::for_score(self.score),
        };
        Some((summary, leftover))
    }
}
