//! Async shell around the session state machine.
//!
//! [`start_session`] spawns one driver task that exclusively owns a
//! [`Session`]. Three kinds of timers feed it over an internal channel:
//! the countdown process (fixed cadence), the spawn process (re-armed with
//! a fresh jittered delay after every wave), and one expiry timer per
//! spawned item. Click and abort commands arrive over a second channel from
//! [`SessionHandle`]. Because the driver loop is the only place the session
//! mutates, click resolution is atomic with respect to every other game
//! event.
//!
//! Ending a session aborts the two repeating process handles and every
//! outstanding expiry handle. A timer message already in flight is dropped
//! by the guards (session generation, phase, item lookup); correctness
//! never relies on an aborted timer not firing.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use rand::Rng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::metrics;
use crate::score::{ScoreClient, ScoreRecord};

use super::items::Item;
use super::session::{Session, SessionPhase, SessionRules, SessionSummary};

/// Why an item left the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Clicked,
    Expired,
    SessionOver,
}

/// Events emitted to the UI collaborator. The driver never renders;
/// positioning, audio, and haptics belong entirely to the consumer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started { duration_secs: u32 },
    Countdown { remaining: u32 },
    ItemSpawned { id: Uuid, item: Item },
    ScoreChanged { score: u32, delta: i32 },
    ItemRemoved { id: Uuid, reason: RemovalReason },
    Ended { summary: SessionSummary },
}

/// Point-in-time view of a running session.
#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot {
    pub score: u32,
    pub time_remaining: u32,
    pub active_items: usize,
}

/// Identity and client used to submit the final score when the session ends.
#[derive(Clone)]
pub struct SubmitContext {
    pub client: Arc<ScoreClient>,
    pub user_id: i64,
    pub user_name: String,
}

enum Command {
    Click(Uuid),
    Abort,
    Snapshot(oneshot::Sender<SessionSnapshot>),
}

enum TimerMsg {
    CountdownTick { generation: u64 },
    SpawnTick { generation: u64 },
    Expired { id: Uuid, generation: u64 },
}

/// Cloneable handle to a running session driver. All methods are safe to
/// call after the session ended; late commands are silently dropped.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Command>,
    done: watch::Receiver<Option<SessionSummary>>,
}

impl SessionHandle {
    /// Resolve a click on an active item. A click on an item that already
    /// expired, was already clicked, or belongs to a finished session is a
    /// no-op.
    pub fn click(&self, id: Uuid) {
        let _ = self.tx.send(Command::Click(id));
    }

    /// End the session early. Performs the same cleanup and submission as a
    /// natural countdown end; repeated calls are no-ops.
    pub fn abort(&self) {
        let _ = self.tx.send(Command::Abort);
    }

    /// Current score, countdown, and active-item count, or `None` once the
    /// driver exited.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        let (tx, rx) = oneshot::channel();
        if self.tx.send(Command::Snapshot(tx)).is_ok() {
            rx.await.ok()
        } else {
            None
        }
    }

    /// Wait for the session to end and return its summary. Also waits out
    /// the fire-and-forget score submission, so callers that exit right
    /// after this will not cut it short. Returns `None` only if the driver
    /// died without completing the session.
    pub async fn finished(&self) -> Option<SessionSummary> {
        let mut rx = self.done.clone();
        loop {
            let current = rx.borrow().clone();
            if current.is_some() {
                return current;
            }
            if rx.changed().await.is_err() {
                return rx.borrow().clone();
            }
        }
    }
}

struct Driver {
    session: Session,
    events: mpsc::UnboundedSender<SessionEvent>,
    timer_tx: mpsc::UnboundedSender<TimerMsg>,
    expiry: HashMap<Uuid, JoinHandle<()>>,
    countdown: Option<JoinHandle<()>>,
    spawner: Option<JoinHandle<()>>,
    submit: Option<SubmitContext>,
    submission: Option<JoinHandle<()>>,
}

impl Driver {
    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            // No listener is not fatal; the session runs to completion.
            debug!("session event channel closed; continuing without a listener");
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            score: self.session.score(),
            time_remaining: self.session.time_remaining(),
            active_items: self.session.active_count(),
        }
    }

    /// Transition to `Active` and arm the two repeating processes.
    fn begin(&mut self) {
        self.session.start();
        metrics::record_session_start();
        let rules = self.session.rules().clone();
        self.emit(SessionEvent::Started {
            duration_secs: rules.duration_secs,
        });

        let generation = self.session.generation();

        let tick_tx = self.timer_tx.clone();
        let tick_ms = rules.countdown_tick_ms;
        self.countdown = Some(tokio::spawn(async move {
            loop {
                sleep(Duration::from_millis(tick_ms)).await;
                if tick_tx
                    .send(TimerMsg::CountdownTick { generation })
                    .is_err()
                {
                    break;
                }
            }
        }));

        let spawn_tx = self.timer_tx.clone();
        let window = rules.spawn_delay_ms;
        self.spawner = Some(tokio::spawn(async move {
            loop {
                sleep(Duration::from_millis(jitter_ms(window))).await;
                if spawn_tx.send(TimerMsg::SpawnTick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    fn on_spawn_tick(&mut self, generation: u64) {
        if generation != self.session.generation() {
            return;
        }
        let spawned = {
            let mut rng = rand::thread_rng();
            self.session.spawn_wave(&mut rng)
        };
        if spawned.is_empty() {
            return;
        }
        metrics::record_items_spawned(spawned.len() as u64);
        let lifetime_window = self.session.rules().item_lifetime_ms;
        for entry in spawned {
            let id = entry.id;
            let lifetime = jitter_ms(lifetime_window);
            let tx = self.timer_tx.clone();
            let handle = tokio::spawn(async move {
                sleep(Duration::from_millis(lifetime)).await;
                let _ = tx.send(TimerMsg::Expired { id, generation });
            });
            self.expiry.insert(id, handle);
            self.emit(SessionEvent::ItemSpawned {
                id,
                item: entry.item,
            });
        }
    }

    fn on_countdown_tick(&mut self, generation: u64) -> Option<SessionSummary> {
        if generation != self.session.generation() {
            return None;
        }
        let tick = self.session.countdown_tick()?;
        self.emit(SessionEvent::Countdown {
            remaining: tick.remaining,
        });
        if tick.finished {
            return self.finish();
        }
        None
    }

    fn on_click(&mut self, id: Uuid) {
        match self.session.resolve_click(id) {
            Some(outcome) => {
                metrics::record_item_clicked();
                if let Some(handle) = self.expiry.remove(&id) {
                    handle.abort();
                }
                self.emit(SessionEvent::ScoreChanged {
                    score: outcome.score,
                    delta: outcome.delta,
                });
                self.emit(SessionEvent::ItemRemoved {
                    id,
                    reason: RemovalReason::Clicked,
                });
            }
            None => {
                // Ordinary race: the expiry fired or the session ended
                // between the user's tap and this command.
                debug!("click on unknown item {id}; ignoring");
            }
        }
    }

    fn on_expired(&mut self, id: Uuid, generation: u64) {
        if generation != self.session.generation() {
            return;
        }
        if self.session.resolve_expiry(id) {
            metrics::record_item_expired();
            self.expiry.remove(&id);
            self.emit(SessionEvent::ItemRemoved {
                id,
                reason: RemovalReason::Expired,
            });
        }
    }

    /// End the session: cancel both repeating processes and every expiry
    /// timer, drain leftover items, emit the summary, and hand the record
    /// to the submission client without blocking on it. Idempotent.
    fn finish(&mut self) -> Option<SessionSummary> {
        let (summary, leftover) = self.session.end()?;
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
        if let Some(handle) = self.spawner.take() {
            handle.abort();
        }
        for (_, handle) in self.expiry.drain() {
            handle.abort();
        }
        for id in leftover {
            self.emit(SessionEvent::ItemRemoved {
                id,
                reason: RemovalReason::SessionOver,
            });
        }
        metrics::record_session_end();
        self.emit(SessionEvent::Ended {
            summary: summary.clone(),
        });
        if let Some(ctx) = self.submit.take() {
            let record =
                ScoreRecord::new(ctx.user_id, ctx.user_name.clone(), summary.final_score);
            self.submission = Some(tokio::spawn(async move {
                ctx.client.submit(&record).await;
            }));
        }
        Some(summary)
    }
}

fn jitter_ms(window: (u64, u64)) -> u64 {
    let (lo, hi) = window;
    if hi <= lo {
        return lo;
    }
    rand::thread_rng().gen_range(lo..=hi)
}

/// Start one play-through. Returns a handle for commands and the event
/// stream for the UI collaborator. The session begins immediately and ends
/// when the countdown reaches zero or [`SessionHandle::abort`] is called.
pub fn start_session(
    rules: SessionRules,
    submit: Option<SubmitContext>,
) -> (SessionHandle, mpsc::UnboundedReceiver<SessionEvent>) {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (timer_tx, mut timer_rx) = mpsc::unbounded_channel::<TimerMsg>();
    let (done_tx, done_rx) = watch::channel(None);

    let mut driver = Driver {
        session: Session::new(rules),
        events: event_tx,
        timer_tx,
        expiry: HashMap::new(),
        countdown: None,
        spawner: None,
        submit,
        submission: None,
    };

    tokio::spawn(async move {
        driver.begin();
        let summary = loop {
            tokio::select! {
                Some(cmd) = cmd_rx.recv() => {
                    match cmd {
                        Command::Click(id) => driver.on_click(id),
                        Command::Abort => {
                            if let Some(summary) = driver.finish() {
                                break summary;
                            }
                        }
                        Command::Snapshot(resp) => {
                            let _ = resp.send(driver.snapshot());
                        }
                    }
                }
                Some(msg) = timer_rx.recv() => {
                    let ended = match msg {
                        TimerMsg::CountdownTick { generation } => {
                            driver.on_countdown_tick(generation)
                        }
                        TimerMsg::SpawnTick { generation } => {
                            driver.on_spawn_tick(generation);
                            None
                        }
                        TimerMsg::Expired { id, generation } => {
                            driver.on_expired(id, generation);
                            None
                        }
                    };
                    if let Some(summary) = ended {
                        break summary;
                    }
                }
            }
        };
        debug_assert_eq!(driver.session.phase(), SessionPhase::Ended);
        if let Some(task) = driver.submission.take() {
            let _ = task.await;
        }
        let _ = done_tx.send(Some(summary));
        debug!("session driver terminated");
    });

    (
        SessionHandle {
            tx: cmd_tx,
            done: done_rx,
        },
        event_rx,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_driver() -> (Driver, mpsc::UnboundedReceiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (timer_tx, _timer_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            session: Session::new(SessionRules {
                duration_secs: 2,
                max_active_items: 4,
                ..SessionRules::default()
            }),
            events: event_tx,
            timer_tx,
            expiry: HashMap::new(),
            countdown: None,
            spawner: None,
            submit: None,
            submission: None,
        };
        (driver, event_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn stale_generation_timers_are_ignored() {
        let (mut driver, mut rx) = test_driver();
        driver.begin();
        let live = driver.session.generation();
        drain(&mut rx);

        driver.on_spawn_tick(live + 1);
        assert_eq!(driver.session.active_count(), 0);
        assert!(drain(&mut rx).is_empty());

        assert!(driver.on_countdown_tick(live + 1).is_none());
        assert_eq!(driver.session.time_remaining(), 2);

        driver.on_spawn_tick(live);
        let spawned = driver.session.active_count();
        assert!(spawned >= 1);
        driver.finish().expect("finish once");
    }

    #[tokio::test]
    async fn expiry_after_finish_is_a_no_op() {
        let (mut driver, mut rx) = test_driver();
        driver.begin();
        let generation = driver.session.generation();
        driver.on_spawn_tick(generation);
        let events = drain(&mut rx);
        let id = events
            .iter()
            .find_map(|e| match e {
                SessionEvent::ItemSpawned { id, .. } => Some(*id),
                _ => None,
            })
            .expect("at least one spawn");

        driver.finish().expect("finish once");
        drain(&mut rx);

        // A stray expiry from an already-cancelled timer must change nothing.
        driver.on_expired(id, generation);
        assert!(drain(&mut rx).is_empty());
        assert!(driver.finish().is_none(), "second finish is a no-op");
    }

    #[tokio::test]
    async fn click_cancels_the_expiry_handle() {
        let (mut driver, mut rx) = test_driver();
        driver.begin();
        let generation = driver.session.generation();
        driver.on_spawn_tick(generation);
        let id = drain(&mut rx)
            .iter()
            .find_map(|e| match e {
                SessionEvent::ItemSpawned { id, .. } => Some(*id),
                _ => None,
            })
            .expect("spawned");
        assert!(driver.expiry.contains_key(&id));
        driver.on_click(id);
        assert!(!driver.expiry.contains_key(&id));
        // Second click on the same id resolves nothing.
        driver.on_click(id);
        let events = drain(&mut rx);
        let removals = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::ItemRemoved { .. }))
            .count();
        assert_eq!(removals, 1);
        driver.finish().expect("finish");
    }
}
