//! # Clickrush - timed click-collection minigame engine
//!
//! Clickrush implements the non-visual core of a casual click-collection
//! minigame served inside a chat-app web view: a timer-driven session state
//! machine, a weighted random item generator, a score submission client with
//! a local fallback store, a leaderboard fetcher, and a small stateless HTTP
//! relay that forwards browser requests to a fixed backend origin.
//!
//! ## Features
//!
//! - **Session State Machine**: Explicit `Idle -> Active -> Ended` phases with
//!   guarded transitions, a bounded active-item set, and a score floored at zero.
//! - **Async Driver**: One tokio task owns each session; the spawn process, the
//!   countdown process, and per-item expiry timers are cancellable handles that
//!   message the driver loop, so every mutation is serialized.
//! - **Scoring Protocol**: `POST /api/save_score` and `GET /api/leaderboard`
//!   wire contracts with strict serde decoding; any remote failure degrades to
//!   a local best-score-per-player table instead of surfacing an error.
//! - **Relay Forwarder**: Stateless ntex server that strips a routing prefix
//!   and mirrors the backend's status and JSON body, with permissive CORS.
//! - **Async Design**: Built with Tokio; no operation blocks the event loop.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use clickrush::config::Config;
//! use clickrush::game::start_session;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let (handle, mut events) = start_session(config.game.rules(), None);
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!     drop(handle);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`game`] - Item generation, the session state machine, and the driver
//! - [`score`] - Score records, submission client, leaderboard fetcher, local store
//! - [`relay`] - HTTP relay forwarder
//! - [`config`] - Configuration management and validation
//! - [`validation`] - Input sanitization utilities
//! - [`metrics`] - Process-local counters

pub mod config;
pub mod game;
pub mod metrics;
pub mod relay;
pub mod score;
pub mod validation;
