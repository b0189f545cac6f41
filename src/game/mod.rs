//! Game core: the item generator, the session state machine, and the async
//! driver that schedules spawn, countdown, and expiry timers around it.

pub mod driver;
pub mod items;
pub mod session;

pub use driver::{
    start_session, RemovalReason, SessionEvent, SessionHandle, SessionSnapshot, SubmitContext,
};
pub use items::{Item, ItemCategory};
pub use session::{ResultTier, SessionPhase, SessionRules, SessionSummary};
