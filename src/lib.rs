//! Calldeck: a scripted outbound-call session engine.
//!
//! Models one calling agent working a lead roster: a call lifecycle state
//! machine (idle, dialing, active, wrap-up), per-lead runtime records
//! (conversation journal, follow-up tasks, notes, wrap-up summary, script
//! cursor), and a script driver that consumes ordered talking points either
//! manually or on a timer.
//!
//! # Architecture
//!
//! The core is synchronous and single-writer: every user action flows
//! through one [`state::CoreState`] context object and either mutates it or
//! is suppressed as a defined no-op. The async [`engine::CallEngine`] wraps
//! the core in a single `tokio::select!` loop and owns the three
//! condition-scoped timers:
//! - **dial settle** (one-shot): takes a dialing call live;
//! - **elapsed ticker**: recomputes the derived call-duration display;
//! - **auto-advance ticker**: pushes script steps into the journal.
//!
//! Voice cues go through the fire-and-forget [`announce::Announcer`]; in
//! environments without a speech capability they are silent no-ops.

pub mod announce;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod journal;
pub mod script;
pub mod session;
pub mod state;
pub mod store;

pub use announce::{AnnouncementVoice, Announcer, NullVoice};
pub use catalog::{Catalog, Lead, LeadStatus, ScriptStep};
pub use config::CoreConfig;
pub use engine::{CallEngine, EngineHandle};
pub use error::{CallError, Result};
pub use session::{CallState, Session};
pub use state::{CoreSnapshot, CoreState, SessionEvent, UserAction};
pub use store::{ConversationEntry, FollowUpTask, LeadRuntime, RuntimeStore, Speaker};
