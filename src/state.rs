//! Core aggregate: catalog + runtime store + session, plus the user-action
//! surface.
//!
//! `CoreState` is the explicit context object every action flows through;
//! there is no ambient shared state. Each action method applies the
//! mutation synchronously and returns the [`SessionEvent`]s it produced
//! (an empty vec for suppressed no-ops). The async engine layers timers on
//! top; nothing in this module blocks.

use crate::catalog::{self, Catalog, Lead, LeadStatus};
use crate::config::CoreConfig;
use crate::error::{CallError, Result};
use crate::journal::{self, JournalView};
use crate::script::{self, AdvanceOutcome};
use crate::session::{CallState, Session};
use crate::store::{ConversationEntry, LeadRuntime, RuntimeStore, Speaker};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Next-action label written to a lead when its wrap-up completes.
const WRAP_NEXT_ACTION: &str = "Call completed";

/// Triggers the outer surface (UI, CLI, host bridge) may send into the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    /// Focus a different lead. Forces the session to idle first if a call
    /// is underway.
    SelectLead {
        /// Target lead id.
        id: String,
    },
    /// Start dialing the selected lead.
    StartCall,
    /// Put a live call on hold for wrap-up.
    PauseCall,
    /// Reset the session to idle (valid from wrap-up or idle) and re-seed
    /// the selected lead's runtime, preserving its notes.
    ResetSession,
    /// Toggle the auto-advance ticker.
    ToggleAutoAdvance,
    /// Manually consume the current script step.
    AdvanceScript,
    /// Flip a follow-up task's done flag.
    ToggleTask {
        /// Task id (`obj-N` / `prep-N`).
        task_id: String,
    },
    /// Replace the selected lead's notes.
    SetNotes {
        /// New notes text.
        text: String,
    },
    /// Replace the selected lead's wrap-up summary.
    SetWrapSummary {
        /// New summary text.
        text: String,
    },
    /// Append a manual journal entry. Blank text is rejected.
    SubmitJournalEntry {
        /// Who spoke.
        speaker: Speaker,
        /// What was said.
        text: String,
    },
    /// Finish the wrap-up: marks the lead completed. Rejected while the
    /// summary is blank.
    CompleteWrapUp,
    /// Vocalize the current script step's prompt.
    VoiceCue,
}

/// Observable state changes, emitted for hosts to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The call lifecycle state changed.
    StateChanged {
        /// New state.
        state: CallState,
    },
    /// A different lead is now focused.
    SelectionChanged {
        /// Newly selected lead id.
        lead_id: String,
    },
    /// Entries were appended to a lead's journal.
    JournalAppended {
        /// Owning lead.
        lead_id: String,
    },
    /// A lead's runtime changed outside the journal (tasks, notes,
    /// wrap summary, or a reset).
    RuntimeChanged {
        /// Owning lead.
        lead_id: String,
    },
    /// A lead's catalog record was marked completed.
    LeadCompleted {
        /// Completed lead.
        lead_id: String,
    },
    /// The derived elapsed display ticked.
    ElapsedSeconds {
        /// Whole seconds since the call went live.
        secs: u64,
    },
    /// The auto-advance flag flipped.
    AutoAdvanceChanged {
        /// New flag value.
        enabled: bool,
    },
    /// The announcement busy flag flipped.
    SpeakingChanged {
        /// New flag value.
        speaking: bool,
    },
}

/// Point-in-time copy of the focused lead's state, for host rendering.
#[derive(Debug, Clone, Serialize)]
pub struct CoreSnapshot {
    /// The session.
    pub session: Session,
    /// The focused catalog lead.
    pub lead: Lead,
    /// The focused lead's runtime record.
    pub runtime: LeadRuntime,
    /// Windowed journal view.
    pub journal: JournalView,
    /// Display-only blended confidence percentage.
    pub confidence: u8,
}

/// The core aggregate all actions flow through.
#[derive(Debug)]
pub struct CoreState {
    /// Lead catalog. Read-only except for wrap-up completion.
    pub catalog: Catalog,
    /// Per-lead runtime records.
    pub store: RuntimeStore,
    /// The singular session.
    pub session: Session,
    /// Engine configuration.
    pub config: CoreConfig,
}

impl CoreState {
    /// Build the core around a catalog, focusing its first lead.
    pub fn new(catalog: Catalog, config: CoreConfig) -> Result<Self> {
        let first = catalog
            .first()
            .ok_or_else(|| CallError::Catalog("catalog has no leads".into()))?
            .clone();
        let mut store = RuntimeStore::new();
        store.get_or_create(&first, Utc::now());
        Ok(Self {
            catalog,
            store,
            session: Session::new(first.id),
            config,
        })
    }

    fn reply_offset(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.config.timing.reply_offset_ms).unwrap_or(250))
    }

    fn append_system(&mut self, lead_id: &str, text: String, now: DateTime<Utc>) {
        self.store
            .append_conversation(lead_id, vec![ConversationEntry::new(Speaker::System, text, now)]);
    }

    /// Focus a different lead. No-op when the id is unknown or already
    /// focused. A call in progress is forcibly reset first; the previous
    /// lead's runtime record is preserved untouched.
    pub fn select_lead(&mut self, id: &str, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if id == self.session.selected {
            return Vec::new();
        }
        let Some(lead) = self.catalog.get(id).cloned() else {
            debug!(lead_id = id, "select of unknown lead ignored");
            return Vec::new();
        };

        let mut events = Vec::new();
        if self.session.state != CallState::Idle {
            self.session.reset_call();
            events.push(SessionEvent::StateChanged {
                state: CallState::Idle,
            });
        }
        self.session.selected = lead.id.clone();
        self.store.get_or_create(&lead, now);
        info!(lead_id = %lead.id, "lead selected");
        events.push(SessionEvent::SelectionChanged { lead_id: lead.id });
        events
    }

    /// Start dialing. No-op unless the session is idle.
    pub fn start_call(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if !self.session.begin_dialing() {
            return Vec::new();
        }
        let lead_id = self.session.selected.clone();
        let name = self
            .catalog
            .get(&lead_id)
            .map_or_else(|| lead_id.clone(), |l| l.name.clone());
        self.append_system(&lead_id, format!("Dialing {name}..."), now);
        info!(lead_id = %lead_id, "dialing");
        vec![
            SessionEvent::StateChanged {
                state: CallState::Dialing,
            },
            SessionEvent::JournalAppended { lead_id },
        ]
    }

    /// Settle-timer callback: take a dialing call live. No-op from any
    /// other state (the timer may have been outrun by a reset).
    pub fn dial_settled(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if !self.session.connect(now) {
            return Vec::new();
        }
        let lead_id = self.session.selected.clone();
        self.append_system(&lead_id, "Connected. Call in progress.".into(), now);
        info!(lead_id = %lead_id, "call connected");
        vec![
            SessionEvent::StateChanged {
                state: CallState::Active,
            },
            SessionEvent::JournalAppended { lead_id },
            SessionEvent::ElapsedSeconds { secs: 0 },
        ]
    }

    /// Put a live call on hold for wrap-up. No-op unless active.
    pub fn pause_call(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if !self.session.hold() {
            return Vec::new();
        }
        let lead_id = self.session.selected.clone();
        self.append_system(&lead_id, "Call on hold for wrap-up.".into(), now);
        vec![
            SessionEvent::StateChanged {
                state: CallState::WrapUp,
            },
            SessionEvent::JournalAppended { lead_id },
        ]
    }

    /// Reset the session and re-seed the focused runtime (notes kept).
    /// Available from wrap-up or idle only; suppressed mid-call.
    pub fn reset_session(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if !matches!(self.session.state, CallState::WrapUp | CallState::Idle) {
            debug!(state = ?self.session.state, "reset suppressed mid-call");
            return Vec::new();
        }
        let lead_id = self.session.selected.clone();
        self.session.reset_call();
        if let Some(lead) = self.catalog.get(&lead_id).cloned() {
            self.store.reset(&lead, now);
        }
        vec![
            SessionEvent::StateChanged {
                state: CallState::Idle,
            },
            SessionEvent::RuntimeChanged { lead_id },
        ]
    }

    /// Toggle the auto-advance ticker.
    pub fn toggle_auto_advance(&mut self) -> Vec<SessionEvent> {
        self.session.auto_advance = !self.session.auto_advance;
        vec![SessionEvent::AutoAdvanceChanged {
            enabled: self.session.auto_advance,
        }]
    }

    /// Consume the current script step for the focused lead. `auto` marks
    /// timer-driven invocations; it changes nothing observable.
    pub fn advance_script(&mut self, auto: bool, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let lead_id = self.session.selected.clone();
        let Some(lead) = self.catalog.get(&lead_id).cloned() else {
            return Vec::new();
        };
        let offset = self.reply_offset();
        let runtime = self.store.get_or_create(&lead, now);
        match script::advance(&lead, runtime, auto, now, offset) {
            AdvanceOutcome::Appended { .. } => {
                vec![SessionEvent::JournalAppended { lead_id }]
            }
            AdvanceOutcome::AtEnd => Vec::new(),
        }
    }

    /// Flip a follow-up task's done flag. No-op for unknown ids.
    pub fn toggle_task(&mut self, task_id: &str) -> Vec<SessionEvent> {
        let lead_id = self.session.selected.clone();
        if self.store.toggle_task(&lead_id, task_id) {
            vec![SessionEvent::RuntimeChanged { lead_id }]
        } else {
            Vec::new()
        }
    }

    /// Replace the focused lead's notes.
    pub fn set_notes(&mut self, text: String) -> Vec<SessionEvent> {
        let lead_id = self.session.selected.clone();
        if self.store.set_notes(&lead_id, text) {
            vec![SessionEvent::RuntimeChanged { lead_id }]
        } else {
            Vec::new()
        }
    }

    /// Replace the focused lead's wrap-up summary.
    pub fn set_wrap_summary(&mut self, text: String) -> Vec<SessionEvent> {
        let lead_id = self.session.selected.clone();
        if self.store.set_wrap_summary(&lead_id, text) {
            vec![SessionEvent::RuntimeChanged { lead_id }]
        } else {
            Vec::new()
        }
    }

    /// Append a manual journal entry. Blank text is rejected.
    pub fn submit_journal_entry(
        &mut self,
        speaker: Speaker,
        text: &str,
        now: DateTime<Utc>,
    ) -> Vec<SessionEvent> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("blank journal entry rejected");
            return Vec::new();
        }
        let lead_id = self.session.selected.clone();
        if self.store.append_conversation(
            &lead_id,
            vec![ConversationEntry::new(speaker, trimmed, now)],
        ) {
            vec![SessionEvent::JournalAppended { lead_id }]
        } else {
            Vec::new()
        }
    }

    /// Complete the wrap-up: marks the lead's catalog record completed,
    /// appends one confirmation entry, and returns the session to idle.
    /// Rejected while the summary trims to empty.
    pub fn complete_wrap_up(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let lead_id = self.session.selected.clone();
        let summary_blank = self
            .store
            .get(&lead_id)
            .is_none_or(|rt| rt.wrap_summary.trim().is_empty());
        if summary_blank {
            debug!(lead_id = %lead_id, "wrap-up completion rejected: blank summary");
            return Vec::new();
        }

        let name = match self.catalog.get_mut(&lead_id) {
            Some(lead) => {
                lead.status = LeadStatus::Completed;
                lead.next_action = WRAP_NEXT_ACTION.into();
                lead.name.clone()
            }
            None => return Vec::new(),
        };
        self.append_system(
            &lead_id,
            format!("Wrap-up saved. {name} marked completed."),
            now,
        );
        self.session.reset_call();
        info!(lead_id = %lead_id, "wrap-up completed");
        vec![
            SessionEvent::LeadCompleted {
                lead_id: lead_id.clone(),
            },
            SessionEvent::JournalAppended { lead_id },
            SessionEvent::StateChanged {
                state: CallState::Idle,
            },
        ]
    }

    /// Text for the voice cue of the current script step, if any remains.
    pub fn current_step_cue(&self) -> Option<String> {
        let lead = self.catalog.get(&self.session.selected)?;
        let cursor = self.store.get(&lead.id).map_or(0, |rt| rt.script_cursor);
        lead.script.get(cursor).map(|step| step.prompt.clone())
    }

    /// Elapsed-ticker callback: recompute the derived display value.
    /// No-op while not active.
    pub fn recompute_elapsed(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        if self.session.state != CallState::Active {
            return Vec::new();
        }
        let secs = self.session.recompute_elapsed(now);
        vec![SessionEvent::ElapsedSeconds { secs }]
    }

    /// Mirror the announcer's busy flag into the session.
    pub fn set_speaking(&mut self, speaking: bool) -> Vec<SessionEvent> {
        if self.session.speaking == speaking {
            return Vec::new();
        }
        self.session.speaking = speaking;
        vec![SessionEvent::SpeakingChanged { speaking }]
    }

    /// Snapshot the focused lead's state for rendering.
    pub fn snapshot(&self) -> CoreSnapshot {
        let lead = self
            .catalog
            .get(&self.session.selected)
            .cloned()
            .unwrap_or_else(|| {
                // The selected id always comes from the catalog; an empty
                // shell only appears if a host builds state by hand.
                Lead {
                    id: self.session.selected.clone(),
                    name: String::new(),
                    company: String::new(),
                    title: String::new(),
                    phone: String::new(),
                    email: String::new(),
                    tags: Vec::new(),
                    confidence: 0,
                    status: LeadStatus::New,
                    next_action: String::new(),
                    objectives: Vec::new(),
                    prep_notes: Vec::new(),
                    notes: String::new(),
                    script: Vec::new(),
                }
            });
        let runtime = self
            .store
            .get(&lead.id)
            .cloned()
            .unwrap_or_else(|| LeadRuntime::seeded(&lead, Utc::now()));
        let journal = journal::view(&runtime, self.config.journal.window);
        let confidence = catalog::live_confidence(&lead, runtime.script_cursor);
        CoreSnapshot {
            session: self.session.clone(),
            lead,
            runtime,
            journal,
            confidence,
        }
    }

    /// Apply a user action, returning the events it produced.
    ///
    /// [`UserAction::VoiceCue`] is handled by the engine (it owns the
    /// announcer) and produces no events here.
    pub fn apply(&mut self, action: UserAction, now: DateTime<Utc>) -> Vec<SessionEvent> {
        match action {
            UserAction::SelectLead { id } => self.select_lead(&id, now),
            UserAction::StartCall => self.start_call(now),
            UserAction::PauseCall => self.pause_call(now),
            UserAction::ResetSession => self.reset_session(now),
            UserAction::ToggleAutoAdvance => self.toggle_auto_advance(),
            UserAction::AdvanceScript => self.advance_script(false, now),
            UserAction::ToggleTask { task_id } => self.toggle_task(&task_id),
            UserAction::SetNotes { text } => self.set_notes(text),
            UserAction::SetWrapSummary { text } => self.set_wrap_summary(text),
            UserAction::SubmitJournalEntry { speaker, text } => {
                self.submit_journal_entry(speaker, &text, now)
            }
            UserAction::CompleteWrapUp => self.complete_wrap_up(now),
            UserAction::VoiceCue => Vec::new(),
        }
    }
}
