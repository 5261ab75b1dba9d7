//! Per-lead runtime records and the keyed store that owns them.
//!
//! A [`LeadRuntime`] holds everything a call session accumulates for one
//! lead: the append-only conversation log, follow-up tasks, editable notes,
//! the wrap-up summary, and the script cursor. The [`RuntimeStore`] keys
//! records by lead id with get-or-create semantics; records are never
//! destroyed, only reset.

use crate::catalog::Lead;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Who produced a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Speaker {
    /// The calling agent.
    Agent,
    /// The lead on the other end.
    Lead,
    /// Engine-generated status line.
    System,
}

/// One line of the conversation journal. Append-only: never mutated or
/// deleted after creation; ordering is insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Entry identifier, unique within a lead's journal.
    pub id: Uuid,
    /// Who spoke.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
    /// When the entry was created.
    pub at: DateTime<Utc>,
}

impl ConversationEntry {
    /// Create an entry stamped at the given time.
    pub fn new(speaker: Speaker, text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            speaker,
            text: text.into(),
            at,
        }
    }
}

/// A follow-up item on the call checklist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpTask {
    /// Positional id (`obj-N` / `prep-N`), stable across runtime resets.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Whether the item is ticked off.
    pub done: bool,
}

/// Mutable per-lead session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRuntime {
    /// Append-only conversation log.
    pub conversation: Vec<ConversationEntry>,
    /// Free-text research notes. Survives runtime resets.
    pub notes: String,
    /// Wrap-up summary text; empty until composed.
    pub wrap_summary: String,
    /// Follow-up checklist.
    pub tasks: Vec<FollowUpTask>,
    /// Index of the next unconsumed script step.
    /// Invariant: `0 <= script_cursor <= lead.script.len()`.
    pub script_cursor: usize,
}

impl LeadRuntime {
    /// Build a fresh runtime seeded from a catalog lead: one system entry
    /// announcing readiness, notes copied from the lead's research notes,
    /// tasks from objectives (not done) then prep items (done).
    pub fn seeded(lead: &Lead, now: DateTime<Utc>) -> Self {
        Self {
            conversation: vec![ConversationEntry::new(
                Speaker::System,
                format!("Call desk ready for {}.", lead.name),
                now,
            )],
            notes: lead.notes.clone(),
            wrap_summary: String::new(),
            tasks: seed_tasks(lead),
            script_cursor: 0,
        }
    }
}

fn seed_tasks(lead: &Lead) -> Vec<FollowUpTask> {
    let objectives = lead.objectives.iter().enumerate().map(|(i, label)| FollowUpTask {
        id: format!("obj-{}", i + 1),
        label: label.clone(),
        done: false,
    });
    let prep = lead.prep_notes.iter().enumerate().map(|(i, label)| FollowUpTask {
        id: format!("prep-{}", i + 1),
        label: label.clone(),
        done: true,
    });
    objectives.chain(prep).collect()
}

/// Keyed store of per-lead runtime records. Single writer; reads hand out
/// snapshots or shared references, never interior mutability.
#[derive(Debug, Default)]
pub struct RuntimeStore {
    records: HashMap<String, LeadRuntime>,
}

impl RuntimeStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a lead's runtime, seeding it on first access.
    pub fn get_or_create(&mut self, lead: &Lead, now: DateTime<Utc>) -> &mut LeadRuntime {
        self.records
            .entry(lead.id.clone())
            .or_insert_with(|| LeadRuntime::seeded(lead, now))
    }

    /// Fetch an existing runtime.
    pub fn get(&self, lead_id: &str) -> Option<&LeadRuntime> {
        self.records.get(lead_id)
    }

    /// Mutable fetch of an existing runtime.
    pub fn get_mut(&mut self, lead_id: &str) -> Option<&mut LeadRuntime> {
        self.records.get_mut(lead_id)
    }

    /// Append entries to a lead's conversation, preserving order. Never
    /// reorders or trims; the bounded journal view is a read-time concern.
    /// No-op if the lead has no runtime yet.
    pub fn append_conversation(&mut self, lead_id: &str, entries: Vec<ConversationEntry>) -> bool {
        match self.records.get_mut(lead_id) {
            Some(rt) => {
                rt.conversation.extend(entries);
                true
            }
            None => {
                tracing::debug!(lead_id, "append to unknown runtime ignored");
                false
            }
        }
    }

    /// Flip the done flag of exactly the matching task. No-op if either the
    /// lead or the task id is unknown.
    pub fn toggle_task(&mut self, lead_id: &str, task_id: &str) -> bool {
        let Some(rt) = self.records.get_mut(lead_id) else {
            return false;
        };
        match rt.tasks.iter_mut().find(|t| t.id == task_id) {
            Some(task) => {
                task.done = !task.done;
                true
            }
            None => {
                tracing::debug!(lead_id, task_id, "toggle of unknown task ignored");
                false
            }
        }
    }

    /// Replace a lead's free-text notes.
    pub fn set_notes(&mut self, lead_id: &str, text: impl Into<String>) -> bool {
        match self.records.get_mut(lead_id) {
            Some(rt) => {
                rt.notes = text.into();
                true
            }
            None => false,
        }
    }

    /// Replace a lead's wrap-up summary.
    pub fn set_wrap_summary(&mut self, lead_id: &str, text: impl Into<String>) -> bool {
        match self.records.get_mut(lead_id) {
            Some(rt) => {
                rt.wrap_summary = text.into();
                true
            }
            None => false,
        }
    }

    /// Re-seed a lead's runtime: fresh conversation and tasks, empty wrap
    /// summary, cursor 0. Notes are carried over; they are durable research,
    /// not call-session ephemera.
    pub fn reset(&mut self, lead: &Lead, now: DateTime<Utc>) {
        let notes = self
            .records
            .get(&lead.id)
            .map(|rt| rt.notes.clone())
            .unwrap_or_else(|| lead.notes.clone());
        let mut fresh = LeadRuntime::seeded(lead, now);
        fresh.notes = notes;
        self.records.insert(lead.id.clone(), fresh);
    }
}
