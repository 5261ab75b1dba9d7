//! Bounded read view over a lead's conversation journal.
//!
//! Pure projection: the newest entries of the full log, newest first, as a
//! cloned snapshot. Never mutates or discards entries from the store.

use crate::store::{ConversationEntry, LeadRuntime};
use serde::Serialize;

/// A windowed, newest-first snapshot of a conversation journal.
#[derive(Debug, Clone, Serialize)]
pub struct JournalView {
    /// The most recent entries, newest first.
    pub entries: Vec<ConversationEntry>,
    /// Total entries in the underlying log (may exceed `entries.len()`).
    pub total: usize,
}

/// Project the newest `window` entries of a runtime's conversation,
/// newest first.
pub fn view(runtime: &LeadRuntime, window: usize) -> JournalView {
    let total = runtime.conversation.len();
    let start = total.saturating_sub(window);
    let mut entries: Vec<ConversationEntry> = runtime.conversation[start..].to_vec();
    entries.reverse();
    JournalView { entries, total }
}
