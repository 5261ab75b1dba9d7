//! Script driver: advances a lead's script cursor and synthesizes the
//! paired agent/lead journal entries for the consumed step.

use crate::catalog::Lead;
use crate::store::{ConversationEntry, LeadRuntime, Speaker};
use chrono::{DateTime, Duration, Utc};

/// Reply used when a script step carries no customer signals.
pub const FALLBACK_REPLY: &str = "Okay, keep going.";

/// Result of one advance invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// A step was consumed; two entries were appended and the cursor now
    /// sits at the contained index.
    Appended {
        /// New cursor position.
        cursor: usize,
    },
    /// Cursor already at the end of the script; nothing changed.
    AtEnd,
}

/// Consume the script step at the current cursor.
///
/// Appends an agent entry with the step's prompt at `now`, then a lead
/// entry at `now + reply_offset` whose text is picked from the step's
/// customer signals by `cursor % signals.len()` (first signal or
/// [`FALLBACK_REPLY`] when the list is empty). The cursor increments by
/// one, clamped to the script length. A cursor already at the end is a
/// no-op.
///
/// `auto` records whether the timer or the agent triggered the advance; it
/// has no behavioral effect and is logged only.
pub fn advance(
    lead: &Lead,
    runtime: &mut LeadRuntime,
    auto: bool,
    now: DateTime<Utc>,
    reply_offset: Duration,
) -> AdvanceOutcome {
    let Some(step) = lead.script.get(runtime.script_cursor) else {
        tracing::debug!(lead_id = %lead.id, cursor = runtime.script_cursor, "script exhausted");
        return AdvanceOutcome::AtEnd;
    };

    let reply = step
        .signals
        .get(runtime.script_cursor % step.signals.len().max(1))
        .or_else(|| step.signals.first())
        .map_or(FALLBACK_REPLY, String::as_str);

    runtime.conversation.push(ConversationEntry::new(
        Speaker::Agent,
        step.prompt.clone(),
        now,
    ));
    runtime
        .conversation
        .push(ConversationEntry::new(Speaker::Lead, reply, now + reply_offset));

    runtime.script_cursor = (runtime.script_cursor + 1).min(lead.script.len());
    tracing::debug!(
        lead_id = %lead.id,
        step = %step.id,
        cursor = runtime.script_cursor,
        auto,
        "script advanced"
    );
    AdvanceOutcome::Appended {
        cursor: runtime.script_cursor,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::catalog::{Catalog, ScriptStep};

    fn offset() -> Duration {
        Duration::milliseconds(250)
    }

    fn mercer() -> Lead {
        Catalog::demo().get("lead-mercer").unwrap().clone()
    }

    #[test]
    fn three_step_script_consumes_in_pairs_then_stops() {
        let lead = mercer();
        let mut rt = LeadRuntime::seeded(&lead, Utc::now());
        let seeded = rt.conversation.len();

        for expected_cursor in 1..=3 {
            let out = advance(&lead, &mut rt, false, Utc::now(), offset());
            assert_eq!(out, AdvanceOutcome::Appended { cursor: expected_cursor });
            assert_eq!(rt.conversation.len(), seeded + expected_cursor * 2);
        }

        // Fourth call is idempotent: no entries, cursor pinned.
        assert_eq!(advance(&lead, &mut rt, false, Utc::now(), offset()), AdvanceOutcome::AtEnd);
        assert_eq!(rt.conversation.len(), seeded + 6);
        assert_eq!(rt.script_cursor, 3);
    }

    #[test]
    fn appends_agent_then_lead_with_reply_offset() {
        let lead = mercer();
        let mut rt = LeadRuntime::seeded(&lead, Utc::now());
        let now = Utc::now();
        advance(&lead, &mut rt, true, now, offset());

        let n = rt.conversation.len();
        let agent = &rt.conversation[n - 2];
        let reply = &rt.conversation[n - 1];
        assert_eq!(agent.speaker, Speaker::Agent);
        assert_eq!(agent.text, lead.script[0].prompt);
        assert_eq!(agent.at, now);
        assert_eq!(reply.speaker, Speaker::Lead);
        assert_eq!(reply.at, now + offset());
        assert!(reply.at > agent.at, "reply sorts after the prompt");
    }

    #[test]
    fn signal_choice_rotates_with_the_cursor() {
        let lead = mercer();
        let mut rt = LeadRuntime::seeded(&lead, Utc::now());

        // Step 0 has 2 signals: 0 % 2 = 0. Step 1 has 3: 1 % 3 = 1.
        advance(&lead, &mut rt, false, Utc::now(), offset());
        advance(&lead, &mut rt, false, Utc::now(), offset());
        let replies: Vec<&ConversationEntry> = rt
            .conversation
            .iter()
            .filter(|e| e.speaker == Speaker::Lead)
            .collect();
        assert_eq!(replies[0].text, lead.script[0].signals[0]);
        assert_eq!(replies[1].text, lead.script[1].signals[1]);
    }

    #[test]
    fn empty_signal_list_falls_back_to_generic_reply() {
        let mut lead = mercer();
        lead.script = vec![ScriptStep {
            id: "s1".into(),
            title: "Only step".into(),
            prompt: "Hello?".into(),
            signals: vec![],
        }];
        let mut rt = LeadRuntime::seeded(&lead, Utc::now());
        advance(&lead, &mut rt, false, Utc::now(), offset());
        let reply = rt.conversation.last().unwrap();
        assert_eq!(reply.text, FALLBACK_REPLY);
    }

    #[test]
    fn cursor_never_exceeds_script_length() {
        let lead = mercer();
        let mut rt = LeadRuntime::seeded(&lead, Utc::now());
        for _ in 0..10 {
            advance(&lead, &mut rt, true, Utc::now(), offset());
            assert!(rt.script_cursor <= lead.script.len());
        }
        assert_eq!(rt.script_cursor, lead.script.len());
    }

    #[test]
    fn empty_script_is_always_at_end() {
        let mut lead = mercer();
        lead.script.clear();
        let mut rt = LeadRuntime::seeded(&lead, Utc::now());
        assert_eq!(advance(&lead, &mut rt, false, Utc::now(), offset()), AdvanceOutcome::AtEnd);
        assert_eq!(rt.script_cursor, 0);
    }
}
