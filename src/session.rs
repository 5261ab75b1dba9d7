//! The single call session and its lifecycle state machine.
//!
//! There is exactly one [`Session`] per process, independent of which lead
//! is selected. Transitions are self-suppressing: an invalid trigger leaves
//! the session untouched and returns `false`, it never faults.
//!
//! Authoritative timing state is the call start timestamp; elapsed seconds
//! is a derived display value recomputed from it once per second while the
//! call is live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Call lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallState {
    /// No call underway.
    Idle,
    /// Dialing; the settle timer will take the call live.
    Dialing,
    /// Live call.
    Active,
    /// Call on hold while the agent composes the wrap-up.
    WrapUp,
}

/// The singular call session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Current lifecycle state.
    pub state: CallState,
    /// When the call went live. `None` while not actively timed, which
    /// freezes the derived elapsed value.
    pub started_at: Option<DateTime<Utc>>,
    /// Derived elapsed display value, in whole seconds.
    pub elapsed_secs: u64,
    /// Whether the script auto-advance ticker runs while the call is live.
    pub auto_advance: bool,
    /// Identifier of the currently focused lead.
    pub selected: String,
    /// Whether a voice announcement is in flight.
    pub speaking: bool,
}

impl Session {
    /// New idle session focused on the given lead.
    pub fn new(selected: impl Into<String>) -> Self {
        Self {
            state: CallState::Idle,
            started_at: None,
            elapsed_secs: 0,
            auto_advance: true,
            selected: selected.into(),
            speaking: false,
        }
    }

    /// `idle -> dialing`. Suppressed from any other state.
    pub fn begin_dialing(&mut self) -> bool {
        if self.state != CallState::Idle {
            return false;
        }
        self.state = CallState::Dialing;
        true
    }

    /// `dialing -> active`, fired by the settle timer. Stamps the call
    /// start and zeroes the elapsed display.
    pub fn connect(&mut self, now: DateTime<Utc>) -> bool {
        if self.state != CallState::Dialing {
            return false;
        }
        self.state = CallState::Active;
        self.started_at = Some(now);
        self.elapsed_secs = 0;
        true
    }

    /// `active -> wrap-up`. Clears the start timestamp, freezing the
    /// elapsed display at its last computed value.
    pub fn hold(&mut self) -> bool {
        if self.state != CallState::Active {
            return false;
        }
        self.state = CallState::WrapUp;
        self.started_at = None;
        true
    }

    /// `any -> idle`. Restores auto-advance to its enabled default and
    /// clears the speaking flag. Returns whether anything changed.
    pub fn reset_call(&mut self) -> bool {
        let changed = self.state != CallState::Idle
            || self.started_at.is_some()
            || self.elapsed_secs != 0
            || !self.auto_advance
            || self.speaking;
        self.state = CallState::Idle;
        self.started_at = None;
        self.elapsed_secs = 0;
        self.auto_advance = true;
        self.speaking = false;
        changed
    }

    /// Recompute the derived elapsed display from the start timestamp.
    /// Returns the new value; unchanged when not actively timed.
    pub fn recompute_elapsed(&mut self, now: DateTime<Utc>) -> u64 {
        if let Some(started) = self.started_at {
            let secs = (now - started).num_seconds();
            self.elapsed_secs = u64::try_from(secs).unwrap_or(0);
        }
        self.elapsed_secs
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use chrono::Duration;

    #[test]
    fn happy_path_idle_dialing_active_wrapup_idle() {
        let mut s = Session::new("lead-1");
        assert!(s.begin_dialing());
        assert_eq!(s.state, CallState::Dialing);

        let now = Utc::now();
        assert!(s.connect(now));
        assert_eq!(s.state, CallState::Active);
        assert_eq!(s.started_at, Some(now));
        assert_eq!(s.elapsed_secs, 0);

        assert!(s.hold());
        assert_eq!(s.state, CallState::WrapUp);
        assert!(s.started_at.is_none());

        assert!(s.reset_call());
        assert_eq!(s.state, CallState::Idle);
    }

    #[test]
    fn invalid_triggers_are_suppressed() {
        let mut s = Session::new("lead-1");
        assert!(!s.connect(Utc::now()), "connect from idle");
        assert!(!s.hold(), "hold from idle");

        s.begin_dialing();
        assert!(!s.begin_dialing(), "dialing while dialing");
        assert!(!s.hold(), "hold while dialing");

        s.connect(Utc::now());
        assert!(!s.begin_dialing(), "dialing while active");
        assert!(!s.connect(Utc::now()), "connect while active");
    }

    #[test]
    fn reset_restores_auto_advance_and_clears_speaking() {
        let mut s = Session::new("lead-1");
        s.auto_advance = false;
        s.speaking = true;
        s.begin_dialing();
        assert!(s.reset_call());
        assert!(s.auto_advance);
        assert!(!s.speaking);
        assert_eq!(s.state, CallState::Idle);
        // A second reset of an already-default session changes nothing.
        assert!(!s.reset_call());
    }

    #[test]
    fn elapsed_derives_from_start_and_freezes_on_hold() {
        let mut s = Session::new("lead-1");
        s.begin_dialing();
        let start = Utc::now();
        s.connect(start);

        assert_eq!(s.recompute_elapsed(start + Duration::seconds(7)), 7);
        s.hold();
        // No start timestamp: elapsed stays frozen.
        assert_eq!(s.recompute_elapsed(start + Duration::seconds(99)), 7);
    }
}
