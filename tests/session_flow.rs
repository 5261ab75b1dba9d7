//! End-to-end timer semantics for the call engine, on the paused tokio
//! clock: dial settle, elapsed ticking, auto-advance, and the teardown
//! rules that keep stale timers from firing after a state change.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use calldeck::{
    AnnouncementVoice, CallEngine, CallState, Catalog, CoreConfig, EngineHandle, LeadStatus,
    NullVoice, SessionEvent, Speaker, UserAction,
};
use tokio::sync::mpsc::UnboundedReceiver;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn an engine over the demo catalog with a silent voice.
fn boot() -> (EngineHandle, UnboundedReceiver<SessionEvent>) {
    boot_with_voice(Arc::new(NullVoice))
}

fn boot_with_voice(
    voice: Arc<dyn AnnouncementVoice>,
) -> (EngineHandle, UnboundedReceiver<SessionEvent>) {
    let (engine, handle, events) =
        CallEngine::new(Catalog::demo(), CoreConfig::default(), voice).unwrap();
    tokio::spawn(engine.run());
    (handle, events)
}

/// Dispatch an action and wait until the engine has applied it.
async fn apply(handle: &EngineHandle, action: UserAction) {
    handle.dispatch(action).unwrap();
    // Snapshot requests queue behind the action, so the reply proves it ran.
    let _ = handle.snapshot().await.unwrap();
}

/// Take the call live: start, then let the settle timer fire.
async fn go_active(handle: &EngineHandle) {
    apply(handle, UserAction::StartCall).await;
    tokio::time::sleep(Duration::from_millis(1_500)).await;
}

/// Pull everything currently queued on the event stream.
fn drain(events: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(ev) = events.try_recv() {
        out.push(ev);
    }
    out
}

// ---------------------------------------------------------------------------
// Dial settle
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn dial_settles_into_an_active_call() {
    let (handle, mut events) = boot();

    apply(&handle, UserAction::StartCall).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.session.state, CallState::Dialing);
    assert!(snap.session.started_at.is_none());

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.session.state, CallState::Active);
    assert!(snap.session.started_at.is_some());

    // Journal: readiness seed, dialing line, connected line.
    assert_eq!(snap.runtime.conversation.len(), 3);
    assert!(snap.runtime.conversation[1].text.contains("Dialing"));
    assert!(snap.runtime.conversation[2].text.contains("Connected"));

    let seen = drain(&mut events);
    assert!(seen.contains(&SessionEvent::StateChanged {
        state: CallState::Dialing
    }));
    assert!(seen.contains(&SessionEvent::StateChanged {
        state: CallState::Active
    }));
}

#[tokio::test(start_paused = true)]
async fn switching_leads_outruns_the_settle_timer() {
    let (handle, _events) = boot();

    apply(&handle, UserAction::StartCall).await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    apply(
        &handle,
        UserAction::SelectLead {
            id: "lead-okafor".into(),
        },
    )
    .await;

    // Well past the settle delay: the cancelled one-shot must not connect.
    tokio::time::sleep(Duration::from_secs(3)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.session.state, CallState::Idle);
    assert_eq!(snap.lead.id, "lead-okafor");

    // The abandoned lead never got a "Connected" line.
    apply(
        &handle,
        UserAction::SelectLead {
            id: "lead-mercer".into(),
        },
    )
    .await;
    let snap = handle.snapshot().await.unwrap();
    assert!(
        snap.runtime
            .conversation
            .iter()
            .all(|e| !e.text.contains("Connected")),
    );
}

// ---------------------------------------------------------------------------
// Elapsed ticking
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn elapsed_ticks_only_while_active() {
    let (handle, mut events) = boot();
    go_active(&handle).await;
    drain(&mut events);

    tokio::time::sleep(Duration::from_millis(3_100)).await;
    let ticks: Vec<u64> = drain(&mut events)
        .into_iter()
        .filter_map(|ev| match ev {
            SessionEvent::ElapsedSeconds { secs } => Some(secs),
            _ => None,
        })
        .collect();
    assert!(!ticks.is_empty(), "ticker runs while active");

    apply(&handle, UserAction::PauseCall).await;
    drain(&mut events);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(
        drain(&mut events)
            .iter()
            .all(|ev| !matches!(ev, SessionEvent::ElapsedSeconds { .. })),
        "ticker torn down on hold"
    );
}

// ---------------------------------------------------------------------------
// Auto-advance
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn auto_advance_walks_the_script_then_idles() {
    let (handle, _events) = boot();
    go_active(&handle).await;

    // Demo lead has 3 steps; the 6s ticker consumes one per period and the
    // fourth firing finds the script exhausted.
    tokio::time::sleep(Duration::from_secs(26)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.runtime.script_cursor, 3);
    // 3 system lines (ready/dialing/connected) + 3 steps * 2 entries.
    assert_eq!(snap.runtime.conversation.len(), 9);

    // Exhausted script: further periods append nothing.
    tokio::time::sleep(Duration::from_secs(13)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.runtime.conversation.len(), 9);
    assert_eq!(snap.runtime.script_cursor, 3);
}

#[tokio::test(start_paused = true)]
async fn toggling_auto_advance_stops_and_restarts_the_ticker() {
    let (handle, _events) = boot();
    apply(&handle, UserAction::ToggleAutoAdvance).await;
    go_active(&handle).await;

    tokio::time::sleep(Duration::from_secs(20)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.runtime.script_cursor, 0, "disabled ticker never fires");

    apply(&handle, UserAction::ToggleAutoAdvance).await;
    tokio::time::sleep(Duration::from_secs(7)).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.runtime.script_cursor, 1, "re-enabled ticker resumes");
}

#[tokio::test(start_paused = true)]
async fn manual_advance_matches_the_scripted_scenario() {
    let (handle, _events) = boot();
    apply(&handle, UserAction::ToggleAutoAdvance).await;
    go_active(&handle).await;

    for expected in 1..=3u64 {
        apply(&handle, UserAction::AdvanceScript).await;
        let snap = handle.snapshot().await.unwrap();
        assert_eq!(snap.runtime.script_cursor as u64, expected);
        assert_eq!(snap.runtime.conversation.len(), 3 + 2 * expected as usize);
    }

    // Fourth call is a no-op.
    apply(&handle, UserAction::AdvanceScript).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.runtime.script_cursor, 3);
    assert_eq!(snap.runtime.conversation.len(), 9);
}

// ---------------------------------------------------------------------------
// Lead switch mid-call
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn switching_mid_call_idles_and_silences_every_timer() {
    let (handle, mut events) = boot();
    go_active(&handle).await;

    apply(
        &handle,
        UserAction::SelectLead {
            id: "lead-silva".into(),
        },
    )
    .await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.session.state, CallState::Idle);
    drain(&mut events);

    // No elapsed ticks, no auto-advance output after the switch.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let after = drain(&mut events);
    assert!(
        after
            .iter()
            .all(|ev| !matches!(ev, SessionEvent::ElapsedSeconds { .. })),
        "elapsed ticker still firing after switch: {after:?}"
    );
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.runtime.script_cursor, 0, "no advance on the new lead");
}

// ---------------------------------------------------------------------------
// Wrap-up
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn wrap_up_flow_completes_the_lead() {
    let (handle, _events) = boot();
    go_active(&handle).await;
    apply(&handle, UserAction::PauseCall).await;

    // Blank summary: rejected, still in wrap-up.
    apply(
        &handle,
        UserAction::SetWrapSummary { text: "   ".into() },
    )
    .await;
    apply(&handle, UserAction::CompleteWrapUp).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.session.state, CallState::WrapUp);
    assert_eq!(snap.lead.status, LeadStatus::New);

    apply(
        &handle,
        UserAction::SetWrapSummary {
            text: "Booked the demo; send routing one-pager.".into(),
        },
    )
    .await;
    apply(&handle, UserAction::CompleteWrapUp).await;
    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.session.state, CallState::Idle);
    assert_eq!(snap.lead.status, LeadStatus::Completed);
    assert_eq!(snap.lead.next_action, "Call completed");
}

// ---------------------------------------------------------------------------
// Journal + manual entries through the engine
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn manual_entries_land_in_the_windowed_journal() {
    let (handle, _events) = boot();

    for i in 0..20 {
        apply(
            &handle,
            UserAction::SubmitJournalEntry {
                speaker: Speaker::Agent,
                text: format!("note {i}"),
            },
        )
        .await;
    }
    // Blank entry rejected.
    apply(
        &handle,
        UserAction::SubmitJournalEntry {
            speaker: Speaker::Agent,
            text: "   ".into(),
        },
    )
    .await;

    let snap = handle.snapshot().await.unwrap();
    assert_eq!(snap.runtime.conversation.len(), 21, "seed + 20 entries");
    assert_eq!(snap.journal.total, 21);
    assert_eq!(snap.journal.entries.len(), 14, "window holds the newest 14");
    assert_eq!(snap.journal.entries[0].text, "note 19", "newest first");
}

// ---------------------------------------------------------------------------
// Voice cues
// ---------------------------------------------------------------------------

/// Voice that "plays" each utterance for a fixed duration.
struct SlowVoice;

#[async_trait::async_trait]
impl AnnouncementVoice for SlowVoice {
    async fn speak(&self, _text: &str) -> calldeck::Result<()> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn voice_cue_mirrors_the_speaking_flag() {
    let (handle, mut events) = boot_with_voice(Arc::new(SlowVoice));

    handle.dispatch(UserAction::VoiceCue).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    let snap = handle.snapshot().await.unwrap();
    assert!(snap.session.speaking);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let snap = handle.snapshot().await.unwrap();
    assert!(!snap.session.speaking);

    let seen = drain(&mut events);
    assert!(seen.contains(&SessionEvent::SpeakingChanged { speaking: true }));
    assert!(seen.contains(&SessionEvent::SpeakingChanged { speaking: false }));
}
