//! Async driver around [`CoreState`]: one task, three condition-scoped
//! timers.
//!
//! The engine runs a single `tokio::select!` loop over user actions,
//! internal timer events, and announcer busy changes. All mutations happen
//! inside that loop, so they are atomic with respect to each other. Timers
//! are spawned tasks guarded by a [`CancellationToken`] and reconciled
//! against the session state after every mutation:
//!
//! 1. dial-settle one-shot, armed iff the session is dialing;
//! 2. elapsed-seconds ticker, armed iff a call is live;
//! 3. auto-advance ticker, armed iff a call is live and auto-advance is on.
//!
//! A timer event that arrives after its condition ended is dropped; the
//! core re-checks state on receipt as well.

use crate::announce::{AnnouncementVoice, Announcer};
use crate::catalog::Catalog;
use crate::config::CoreConfig;
use crate::error::{CallError, Result};
use crate::session::CallState;
use crate::state::{CoreSnapshot, CoreState, SessionEvent, UserAction};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Internal timer firings routed back into the engine loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerEvent {
    /// The dial-settle one-shot elapsed.
    DialSettled,
    /// The elapsed-seconds ticker fired.
    ElapsedTick,
    /// The auto-advance ticker fired.
    AutoAdvance,
}

/// Commands accepted by the engine loop.
enum Command {
    /// A user action from the outer surface.
    Action(UserAction),
    /// Request a point-in-time snapshot of the focused lead.
    Snapshot(oneshot::Sender<CoreSnapshot>),
    /// Stop the loop.
    Shutdown,
}

/// Clonable handle for driving a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl EngineHandle {
    /// Send a user action into the engine.
    pub fn dispatch(&self, action: UserAction) -> Result<()> {
        self.tx
            .send(Command::Action(action))
            .map_err(|_| CallError::Channel("engine loop has shut down".into()))
    }

    /// Fetch a snapshot of the focused lead's state.
    pub async fn snapshot(&self) -> Result<CoreSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(tx))
            .map_err(|_| CallError::Channel("engine loop has shut down".into()))?;
        rx.await
            .map_err(|_| CallError::Channel("engine dropped the snapshot request".into()))
    }

    /// Ask the engine loop to stop.
    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

/// The async engine owning the core aggregate and the announcer.
pub struct CallEngine {
    core: CoreState,
    announcer: Announcer,
    command_rx: mpsc::UnboundedReceiver<Command>,
    timer_tx: mpsc::UnboundedSender<TimerEvent>,
    timer_rx: mpsc::UnboundedReceiver<TimerEvent>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    dial_guard: Option<CancellationToken>,
    elapsed_guard: Option<CancellationToken>,
    advance_guard: Option<CancellationToken>,
}

impl CallEngine {
    /// Build an engine around a catalog and a voice capability. Returns the
    /// engine (to be `run()`), a handle for driving it, and the event
    /// stream hosts render from.
    pub fn new(
        catalog: Catalog,
        config: CoreConfig,
        voice: Arc<dyn AnnouncementVoice>,
    ) -> Result<(Self, EngineHandle, mpsc::UnboundedReceiver<SessionEvent>)> {
        let core = CoreState::new(catalog, config)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let engine = Self {
            core,
            announcer: Announcer::new(voice),
            command_rx,
            timer_tx,
            timer_rx,
            event_tx,
            dial_guard: None,
            elapsed_guard: None,
            advance_guard: None,
        };
        Ok((engine, EngineHandle { tx: command_tx }, event_rx))
    }

    /// Run the engine loop until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!(lead_id = %self.core.session.selected, "call engine running");
        let mut busy_rx = self.announcer.subscribe();
        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    None | Some(Command::Shutdown) => break,
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.core.snapshot());
                    }
                    Some(Command::Action(action)) => self.handle_action(action),
                },
                Some(ev) = self.timer_rx.recv() => self.handle_timer(ev),
                changed = busy_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let speaking = *busy_rx.borrow_and_update();
                    let events = self.core.set_speaking(speaking);
                    self.emit(events);
                }
            }
            self.sync_timers();
        }
        self.teardown();
        info!("call engine stopped");
    }

    fn handle_action(&mut self, action: UserAction) {
        match action {
            UserAction::VoiceCue => {
                if let Some(text) = self.core.current_step_cue() {
                    self.announcer.say(text);
                }
            }
            action => {
                // Actions that reset the session also silence any cue that
                // was still playing.
                let silences = matches!(
                    action,
                    UserAction::SelectLead { .. }
                        | UserAction::ResetSession
                        | UserAction::CompleteWrapUp
                );
                let events = self.core.apply(action, Utc::now());
                if silences
                    && !events.is_empty()
                    && self.core.session.state == CallState::Idle
                {
                    self.announcer.cancel();
                }
                self.emit(events);
            }
        }
    }

    fn handle_timer(&mut self, ev: TimerEvent) {
        let now = Utc::now();
        match ev {
            TimerEvent::DialSettled => {
                // One-shot has fired; drop its guard so a later dialing
                // entry arms a fresh one.
                self.dial_guard = None;
                let events = self.core.dial_settled(now);
                self.emit(events);
            }
            TimerEvent::ElapsedTick => {
                let events = self.core.recompute_elapsed(now);
                self.emit(events);
            }
            TimerEvent::AutoAdvance => {
                if self.core.session.state == CallState::Active && self.core.session.auto_advance {
                    let events = self.core.advance_script(true, now);
                    self.emit(events);
                }
            }
        }
    }

    /// Reconcile the three timers against the session state. Called after
    /// every mutation; tears a timer down the moment its owning condition
    /// ends, so no stale firing can mutate state.
    fn sync_timers(&mut self) {
        let state = self.core.session.state;
        let timing = &self.core.config.timing;

        let want_dial = state == CallState::Dialing;
        match (&self.dial_guard, want_dial) {
            (None, true) => {
                let token = CancellationToken::new();
                let tx = self.timer_tx.clone();
                let delay = Duration::from_millis(timing.dial_settle_ms);
                let task_token = token.clone();
                tokio::spawn(async move {
                    tokio::select! {
                        () = task_token.cancelled() => {}
                        () = tokio::time::sleep(delay) => {
                            let _ = tx.send(TimerEvent::DialSettled);
                        }
                    }
                });
                debug!(delay_ms = timing.dial_settle_ms, "dial-settle timer armed");
                self.dial_guard = Some(token);
            }
            (Some(token), false) => {
                token.cancel();
                self.dial_guard = None;
                debug!("dial-settle timer cancelled");
            }
            _ => {}
        }

        let want_elapsed = state == CallState::Active;
        Self::sync_ticker(
            &mut self.elapsed_guard,
            want_elapsed,
            timing.elapsed_tick_ms,
            TimerEvent::ElapsedTick,
            &self.timer_tx,
        );

        let want_advance = state == CallState::Active && self.core.session.auto_advance;
        Self::sync_ticker(
            &mut self.advance_guard,
            want_advance,
            timing.auto_advance_ms,
            TimerEvent::AutoAdvance,
            &self.timer_tx,
        );
    }

    fn sync_ticker(
        guard: &mut Option<CancellationToken>,
        wanted: bool,
        period_ms: u64,
        event: TimerEvent,
        timer_tx: &mpsc::UnboundedSender<TimerEvent>,
    ) {
        match (&guard, wanted) {
            (None, true) => {
                let token = CancellationToken::new();
                let tx = timer_tx.clone();
                let period = Duration::from_millis(period_ms);
                let task_token = token.clone();
                tokio::spawn(async move {
                    // First tick one full period in, not immediately.
                    let start = tokio::time::Instant::now() + period;
                    let mut ticker = tokio::time::interval_at(start, period);
                    loop {
                        tokio::select! {
                            () = task_token.cancelled() => break,
                            _ = ticker.tick() => {
                                if tx.send(event).is_err() {
                                    break;
                                }
                            }
                        }
                    }
                });
                debug!(?event, period_ms, "ticker armed");
                *guard = Some(token);
            }
            (Some(token), false) => {
                token.cancel();
                *guard = None;
                debug!(?event, "ticker cancelled");
            }
            _ => {}
        }
    }

    fn emit(&self, events: Vec<SessionEvent>) {
        for event in events {
            let _ = self.event_tx.send(event);
        }
    }

    fn teardown(&mut self) {
        for guard in [
            self.dial_guard.take(),
            self.elapsed_guard.take(),
            self.advance_guard.take(),
        ]
        .into_iter()
        .flatten()
        {
            guard.cancel();
        }
        self.announcer.cancel();
    }
}
