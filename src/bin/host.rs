//! Headless host for the call engine: stdin commands in, events out.
//!
//! Reads one command per line from stdin, dispatches it as a
//! [`UserAction`], and prints engine events to stdout. Tracing goes to
//! stderr so stdout stays readable.
//!
//! Usage: `calldeck-host [catalog.json]` (built-in demo roster when no
//! catalog file is given).

use std::sync::Arc;

use calldeck::{
    CallEngine, Catalog, CoreConfig, EngineHandle, NullVoice, SessionEvent, Speaker, UserAction,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let catalog = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            Catalog::from_json_str(&text)?
        }
        None => Catalog::demo(),
    };

    let (engine, handle, mut events) =
        CallEngine::new(catalog, CoreConfig::default(), Arc::new(NullVoice))?;
    let engine_task = tokio::spawn(engine.run());

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            print_event(&event);
        }
    });

    println!("calldeck host ready; type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !dispatch_line(&handle, line.trim()).await? {
            break;
        }
    }

    handle.shutdown();
    engine_task.await?;
    Ok(())
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::StateChanged { state } => println!("-- state: {state:?}"),
        SessionEvent::SelectionChanged { lead_id } => println!("-- selected: {lead_id}"),
        SessionEvent::JournalAppended { lead_id } => println!("-- journal updated: {lead_id}"),
        SessionEvent::RuntimeChanged { lead_id } => println!("-- runtime updated: {lead_id}"),
        SessionEvent::LeadCompleted { lead_id } => println!("-- completed: {lead_id}"),
        SessionEvent::ElapsedSeconds { secs } => println!("-- elapsed: {secs}s"),
        SessionEvent::AutoAdvanceChanged { enabled } => println!("-- auto-advance: {enabled}"),
        SessionEvent::SpeakingChanged { speaking } => println!("-- speaking: {speaking}"),
    }
}

/// Map one input line to a user action. Returns `false` on `quit`.
async fn dispatch_line(handle: &EngineHandle, line: &str) -> anyhow::Result<bool> {
    let (cmd, rest) = match line.split_once(' ') {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };
    let action = match cmd {
        "" => return Ok(true),
        "help" => {
            println!(
                "commands: select <id> | start | pause | reset | auto | advance | \
                 task <id> | notes <text> | wrap <text> | log <agent|lead> <text> | \
                 done | cue | show | quit"
            );
            return Ok(true);
        }
        "quit" => return Ok(false),
        "show" => {
            let snap = handle.snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&snap)?);
            return Ok(true);
        }
        "select" => UserAction::SelectLead { id: rest.into() },
        "start" => UserAction::StartCall,
        "pause" => UserAction::PauseCall,
        "reset" => UserAction::ResetSession,
        "auto" => UserAction::ToggleAutoAdvance,
        "advance" => UserAction::AdvanceScript,
        "task" => UserAction::ToggleTask {
            task_id: rest.into(),
        },
        "notes" => UserAction::SetNotes { text: rest.into() },
        "wrap" => UserAction::SetWrapSummary { text: rest.into() },
        "log" => {
            let (who, text) = rest.split_once(' ').unwrap_or((rest, ""));
            let speaker = match who {
                "lead" => Speaker::Lead,
                _ => Speaker::Agent,
            };
            UserAction::SubmitJournalEntry {
                speaker,
                text: text.into(),
            }
        }
        "done" => UserAction::CompleteWrapUp,
        "cue" => UserAction::VoiceCue,
        other => {
            println!("unknown command: {other} (try `help`)");
            return Ok(true);
        }
    };
    handle.dispatch(action)?;
    Ok(true)
}
