use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};
use typer_core::config::{self, AppConfig};
use typer_core::logging;
use typer_core::protocol::{OrchestratorCommand, SnippetSlots, UiEvent, COMMAND_CAP, EVENT_CAP, SLOT_COUNT};
use typer_core::JsonSnippetStore;
use typer_orchestrator::SnippetStore;

#[derive(Parser, Debug)]
#[command(name = "typer_cli")]
struct Args {
    /// Config file (defaults to snippet_typer.json next to the executable).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store up to three snippets; extra ones are dropped.
    Save { snippets: Vec<String> },
    List,
    /// Type a stored snippet or a literal text once, then exit.
    Type {
        /// Snippet number, 1 to 3.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3), required_unless_present = "text", conflicts_with = "text")]
        slot: Option<u8>,
        #[arg(long)]
        text: Option<String>,
    },
    /// Find the helper runtime and print its version.
    Probe,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    let cfg = AppConfig::load(&config_path)?;
    let _log_guard = match logging::init_logging(&cfg.log_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_stderr_logging();
            tracing::warn!("file logging unavailable: {e}");
            None
        }
    };

    let store = JsonSnippetStore::new(cfg.store_path());
    match args.command {
        Command::Save { snippets } => save(&store, snippets),
        Command::List => list(&store),
        Command::Type { slot, text } => {
            let cmd = match (slot, text) {
                (Some(n), _) => OrchestratorCommand::TypeSlot {
                    index: usize::from(n) - 1,
                },
                (None, Some(text)) => OrchestratorCommand::TypeText { text },
                (None, None) => return Err(anyhow::anyhow!("missing --slot or --text")),
            };
            type_once(&cfg, store, cmd).await
        }
        Command::Probe => probe(&cfg),
    }
}

fn save(store: &JsonSnippetStore, snippets: Vec<String>) -> anyhow::Result<()> {
    if snippets.len() > SLOT_COUNT {
        eprintln!("only the first {SLOT_COUNT} snippets are kept");
    }
    let slots = SnippetSlots::from_values(snippets);
    store.save(&slots)?;
    tracing::info!("snippets saved: {:?}", slots.as_slice());
    println!("Snippets have been saved successfully.");
    Ok(())
}

fn list(store: &JsonSnippetStore) -> anyhow::Result<()> {
    let slots = store.load()?;
    for (i, value) in slots.as_slice().iter().enumerate() {
        if value.is_empty() {
            println!("{}: (not set)", i + 1);
        } else {
            println!("{}: {value}", i + 1);
        }
    }
    Ok(())
}

fn probe(cfg: &AppConfig) -> anyhow::Result<()> {
    let runtime = typer_orchestrator::runtime::discover(&cfg.runtime_candidates)?;
    println!("{} ({})", runtime.program, runtime.version);
    Ok(())
}

/// Terminal result of a run, if `event` ends it.
fn outcome(event: &UiEvent) -> Option<anyhow::Result<()>> {
    match event {
        UiEvent::AutotypingStopped { success: true, .. } => Some(Ok(())),
        UiEvent::AutotypingStopped { exit_code, .. } => Some(Err(anyhow::anyhow!(
            "typing helper failed (exit code {exit_code:?})"
        ))),
        UiEvent::AutotypingTerminated => Some(Err(anyhow::anyhow!("typing terminated"))),
        UiEvent::AutotypingFailed { msg } | UiEvent::RequestRejected { msg } => {
            Some(Err(anyhow::anyhow!("{msg}")))
        }
        _ => None,
    }
}

async fn type_once(
    cfg: &AppConfig,
    store: JsonSnippetStore,
    cmd: OrchestratorCommand,
) -> anyhow::Result<()> {
    let (event_tx, mut events) = mpsc::channel(EVENT_CAP);
    let orchestrator = typer_orchestrator::startup(
        cfg.startup_options(),
        Box::new(cfg.channel()),
        Box::new(store),
        event_tx,
    )?;
    let (tx, rx) = mpsc::channel(COMMAND_CAP);
    let actor = tokio::spawn(typer_orchestrator::run(rx, orchestrator));

    tx.send(cmd).await?;
    let (reply, status) = oneshot::channel();
    tx.send(OrchestratorCommand::Status { reply }).await?;
    let status = status.await?;

    // A no-op request leaves no run behind and emits nothing.
    let result = match events.try_recv() {
        Err(_) if status.active.is_none() => Err(anyhow::anyhow!("nothing to type: snippet not set")),
        first => {
            let mut pending = first.ok();
            let mut interrupted = false;
            loop {
                let event = match pending.take() {
                    Some(ev) => Some(ev),
                    None => tokio::select! {
                        ev = events.recv() => ev,
                        _ = tokio::signal::ctrl_c(), if !interrupted => {
                            interrupted = true;
                            eprintln!("interrupted, terminating");
                            tx.send(OrchestratorCommand::Terminate).await?;
                            continue;
                        }
                    },
                };
                let Some(event) = event else {
                    break Err(anyhow::anyhow!("orchestrator stopped unexpectedly"));
                };
                if let UiEvent::AutotypingStarted { pid, .. } = &event {
                    eprintln!("typing (pid {pid:?})");
                }
                if let Some(done) = outcome(&event) {
                    break done;
                }
            }
        }
    };

    let (done, ack) = oneshot::channel();
    if tx.send(OrchestratorCommand::Shutdown { done }).await.is_ok() {
        let _ = ack.await;
    }
    actor.await?;
    result
}
