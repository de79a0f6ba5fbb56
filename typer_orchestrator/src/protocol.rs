use tokio::sync::oneshot;

pub const COMMAND_CAP: usize = 64;
pub const EVENT_CAP: usize = 256;

#[derive(Debug)]
pub enum OrchestratorCommand {
    SaveSnippets { snippets: Vec<String> },
    TypeSlot { index: usize },
    TypeText { text: String },
    Terminate,
    Status { reply: oneshot::Sender<StatusSnapshot> },
    /// Stops any active run, removes temp artifacts, then ends the actor.
    Shutdown { done: oneshot::Sender<()> },
}

pub use typer_protocol::{
    ActiveRunSummary, HotkeyAction, RunState, SnippetSlots, StatusSnapshot, TypingSource, UiEvent,
    SLOT_COUNT, SNIPPETS_KEY,
};
