use serde::{Deserialize, Serialize};

/// Store key holding the snippet list.
pub const SNIPPETS_KEY: &str = "snippets";
pub const SLOT_COUNT: usize = 3;

pub const REQUEST_FILE_NAME: &str = "snippet_temp.txt";
pub const STOP_FILE_NAME: &str = "autotyper_stop.txt";

/// The three snippet slots, always exactly `SLOT_COUNT` long.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SnippetSlots(Vec<String>);

impl SnippetSlots {
    pub fn empty() -> Self {
        Self(vec![String::new(); SLOT_COUNT])
    }

    /// Truncates or pads `values` to `SLOT_COUNT` entries.
    pub fn from_values(mut values: Vec<String>) -> Self {
        values.truncate(SLOT_COUNT);
        values.resize(SLOT_COUNT, String::new());
        Self(values)
    }

    /// Slot contents, or `None` when the slot is unset, empty or out of range.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_values(self) -> Vec<String> {
        self.0
    }
}

impl Default for SnippetSlots {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<String>> for SnippetSlots {
    fn from(values: Vec<String>) -> Self {
        Self::from_values(values)
    }
}

impl From<SnippetSlots> for Vec<String> {
    fn from(slots: SnippetSlots) -> Self {
        slots.0
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TypingSource {
    Slot { index: usize },
    Text,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Preparing,
    Running,
    Completing,
    ForceStopping,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum HotkeyAction {
    TypeSlot { index: usize },
    TypeText { text: String },
    SaveAndType,
    Terminate,
    CycleTab,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ActiveRunSummary {
    pub pid: Option<u32>,
    pub runtime: String,
    pub source: TypingSource,
    /// Milliseconds since the Unix epoch.
    pub started_at_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub state: RunState,
    pub active: Option<ActiveRunSummary>,
    pub pending: bool,
}

/// Notifications from the orchestrator (and hotkey layer) to the UI.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum UiEvent {
    SnippetsSaved { status: String },
    AutotypingStarted { source: TypingSource, pid: Option<u32> },
    AutotypingStopped { success: bool, exit_code: Option<i32> },
    AutotypingTerminated,
    AutotypingFailed { msg: String },
    RequestRejected { msg: String },
    SaveAndTypeRequested,
    CycleTab,
}

impl UiEvent {
    /// Event name used when forwarding to the webview.
    pub fn channel(&self) -> &'static str {
        match self {
            UiEvent::SnippetsSaved { .. } => "typer://snippets_saved",
            UiEvent::AutotypingStarted { .. } => "typer://started",
            UiEvent::AutotypingStopped { .. } => "typer://stopped",
            UiEvent::AutotypingTerminated => "typer://terminated",
            UiEvent::AutotypingFailed { .. } => "typer://failed",
            UiEvent::RequestRejected { .. } => "typer://rejected",
            UiEvent::SaveAndTypeRequested => "typer://save_and_type",
            UiEvent::CycleTab => "typer://cycle_tab",
        }
    }
}
