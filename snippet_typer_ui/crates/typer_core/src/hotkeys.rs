use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use typer_orchestrator::OrchestratorCommand;
use typer_protocol::{HotkeyAction, UiEvent, SLOT_COUNT};

/// One global shortcut, e.g. `{"accelerator": "Control+Alt+Q", "type": "type_slot", "index": 0}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HotkeyBinding {
    pub accelerator: String,
    #[serde(flatten)]
    pub action: HotkeyAction,
}

impl HotkeyBinding {
    pub fn new(accelerator: &str, action: HotkeyAction) -> Self {
        Self {
            accelerator: accelerator.to_string(),
            action,
        }
    }

    /// Short human label for log lines ("Snippet 2", "Terminate", ...).
    pub fn label(&self) -> String {
        match &self.action {
            HotkeyAction::TypeSlot { index } => format!("Snippet {}", index + 1),
            HotkeyAction::TypeText { text } => format!("Text ({} chars)", text.chars().count()),
            HotkeyAction::SaveAndType => "Save and type".to_string(),
            HotkeyAction::Terminate => "Terminate".to_string(),
            HotkeyAction::CycleTab => "Cycle tab".to_string(),
        }
    }
}

pub fn default_bindings() -> Vec<HotkeyBinding> {
    vec![
        HotkeyBinding::new("Control+Alt+Q", HotkeyAction::TypeSlot { index: 0 }),
        HotkeyBinding::new("Control+Alt+W", HotkeyAction::TypeSlot { index: 1 }),
        HotkeyBinding::new("Control+Alt+E", HotkeyAction::TypeSlot { index: 2 }),
        HotkeyBinding::new("Control+Alt+S", HotkeyAction::SaveAndType),
        HotkeyBinding::new("Control+Alt+X", HotkeyAction::Terminate),
        HotkeyBinding::new("Control+Alt+T", HotkeyAction::CycleTab),
    ]
}

/// Drops bindings that cannot work: duplicate accelerators (first one wins),
/// slot indices past the last slot and empty fixed texts.
pub fn validate_bindings(bindings: Vec<HotkeyBinding>) -> Vec<HotkeyBinding> {
    let mut seen = HashSet::new();
    bindings
        .into_iter()
        .filter(|b| {
            let valid = match &b.action {
                HotkeyAction::TypeSlot { index } => *index < SLOT_COUNT,
                HotkeyAction::TypeText { text } => !text.is_empty(),
                _ => true,
            };
            if !valid {
                tracing::warn!(accelerator = %b.accelerator, action = ?b.action, "unusable hotkey binding dropped");
                return false;
            }
            if !seen.insert(b.accelerator.to_ascii_lowercase()) {
                tracing::warn!(accelerator = %b.accelerator, "duplicate hotkey binding dropped");
                return false;
            }
            true
        })
        .collect()
}

/// Where a triggered hotkey goes.
#[derive(Debug)]
pub enum Dispatch {
    Orchestrator(OrchestratorCommand),
    /// Needs the webview: live form values or tab state.
    Ui(UiEvent),
}

pub fn route(action: &HotkeyAction) -> Dispatch {
    match action {
        HotkeyAction::TypeSlot { index } => {
            Dispatch::Orchestrator(OrchestratorCommand::TypeSlot { index: *index })
        }
        HotkeyAction::TypeText { text } => {
            Dispatch::Orchestrator(OrchestratorCommand::TypeText { text: text.clone() })
        }
        HotkeyAction::Terminate => Dispatch::Orchestrator(OrchestratorCommand::Terminate),
        HotkeyAction::SaveAndType => Dispatch::Ui(UiEvent::SaveAndTypeRequested),
        HotkeyAction::CycleTab => Dispatch::Ui(UiEvent::CycleTab),
    }
}

/// Outcome of registering a binding table. Failures never abort the rest.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RegistrationReport {
    pub registered: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl RegistrationReport {
    pub fn record_ok(&mut self, accelerator: &str) {
        self.registered.push(accelerator.to_string());
    }

    pub fn record_failure(&mut self, accelerator: &str, error: impl ToString) {
        let error = error.to_string();
        tracing::warn!(%accelerator, "failed to register shortcut: {error}");
        self.failed.push((accelerator.to_string(), error));
    }

    pub fn log_summary(&self) {
        for accelerator in &self.registered {
            tracing::debug!(%accelerator, "shortcut registered");
        }
        tracing::info!(
            registered = self.registered.len(),
            failed = self.failed.len(),
            "global shortcuts registered"
        );
    }
}
