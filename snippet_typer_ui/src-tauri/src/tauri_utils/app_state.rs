use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Mutex;
use tokio::sync::mpsc;
use typer_core::{AppConfig, HotkeyBinding, RegistrationReport};
use typer_orchestrator::OrchestratorCommand;

pub struct AppState {
    pub tx: mpsc::Sender<OrchestratorCommand>,
    pub config: AppConfig,
    /// Registered bindings keyed by `Shortcut::id()`.
    pub hotkeys: Mutex<HashMap<u32, HotkeyBinding>>,
    pub hotkey_report: Mutex<RegistrationReport>,
    pub hotkeys_registered: AtomicBool,
}

impl AppState {
    pub fn new(tx: mpsc::Sender<OrchestratorCommand>, config: AppConfig) -> Self {
        Self {
            tx,
            config,
            hotkeys: Mutex::new(HashMap::new()),
            hotkey_report: Mutex::new(RegistrationReport::default()),
            hotkeys_registered: AtomicBool::new(false),
        }
    }
}
