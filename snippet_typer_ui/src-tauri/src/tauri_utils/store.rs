use tauri::{AppHandle, Wry};
use tauri_plugin_store::StoreExt;
use typer_orchestrator::{SnippetStore, StoreError};
use typer_protocol::{SnippetSlots, SNIPPETS_KEY};

const STORE_FILE: &str = "snippets.json";

/// Snippet slots kept by tauri-plugin-store in the app data directory.
pub struct TauriSnippetStore {
    app: AppHandle<Wry>,
}

impl TauriSnippetStore {
    pub fn new(app: AppHandle<Wry>) -> Self {
        Self { app }
    }
}

impl SnippetStore for TauriSnippetStore {
    fn load(&self) -> Result<SnippetSlots, StoreError> {
        let store = self
            .app
            .store(STORE_FILE)
            .map_err(|e| StoreError(e.to_string()))?;
        match store.get(SNIPPETS_KEY) {
            None | Some(serde_json::Value::Null) => Ok(SnippetSlots::empty()),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError(format!("invalid snippets: {e}"))),
        }
    }

    fn save(&self, slots: &SnippetSlots) -> Result<(), StoreError> {
        let store = self
            .app
            .store(STORE_FILE)
            .map_err(|e| StoreError(e.to_string()))?;
        let value = serde_json::to_value(slots).map_err(|e| StoreError(e.to_string()))?;
        store.set(SNIPPETS_KEY, value);
        store.save().map_err(|e| StoreError(e.to_string()))
    }
}
