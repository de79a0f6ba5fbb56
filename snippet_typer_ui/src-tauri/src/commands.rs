use tauri::{AppHandle, State};
use tokio::sync::oneshot;
use typer_core::RegistrationReport;
use typer_orchestrator::{OrchestratorCommand, SnippetStore};
use typer_protocol::StatusSnapshot;

use crate::tauri_utils::app_state::AppState;
use crate::tauri_utils::store::TauriSnippetStore;

async fn send(state: &AppState, cmd: OrchestratorCommand) -> Result<(), String> {
    state
        .tx
        .send(cmd)
        .await
        .map_err(|_| "orchestrator unavailable".to_string())
}

#[tauri::command]
pub async fn save_snippets(state: State<'_, AppState>, snippets: Vec<String>) -> Result<(), String> {
    send(&state, OrchestratorCommand::SaveSnippets { snippets }).await
}

#[tauri::command]
pub fn get_snippets(app: AppHandle) -> Result<Vec<String>, String> {
    TauriSnippetStore::new(app)
        .load()
        .map(|slots| slots.into_values())
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn trigger_type(state: State<'_, AppState>, index: usize) -> Result<(), String> {
    send(&state, OrchestratorCommand::TypeSlot { index }).await
}

#[tauri::command]
pub async fn type_text(state: State<'_, AppState>, text: String) -> Result<(), String> {
    send(&state, OrchestratorCommand::TypeText { text }).await
}

#[tauri::command]
pub async fn terminate_typing(state: State<'_, AppState>) -> Result<(), String> {
    send(&state, OrchestratorCommand::Terminate).await
}

/// Answer to the save-and-type hotkey: the form's current values plus the
/// active tab. Saving and typing go through the same queue, so the typing
/// request sees the saved values.
#[tauri::command]
pub async fn save_and_type(
    state: State<'_, AppState>,
    snippets: Vec<String>,
    index: usize,
) -> Result<(), String> {
    send(&state, OrchestratorCommand::SaveSnippets { snippets }).await?;
    send(&state, OrchestratorCommand::TypeSlot { index }).await
}

#[tauri::command]
pub async fn get_status(state: State<'_, AppState>) -> Result<StatusSnapshot, String> {
    let (reply, rx) = oneshot::channel();
    send(&state, OrchestratorCommand::Status { reply }).await?;
    rx.await.map_err(|_| "orchestrator unavailable".to_string())
}

#[tauri::command]
pub fn get_hotkey_report(state: State<'_, AppState>) -> Result<RegistrationReport, String> {
    state
        .hotkey_report
        .lock()
        .map(|r| r.clone())
        .map_err(|_| "hotkey report lock poisoned".to_string())
}
