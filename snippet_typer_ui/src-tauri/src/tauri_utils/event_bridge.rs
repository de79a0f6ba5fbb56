use tauri::{AppHandle, Emitter};
use tokio::sync::mpsc;
use typer_protocol::UiEvent;

/// Forwards orchestrator notifications to the webview until the sender side closes.
pub async fn run(mut rx: mpsc::Receiver<UiEvent>, app: AppHandle) {
    while let Some(event) = rx.recv().await {
        emit(&app, &event);
    }
    tracing::debug!("ui event bridge stopped");
}

pub fn emit(app: &AppHandle, event: &UiEvent) {
    if let Err(e) = app.emit(event.channel(), event) {
        tracing::warn!(channel = event.channel(), "emitting ui event failed: {e}");
    }
}
