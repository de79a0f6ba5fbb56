use crate::tauri_utils::app_state::AppState;
use crate::tauri_utils::event_bridge;
use std::sync::atomic::Ordering;
use tauri::{AppHandle, Manager};
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutState};
use typer_core::hotkeys::{self, Dispatch};
use typer_core::RegistrationReport;

/// Registers the configured binding table. Runs once; later calls are no-ops.
pub fn register_all(app: &AppHandle) {
    let state = app.state::<AppState>();
    if state.hotkeys_registered.swap(true, Ordering::SeqCst) {
        return;
    }

    let mut report = RegistrationReport::default();
    let mut table = std::collections::HashMap::new();
    for binding in hotkeys::validate_bindings(state.config.hotkeys.clone()) {
        let shortcut = match binding.accelerator.parse::<Shortcut>() {
            Ok(s) => s,
            Err(e) => {
                report.record_failure(&binding.accelerator, e);
                continue;
            }
        };
        match app.global_shortcut().register(shortcut) {
            Ok(()) => {
                report.record_ok(&binding.accelerator);
                table.insert(shortcut.id(), binding);
            }
            Err(e) => report.record_failure(&binding.accelerator, e),
        }
    }
    report.log_summary();

    if let Ok(mut guard) = state.hotkeys.lock() {
        *guard = table;
    }
    if let Ok(mut guard) = state.hotkey_report.lock() {
        *guard = report;
    }
}

/// Global shortcut plugin handler.
pub fn on_shortcut(app: &AppHandle, shortcut: &Shortcut, state: ShortcutState) {
    if !matches!(state, ShortcutState::Pressed) {
        return;
    }
    let app_state = app.state::<AppState>();
    let binding = match app_state.hotkeys.lock() {
        Ok(table) => table.get(&shortcut.id()).cloned(),
        Err(_) => None,
    };
    let Some(binding) = binding else {
        tracing::debug!(?shortcut, "unbound shortcut pressed");
        return;
    };
    tracing::info!(accelerator = %binding.accelerator, "shortcut triggered: {}", binding.label());

    match hotkeys::route(&binding.action) {
        Dispatch::Orchestrator(cmd) => {
            let tx = app_state.tx.clone();
            tauri::async_runtime::spawn(async move {
                if tx.send(cmd).await.is_err() {
                    tracing::warn!("orchestrator unavailable, shortcut dropped");
                }
            });
        }
        Dispatch::Ui(event) => event_bridge::emit(app, &event),
    }
}

pub fn unregister_all(app: &AppHandle) {
    match app.global_shortcut().unregister_all() {
        Ok(()) => tracing::info!("global shortcuts released"),
        Err(e) => tracing::warn!("releasing global shortcuts failed: {e}"),
    }
}
