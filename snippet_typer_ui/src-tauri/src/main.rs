#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

#[cfg(windows)]
mod commands;
#[cfg(windows)]
mod tauri_utils;

#[cfg(windows)]
fn main() {
    use crate::tauri_utils::app_state::AppState;
    use crate::tauri_utils::{event_bridge, hotkeys, store::TauriSnippetStore};
    use std::time::Duration;
    use tauri::webview::PageLoadEvent;
    use tauri::{Manager, RunEvent, WebviewWindowBuilder};
    use tauri_plugin_dialog::{DialogExt, MessageDialogKind};
    use tokio::sync::{mpsc, oneshot};
    use typer_core::{config, logging, AppConfig};
    use typer_orchestrator::protocol::{COMMAND_CAP, EVENT_CAP};
    use typer_orchestrator::OrchestratorCommand;

    let (app_config, config_error) = match AppConfig::load(&config::config_path()) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e.to_string())),
    };
    let _log_guard = match logging::init_logging(&app_config.log_dir()) {
        Ok(guard) => Some(guard),
        Err(e) => {
            logging::init_stderr_logging();
            tracing::warn!("file logging unavailable: {e}");
            None
        }
    };

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            let _ = app.get_webview_window("main").map(|w| w.set_focus());
        }))
        .plugin(tauri_plugin_store::Builder::default().build())
        .plugin(tauri_plugin_dialog::init())
        .plugin(
            tauri_plugin_global_shortcut::Builder::new()
                .with_handler(|app, shortcut, event| {
                    hotkeys::on_shortcut(app, shortcut, event.state);
                })
                .build(),
        )
        .setup(move |app| {
            let fatal = |app: &tauri::App, msg: String| {
                tracing::error!("{msg}");
                let handle = app.handle().clone();
                app.dialog()
                    .message(msg)
                    .title("Snippet Typer")
                    .kind(MessageDialogKind::Error)
                    .show(move |_| handle.exit(1));
            };

            if let Some(msg) = config_error.clone() {
                fatal(app, msg);
                return Ok(());
            }

            let (event_tx, event_rx) = mpsc::channel(EVENT_CAP);
            let store = TauriSnippetStore::new(app.handle().clone());
            let orchestrator = match typer_orchestrator::startup(
                app_config.startup_options(),
                Box::new(app_config.channel()),
                Box::new(store),
                event_tx,
            ) {
                Ok(o) => o,
                Err(e) => {
                    fatal(app, e.to_string());
                    return Ok(());
                }
            };

            let (tx, rx) = mpsc::channel(COMMAND_CAP);
            app.manage(AppState::new(tx, app_config.clone()));

            tauri::async_runtime::spawn(typer_orchestrator::run(rx, orchestrator));
            tauri::async_runtime::spawn(event_bridge::run(event_rx, app.handle().clone()));

            let window_config = app
                .config()
                .app
                .windows
                .iter()
                .find(|w| w.label == "main")
                .cloned()
                .ok_or("main window missing from tauri.conf.json")?;
            WebviewWindowBuilder::from_config(app.handle(), &window_config)?.build()?;
            tracing::info!("main window created");
            Ok(())
        })
        .on_page_load(|webview, payload| {
            if matches!(payload.event(), PageLoadEvent::Finished) {
                tracing::info!(url = %payload.url(), "main window loaded");
                hotkeys::register_all(webview.app_handle());
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::save_snippets,
            commands::get_snippets,
            commands::trigger_type,
            commands::type_text,
            commands::terminate_typing,
            commands::save_and_type,
            commands::get_status,
            commands::get_hotkey_report
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application");

    app.run(|app, event| {
        if let RunEvent::Exit = event {
            if let Some(state) = app.try_state::<AppState>() {
                let tx = state.tx.clone();
                tauri::async_runtime::block_on(async move {
                    let (done, ack) = oneshot::channel();
                    if tx.send(OrchestratorCommand::Shutdown { done }).await.is_ok() {
                        if tokio::time::timeout(Duration::from_secs(5), ack).await.is_err() {
                            tracing::warn!("orchestrator shutdown timed out");
                        }
                    }
                });
                hotkeys::unregister_all(app);
            }
            tracing::info!("application exited");
        }
    });
}

#[cfg(not(windows))]
fn main() {
    eprintln!("The Snippet Typer desktop shell is built for Windows; use typer_cli on this platform.");
}
