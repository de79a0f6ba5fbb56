pub mod config;
pub mod hotkeys;
pub mod logging;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use hotkeys::{Dispatch, HotkeyBinding, RegistrationReport};
pub use store::JsonSnippetStore;

pub mod protocol {
    pub use typer_orchestrator::protocol::*;
}
