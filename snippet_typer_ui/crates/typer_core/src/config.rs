use crate::hotkeys::{self, HotkeyBinding};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use typer_orchestrator::{
    BusyPolicy, FsRequestChannel, HelperSource, OrchestratorOptions, StartupOptions,
};

pub const CONFIG_FILE_NAME: &str = "snippet_typer.json";
pub const HELPER_SCRIPT_NAME: &str = "type_snippet.py";
pub const STORE_FILE_NAME: &str = "snippet_store.json";

pub const ENV_RUNTIME: &str = "SNIPPET_TYPER_RUNTIME";
pub const ENV_HELPER: &str = "SNIPPET_TYPER_HELPER";
pub const ENV_CHANNEL_DIR: &str = "SNIPPET_TYPER_CHANNEL_DIR";
pub const ENV_LOG_DIR: &str = "SNIPPET_TYPER_LOG_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_runtime_candidates() -> Vec<String> {
    typer_orchestrator::runtime::default_candidates()
}
fn default_helper_script() -> PathBuf {
    exe_dir().join(HELPER_SCRIPT_NAME)
}
fn default_helper_fallbacks() -> Vec<PathBuf> {
    vec![
        exe_dir().join("resources").join(HELPER_SCRIPT_NAME),
        PathBuf::from(HELPER_SCRIPT_NAME),
    ]
}
fn default_grace_period_ms() -> u64 {
    500
}
fn default_persist_snippets() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_runtime_candidates")]
    pub runtime_candidates: Vec<String>,

    #[serde(default = "default_helper_script")]
    pub helper_script: PathBuf,

    /// Packaged locations tried when `helper_script` does not exist.
    #[serde(default = "default_helper_fallbacks")]
    pub helper_fallbacks: Vec<PathBuf>,

    /// Directory holding the request and stop files; the OS temp dir if unset.
    #[serde(default)]
    pub channel_dir: Option<PathBuf>,

    #[serde(default)]
    pub staging_dir: Option<PathBuf>,

    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// JSON snippet store used outside the desktop app.
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    #[serde(default)]
    pub busy_policy: BusyPolicy,

    #[serde(default = "default_persist_snippets")]
    pub persist_snippets: bool,

    #[serde(default = "hotkeys::default_bindings")]
    pub hotkeys: Vec<HotkeyBinding>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            runtime_candidates: default_runtime_candidates(),
            helper_script: default_helper_script(),
            helper_fallbacks: default_helper_fallbacks(),
            channel_dir: None,
            staging_dir: None,
            log_dir: None,
            store_path: None,
            grace_period_ms: default_grace_period_ms(),
            busy_policy: BusyPolicy::default(),
            persist_snippets: default_persist_snippets(),
            hotkeys: hotkeys::default_bindings(),
        }
    }
}

/// `snippet_typer.json` next to the executable.
pub fn config_path() -> PathBuf {
    exe_dir().join(CONFIG_FILE_NAME)
}

/// A missing file yields defaults; an unreadable or malformed one is an error.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no config file, using defaults");
            return Ok(AppConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl AppConfig {
    /// `load_config` followed by the `SNIPPET_TYPER_*` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut cfg = load_config(path)?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(list) = get(ENV_RUNTIME) {
            let candidates: Vec<String> = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            if !candidates.is_empty() {
                self.runtime_candidates = candidates;
            }
        }
        if let Some(path) = get(ENV_HELPER) {
            self.helper_script = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_CHANNEL_DIR) {
            self.channel_dir = Some(PathBuf::from(path));
        }
        if let Some(path) = get(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(path));
        }
    }

    pub fn channel_dir(&self) -> PathBuf {
        self.channel_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("snippet_typer"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| exe_dir().join("logs"))
    }

    pub fn store_path(&self) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| exe_dir().join(STORE_FILE_NAME))
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn channel(&self) -> FsRequestChannel {
        FsRequestChannel::new(self.channel_dir())
    }

    pub fn helper_source(&self) -> HelperSource {
        self.helper_fallbacks
            .iter()
            .fold(HelperSource::new(&self.helper_script), |src, p| src.with_fallback(p))
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            grace_period: self.grace_period(),
            busy_policy: self.busy_policy,
        }
    }

    pub fn startup_options(&self) -> StartupOptions {
        StartupOptions {
            runtime_candidates: self.runtime_candidates.clone(),
            helper: self.helper_source(),
            staging_dir: self.staging_dir(),
            persist_snippets: self.persist_snippets,
            orchestrator: self.orchestrator_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use typer_protocol::HotkeyAction;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(cfg.grace_period(), Duration::from_millis(500));
        assert_eq!(cfg.busy_policy, BusyPolicy::Reject);
        assert!(cfg.persist_snippets);
        assert_eq!(cfg.hotkeys, hotkeys::default_bindings());
        assert_eq!(cfg.channel_dir(), std::env::temp_dir());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{
                "grace_period_ms": 250,
                "busy_policy": "queue_latest",
                "persist_snippets": false,
                "hotkeys": [
                    { "accelerator": "Control+Alt+Z", "type": "type_text", "text": "wrong key" }
                ]
            }"#,
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.grace_period_ms, 250);
        assert_eq!(cfg.busy_policy, BusyPolicy::QueueLatest);
        assert!(!cfg.persist_snippets);
        assert_eq!(cfg.runtime_candidates, default_runtime_candidates());
        assert_eq!(
            cfg.hotkeys[0].action,
            HotkeyAction::TypeText {
                text: "wrong key".to_string()
            }
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_RUNTIME, " python3.12 , python3 ,"),
            (ENV_HELPER, "/opt/typer/type_snippet.py"),
            (ENV_CHANNEL_DIR, "/tmp/typer-chan"),
            (ENV_LOG_DIR, "   "),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.runtime_candidates, ["python3.12", "python3"]);
        assert_eq!(cfg.helper_script, PathBuf::from("/opt/typer/type_snippet.py"));
        assert_eq!(cfg.channel_dir(), PathBuf::from("/tmp/typer-chan"));
        assert!(cfg.log_dir.is_none());
    }

    #[test]
    fn helper_source_lists_fallbacks_in_order() {
        let cfg = AppConfig {
            helper_script: PathBuf::from("a.py"),
            helper_fallbacks: vec![PathBuf::from("b.py"), PathBuf::from("c.py")],
            ..AppConfig::default()
        };
        let src = cfg.helper_source();
        assert_eq!(src.installed, PathBuf::from("a.py"));
        assert_eq!(src.fallbacks, [PathBuf::from("b.py"), PathBuf::from("c.py")]);
    }
}
