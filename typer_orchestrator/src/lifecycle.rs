use crate::channel::RequestChannel;
use crate::orchestrator::{Orchestrator, OrchestratorOptions};
use crate::protocol::{SnippetSlots, UiEvent};
use crate::runtime::{self, RuntimeError, RuntimeResolver};
use crate::staging::{self, HelperSource, StagedHelper, StagingError};
use crate::store::{SnippetStore, StoreError};
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Fatal startup conditions. The shell reports these and exits without
/// showing its main window.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("missing dependency: {0}")]
    MissingRuntime(#[from] RuntimeError),
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error("failed to prepare the request channel: {0}")]
    Channel(#[source] io::Error),
    #[error("failed to reset snippets: {0}")]
    Store(#[from] StoreError),
}

pub struct StartupOptions {
    pub runtime_candidates: Vec<String>,
    pub helper: HelperSource,
    pub staging_dir: PathBuf,
    /// When false the snippet slots are emptied on every start.
    pub persist_snippets: bool,
    pub orchestrator: OrchestratorOptions,
}

/// Runtime discovery, helper staging and channel reset, in that order.
pub fn startup(
    options: StartupOptions,
    channel: Box<dyn RequestChannel>,
    store: Box<dyn SnippetStore>,
    events: mpsc::Sender<UiEvent>,
) -> Result<Orchestrator, StartupError> {
    let runtime = runtime::discover(&options.runtime_candidates)?;
    let helper = staging::stage_helper(&options.helper, &options.staging_dir)?;
    channel.reset().map_err(StartupError::Channel)?;

    if !options.persist_snippets {
        store.save(&SnippetSlots::empty())?;
        tracing::info!("snippet slots cleared for this session");
    }

    tracing::info!(
        runtime = %runtime.program,
        version = %runtime.version,
        helper = %helper.path().display(),
        "startup complete"
    );
    Ok(Orchestrator::new(
        channel,
        store,
        RuntimeResolver::with_runtime(options.runtime_candidates, runtime),
        helper,
        options.orchestrator,
        events,
    ))
}

/// Removes channel files and the staged helper. Failures are logged only.
pub fn cleanup(channel: &dyn RequestChannel, helper: &StagedHelper) {
    for (path, e) in channel.teardown() {
        tracing::warn!(path = %path.display(), "cleanup failed: {e}");
    }
    if let Err(e) = helper.remove() {
        tracing::warn!(path = %helper.path().display(), "removing staged helper failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::FsRequestChannel;
    use crate::store::MemoryStore;
    use std::fs;
    use std::sync::Arc;

    fn options(helper: HelperSource, staging_dir: PathBuf, candidates: Vec<String>) -> StartupOptions {
        StartupOptions {
            runtime_candidates: candidates,
            helper,
            staging_dir,
            persist_snippets: true,
            orchestrator: OrchestratorOptions::default(),
        }
    }

    #[test]
    fn missing_runtime_is_reported_as_missing_dependency() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel(4);
        let err = startup(
            options(
                HelperSource::new(dir.path().join("helper.py")),
                dir.path().join("stage"),
                vec!["definitely-not-a-runtime".to_string()],
            ),
            Box::new(FsRequestChannel::new(dir.path())),
            Box::new(MemoryStore::default()),
            tx,
        )
        .err()
        .expect("startup should fail");
        assert!(matches!(err, StartupError::MissingRuntime(_)));
        assert!(err.to_string().starts_with("missing dependency"));
    }

    #[cfg(unix)]
    #[test]
    fn missing_helper_script_fails_after_runtime_check() {
        let dir = tempfile::tempdir().unwrap();
        let (tx, _rx) = mpsc::channel(4);
        let err = startup(
            options(
                HelperSource::new(dir.path().join("nowhere.py")),
                dir.path().join("stage"),
                vec!["true".to_string()],
            ),
            Box::new(FsRequestChannel::new(dir.path())),
            Box::new(MemoryStore::default()),
            tx,
        )
        .err()
        .expect("startup should fail");
        assert!(matches!(err, StartupError::Staging(StagingError::SourceMissing { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn startup_resets_channel_and_optionally_clears_snippets() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("helper.py");
        fs::write(&script, "pass").unwrap();
        let channel = FsRequestChannel::new(dir.path().join("chan"));
        fs::create_dir_all(channel.dir()).unwrap();
        fs::write(channel.stop_path(), "").unwrap();

        let store = Arc::new(MemoryStore::new(SnippetSlots::from_values(vec![
            "keep?".to_string(),
        ])));
        let mut opts = options(
            HelperSource::new(&script),
            dir.path().join("stage"),
            vec!["true".to_string()],
        );
        opts.persist_snippets = false;

        let (tx, _rx) = mpsc::channel(4);
        let orch = startup(opts, Box::new(channel.clone()), Box::new(Arc::clone(&store)), tx).unwrap();
        assert!(!orch.is_running());
        assert!(!channel.stop_raised());
        assert_eq!(fs::read_to_string(channel.request_path()).unwrap(), "");
        assert!(dir.path().join("stage").join("helper.py").exists());
        assert_eq!(store.load().unwrap(), SnippetSlots::empty());
    }
}
