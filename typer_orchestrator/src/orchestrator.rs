use crate::channel::RequestChannel;
use crate::lifecycle;
use crate::process::{self, ActiveRun, REAP_TIMEOUT};
use crate::protocol::{
    OrchestratorCommand, RunState, SnippetSlots, StatusSnapshot, TypingSource, UiEvent, SLOT_COUNT,
};
use crate::runtime::RuntimeResolver;
use crate::staging::StagedHelper;
use crate::store::SnippetStore;
use serde::{Deserialize, Serialize};
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use tokio::sync::mpsc;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

/// What to do with a typing request that arrives while a run is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusyPolicy {
    #[default]
    Reject,
    /// Keep one pending request (newest wins) and launch it after the run.
    QueueLatest,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub grace_period: Duration,
    pub busy_policy: BusyPolicy,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            busy_policy: BusyPolicy::default(),
        }
    }
}

struct TypingRequest {
    text: String,
    source: TypingSource,
}

pub struct Orchestrator {
    channel: Box<dyn RequestChannel>,
    store: Box<dyn SnippetStore>,
    resolver: RuntimeResolver,
    helper: StagedHelper,
    options: OrchestratorOptions,
    events: mpsc::Sender<UiEvent>,

    state: RunState,
    active: Option<ActiveRun>,
    pending: Option<TypingRequest>,
}

impl Orchestrator {
    pub fn new(
        channel: Box<dyn RequestChannel>,
        store: Box<dyn SnippetStore>,
        resolver: RuntimeResolver,
        helper: StagedHelper,
        options: OrchestratorOptions,
        events: mpsc::Sender<UiEvent>,
    ) -> Self {
        Self {
            channel,
            store,
            resolver,
            helper,
            options,
            events,
            state: RunState::Idle,
            active: None,
            pending: None,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            state: self.state,
            active: self.active.as_ref().map(ActiveRun::summary),
            pending: self.pending.is_some(),
        }
    }

    /// Handles everything except `Shutdown`'s exit from the actor loop.
    pub async fn handle(&mut self, cmd: OrchestratorCommand) {
        match cmd {
            OrchestratorCommand::SaveSnippets { snippets } => self.save_snippets(snippets),
            OrchestratorCommand::TypeSlot { index } => self.type_slot(index),
            OrchestratorCommand::TypeText { text } => self.type_text(text),
            OrchestratorCommand::Terminate => self.terminate().await,
            OrchestratorCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            OrchestratorCommand::Shutdown { done } => {
                self.shutdown().await;
                let _ = done.send(());
            }
        }
    }

    pub fn save_snippets(&mut self, snippets: Vec<String>) {
        let slots = SnippetSlots::from_values(snippets);
        let status = match self.store.save(&slots) {
            Ok(()) => {
                tracing::info!(
                    "snippets saved: {}",
                    serde_json::to_string(slots.as_slice()).unwrap_or_default()
                );
                "Snippets have been saved successfully.".to_string()
            }
            Err(e) => {
                tracing::error!("saving snippets failed: {e}");
                format!("Saving snippets failed: {e}")
            }
        };
        self.emit(UiEvent::SnippetsSaved { status });
    }

    pub fn type_slot(&mut self, index: usize) {
        if index >= SLOT_COUNT {
            tracing::warn!(slot = index, "no such snippet slot");
            return;
        }
        let slots = match self.store.load() {
            Ok(slots) => slots,
            Err(e) => {
                tracing::error!(slot = index, "reading snippets failed: {e}");
                self.emit(UiEvent::AutotypingFailed { msg: e.to_string() });
                return;
            }
        };
        let Some(text) = slots.get(index) else {
            tracing::info!(slot = index, "snippet {} not set", index + 1);
            return;
        };
        self.submit(TypingRequest {
            text: text.to_string(),
            source: TypingSource::Slot { index },
        });
    }

    pub fn type_text(&mut self, text: String) {
        if text.is_empty() {
            tracing::info!("empty typing request ignored");
            return;
        }
        self.submit(TypingRequest {
            text,
            source: TypingSource::Text,
        });
    }

    fn submit(&mut self, request: TypingRequest) {
        if self.active.is_none() {
            self.launch(request);
            return;
        }
        match self.options.busy_policy {
            BusyPolicy::Reject => {
                tracing::warn!(source = ?request.source, "typing request rejected: autotyping in progress");
                self.emit(UiEvent::RequestRejected {
                    msg: "autotyping already in progress".to_string(),
                });
            }
            BusyPolicy::QueueLatest => {
                let source = request.source;
                if self.pending.replace(request).is_some() {
                    tracing::info!(?source, "pending typing request replaced");
                } else {
                    tracing::info!(?source, "typing request queued");
                }
            }
        }
    }

    fn launch(&mut self, request: TypingRequest) {
        self.state = RunState::Preparing;

        if let Err(e) = self.channel.publish(&request.text) {
            tracing::error!("writing typing request failed: {e}");
            self.fail(format!("could not write typing request: {e}"));
            return;
        }
        tracing::info!(source = ?request.source, chars = request.text.chars().count(), "typing request written");

        match self.channel.clear_stop() {
            Ok(true) => tracing::info!("removed stale stop signal"),
            Ok(false) => {}
            Err(e) => tracing::warn!("removing stale stop signal failed: {e}"),
        }

        let runtime = match self.resolver.resolve() {
            Ok(rt) => rt.clone(),
            Err(e) => {
                tracing::error!("{e}");
                self.fail(e.to_string());
                return;
            }
        };

        match process::spawn(&runtime, self.helper.path(), &*self.channel, request.source) {
            Ok(run) => {
                tracing::info!(pid = ?run.pid(), runtime = %runtime.program, "typing helper started");
                let event = UiEvent::AutotypingStarted {
                    source: run.source(),
                    pid: run.pid(),
                };
                self.active = Some(run);
                self.state = RunState::Running;
                self.emit(event);
            }
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    self.resolver.invalidate();
                }
                tracing::error!(runtime = %runtime.program, "launching typing helper failed: {e}");
                self.fail(format!("could not launch typing helper: {e}"));
            }
        }
    }

    fn fail(&mut self, msg: String) {
        self.state = RunState::Idle;
        self.emit(UiEvent::AutotypingFailed { msg });
    }

    /// Resolves when the active helper exits; pending forever when idle.
    pub async fn wait_active(&mut self) -> io::Result<ExitStatus> {
        match self.active.as_mut() {
            Some(run) => run.wait().await,
            None => std::future::pending().await,
        }
    }

    pub async fn on_exit(&mut self, status: io::Result<ExitStatus>) {
        let Some(mut run) = self.active.take() else {
            return;
        };
        self.state = RunState::Completing;
        let output = run.collect_output().await;
        let elapsed_ms = run.elapsed().as_millis() as u64;

        let (success, exit_code) = match &status {
            Ok(s) => (s.success(), s.code()),
            Err(_) => (false, None),
        };
        match status {
            Ok(_) if success => {
                tracing::info!(pid = ?run.pid(), elapsed_ms, stdout = %output.stdout, "message typed successfully");
            }
            Ok(s) => {
                tracing::warn!(pid = ?run.pid(), code = ?s.code(), stderr = %output.stderr, "typing helper failed");
            }
            Err(e) => {
                tracing::error!(pid = ?run.pid(), "lost track of typing helper: {e}");
            }
        }
        if success && !output.stderr.is_empty() {
            tracing::debug!(stderr = %output.stderr, "typing helper stderr");
        }

        self.clear_stop_signal();
        self.state = RunState::Idle;
        self.emit(UiEvent::AutotypingStopped { success, exit_code });

        if let Some(next) = self.pending.take() {
            tracing::info!(source = ?next.source, "launching queued typing request");
            self.launch(next);
        }
    }

    /// Stop signal, graceful exit request, grace period, then a forced kill.
    pub async fn terminate(&mut self) {
        let Some(mut run) = self.active.take() else {
            tracing::info!("terminate requested but no autotyping is running");
            return;
        };
        if self.pending.take().is_some() {
            tracing::info!("queued typing request discarded");
        }
        self.state = RunState::ForceStopping;
        let pid = run.pid();
        tracing::info!(?pid, "terminating autotyping");

        if let Err(e) = self.channel.raise_stop() {
            tracing::warn!("writing stop signal failed: {e}");
        }
        if let Err(e) = run.request_exit().await {
            tracing::warn!(?pid, "graceful termination failed: {e}");
        }

        let mut exited = run.wait_for(self.options.grace_period).await;
        if exited.is_none() {
            tracing::warn!(?pid, "typing helper still alive after grace period, killing");
            if let Err(e) = run.force_kill().await {
                tracing::error!(?pid, "killing typing helper failed: {e}");
            }
            exited = run.wait_for(REAP_TIMEOUT).await;
        }
        match exited {
            Some(status) => tracing::info!(?pid, code = ?status.code(), "typing helper ended"),
            None => tracing::warn!(?pid, "typing helper exit could not be confirmed"),
        }
        let output = run.collect_output().await;
        if !output.stderr.is_empty() {
            tracing::debug!(stderr = %output.stderr, "typing helper stderr");
        }

        self.clear_stop_signal();
        self.state = RunState::Idle;
        self.emit(UiEvent::AutotypingTerminated);
    }

    pub async fn shutdown(&mut self) {
        self.pending = None;
        if self.active.is_some() {
            self.terminate().await;
        }
        lifecycle::cleanup(&*self.channel, &self.helper);
        tracing::info!("orchestrator shut down");
    }

    fn clear_stop_signal(&self) {
        if let Err(e) = self.channel.clear_stop() {
            tracing::warn!("removing stop signal failed: {e}");
        }
    }

    fn emit(&self, event: UiEvent) {
        // A full or closed UI queue drops the event.
        if let Err(e) = self.events.try_send(event) {
            tracing::warn!("ui event dropped: {e}");
        }
    }
}

/// Orchestrator actor: every state transition happens on this task.
pub async fn run(mut rx: mpsc::Receiver<OrchestratorCommand>, mut orchestrator: Orchestrator) {
    loop {
        tokio::select! {
            cmd = rx.recv() => {
                match cmd {
                    Some(OrchestratorCommand::Shutdown { done }) => {
                        orchestrator.shutdown().await;
                        let _ = done.send(());
                        return;
                    }
                    Some(cmd) => orchestrator.handle(cmd).await,
                    None => {
                        orchestrator.shutdown().await;
                        return;
                    }
                }
            }
            status = orchestrator.wait_active(), if orchestrator.is_running() => {
                orchestrator.on_exit(status).await;
            }
        }
    }
}
