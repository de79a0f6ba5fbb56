use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use typer_orchestrator::protocol::{RunState, StatusSnapshot, TypingSource, UiEvent, COMMAND_CAP, EVENT_CAP};
use typer_orchestrator::{
    FsRequestChannel, HelperSource, MemoryStore, OrchestratorCommand, OrchestratorOptions,
    RequestChannel, SnippetStore, StartupOptions,
};

struct Session {
    tx: mpsc::Sender<OrchestratorCommand>,
    events: mpsc::Receiver<UiEvent>,
    channel: FsRequestChannel,
    store: Arc<MemoryStore>,
    staged: PathBuf,
    actor: JoinHandle<()>,
    _dir: TempDir,
}

impl Session {
    async fn start(settings: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("mock_script.cfg");
        fs::write(&script, settings).unwrap();

        let channel = FsRequestChannel::new(dir.path().join("chan"));
        let store = Arc::new(MemoryStore::default());
        let (event_tx, events) = mpsc::channel(EVENT_CAP);
        let orchestrator = typer_orchestrator::startup(
            StartupOptions {
                runtime_candidates: vec![env!("CARGO_BIN_EXE_mock_helper").to_string()],
                helper: HelperSource::new(&script),
                staging_dir: dir.path().join("stage"),
                persist_snippets: true,
                orchestrator: OrchestratorOptions::default(),
            },
            Box::new(channel.clone()),
            Box::new(Arc::clone(&store)),
            event_tx,
        )
        .expect("startup with mock helper");

        let (tx, rx) = mpsc::channel(COMMAND_CAP);
        let actor = tokio::spawn(typer_orchestrator::run(rx, orchestrator));
        Self {
            tx,
            events,
            channel,
            store,
            staged: dir.path().join("stage").join("mock_script.cfg"),
            actor,
            _dir: dir,
        }
    }

    async fn send(&self, cmd: OrchestratorCommand) {
        self.tx.send(cmd).await.expect("actor alive");
    }

    async fn save(&mut self, values: &[&str]) {
        self.send(OrchestratorCommand::SaveSnippets {
            snippets: values.iter().map(|s| s.to_string()).collect(),
        })
        .await;
        assert!(matches!(self.next_event().await, UiEvent::SnippetsSaved { .. }));
    }

    async fn next_event(&mut self) -> UiEvent {
        tokio::time::timeout(Duration::from_secs(10), self.events.recv())
            .await
            .expect("event within timeout")
            .expect("event channel open")
    }

    async fn no_event_for(&mut self, wait: Duration) {
        if let Ok(Some(ev)) = tokio::time::timeout(wait, self.events.recv()).await {
            panic!("unexpected event: {ev:?}");
        }
    }

    async fn status(&self) -> StatusSnapshot {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Status { reply }).await;
        rx.await.expect("status reply")
    }

    async fn shutdown(self) -> (FsRequestChannel, PathBuf) {
        let (done, rx) = oneshot::channel();
        self.send(OrchestratorCommand::Shutdown { done }).await;
        rx.await.expect("shutdown ack");
        self.actor.await.expect("actor exits cleanly");
        (self.channel, self.staged)
    }

    fn request_text(&self) -> String {
        fs::read_to_string(self.channel.request_path()).unwrap()
    }

    fn typed_text(&self) -> Option<String> {
        fs::read_to_string(self.channel.dir().join("mock_typed.txt")).ok()
    }
}

#[tokio::test]
async fn typing_a_slot_publishes_the_request_and_reports_success() {
    let mut s = Session::start("").await;
    s.save(&["Hello", "", "World"]).await;

    s.send(OrchestratorCommand::TypeSlot { index: 0 }).await;
    assert!(matches!(
        s.next_event().await,
        UiEvent::AutotypingStarted {
            source: TypingSource::Slot { index: 0 },
            ..
        }
    ));
    assert_eq!(
        s.next_event().await,
        UiEvent::AutotypingStopped {
            success: true,
            exit_code: Some(0)
        }
    );
    assert_eq!(s.request_text(), "Hello");
    assert_eq!(s.typed_text().as_deref(), Some("Hello"));
    assert_eq!(s.status().await.state, RunState::Idle);
    s.shutdown().await;
}

#[tokio::test]
async fn empty_slot_does_nothing() {
    let mut s = Session::start("").await;
    s.save(&["Hello", "", "World"]).await;

    s.send(OrchestratorCommand::TypeSlot { index: 1 }).await;
    s.no_event_for(Duration::from_millis(300)).await;
    assert_eq!(s.request_text(), "");
    assert!(s.status().await.active.is_none());
    s.shutdown().await;
}

#[tokio::test]
async fn helper_failure_is_reported_with_exit_code() {
    let mut s = Session::start("exit_code=4\n").await;
    s.send(OrchestratorCommand::TypeText {
        text: "doomed".to_string(),
    })
    .await;
    assert!(matches!(s.next_event().await, UiEvent::AutotypingStarted { .. }));
    assert_eq!(
        s.next_event().await,
        UiEvent::AutotypingStopped {
            success: false,
            exit_code: Some(4)
        }
    );
    s.shutdown().await;
}

#[tokio::test]
async fn busy_request_is_rejected_and_terminate_ends_the_run() {
    let mut s = Session::start("char_delay_ms=100\n").await;
    s.save(&["a snippet that takes a while to type", "", ""]).await;

    s.send(OrchestratorCommand::TypeSlot { index: 0 }).await;
    assert!(matches!(s.next_event().await, UiEvent::AutotypingStarted { .. }));

    s.send(OrchestratorCommand::TypeText {
        text: "intruder".to_string(),
    })
    .await;
    assert!(matches!(s.next_event().await, UiEvent::RequestRejected { .. }));
    assert_eq!(s.request_text(), "a snippet that takes a while to type");
    assert_eq!(s.status().await.state, RunState::Running);

    s.send(OrchestratorCommand::Terminate).await;
    assert_eq!(s.next_event().await, UiEvent::AutotypingTerminated);
    s.no_event_for(Duration::from_millis(300)).await;

    assert!(!s.channel.stop_raised());
    let status = s.status().await;
    assert_eq!(status.state, RunState::Idle);
    assert!(status.active.is_none());
    s.shutdown().await;
}

#[tokio::test]
async fn terminate_while_idle_is_a_noop() {
    let mut s = Session::start("").await;
    s.send(OrchestratorCommand::Terminate).await;
    s.no_event_for(Duration::from_millis(300)).await;
    assert_eq!(s.status().await.state, RunState::Idle);
    s.shutdown().await;
}

#[tokio::test]
async fn snippets_survive_in_the_store() {
    let mut s = Session::start("").await;
    s.save(&["one", "two", "three", "four"]).await;
    assert_eq!(s.store.load().unwrap().as_slice(), ["one", "two", "three"]);
    s.shutdown().await;
}

#[tokio::test]
async fn shutdown_removes_channel_files_and_staged_helper() {
    let mut s = Session::start("char_delay_ms=100\n").await;
    s.send(OrchestratorCommand::TypeText {
        text: "long enough to still be running".to_string(),
    })
    .await;
    assert!(matches!(s.next_event().await, UiEvent::AutotypingStarted { .. }));
    assert!(s.staged.exists());

    let (channel, staged) = s.shutdown().await;
    assert!(!channel.request_path().exists());
    assert!(!channel.stop_raised());
    assert!(!staged.exists());
}

#[tokio::test]
async fn dropping_every_sender_shuts_the_actor_down() {
    let s = Session::start("").await;
    let Session {
        tx,
        channel,
        actor,
        _dir,
        ..
    } = s;
    drop(tx);
    tokio::time::timeout(Duration::from_secs(10), actor)
        .await
        .expect("actor stops")
        .expect("actor exits cleanly");
    assert!(!channel.request_path().exists());
}
