use crate::channel::RequestChannel;
use crate::runtime::HelperRuntime;
use std::io;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use typer_protocol::{ActiveRunSummary, TypingSource};

/// How long a killed helper gets to be reaped before we stop waiting.
pub const REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// The single in-flight helper invocation.
pub struct ActiveRun {
    child: Child,
    pid: Option<u32>,
    runtime: HelperRuntime,
    source: TypingSource,
    started_at: Instant,
    started_wall: SystemTime,
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
}

#[derive(Debug, Default)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

impl ActiveRun {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn runtime(&self) -> &HelperRuntime {
        &self.runtime
    }

    pub fn source(&self) -> TypingSource {
        self.source
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn summary(&self) -> ActiveRunSummary {
        ActiveRunSummary {
            pid: self.pid,
            runtime: self.runtime.program.clone(),
            source: self.source,
            started_at_ms: self
                .started_wall
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }

    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Waits at most `limit` for the helper to exit.
    pub async fn wait_for(&mut self, limit: Duration) -> Option<ExitStatus> {
        match tokio::time::timeout(limit, self.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                tracing::warn!(pid = ?self.pid, "waiting on helper failed: {e}");
                None
            }
            Err(_) => None,
        }
    }

    /// Joins the output readers; call after the process has exited.
    pub async fn collect_output(&mut self) -> CapturedOutput {
        CapturedOutput {
            stdout: join_reader(self.stdout.take()).await,
            stderr: join_reader(self.stderr.take()).await,
        }
    }

    /// Asks the helper to exit: SIGTERM on Unix, a plain `taskkill` on Windows.
    pub async fn request_exit(&self) -> io::Result<()> {
        let Some(pid) = self.pid else {
            return Ok(());
        };
        let pid = pid.to_string();
        let out = if cfg!(windows) {
            Command::new("taskkill").args(["/PID", &pid]).output().await?
        } else {
            Command::new("kill").args(["-TERM", &pid]).output().await?
        };
        if out.status.success() {
            Ok(())
        } else {
            Err(command_error("graceful termination", &out))
        }
    }

    /// Kills the helper outright. On Windows a kill by pid that fails falls
    /// back to killing every process with the runtime's image name.
    pub async fn force_kill(&mut self) -> io::Result<()> {
        if cfg!(windows) {
            let Some(pid) = self.pid else {
                return Ok(());
            };
            let by_pid = Command::new("taskkill")
                .args(["/F", "/PID", &pid.to_string()])
                .output()
                .await?;
            if by_pid.status.success() {
                return Ok(());
            }
            tracing::warn!(pid, "{}", command_error("kill by pid", &by_pid));
            let image = self.runtime.image_name();
            let by_name = Command::new("taskkill")
                .args(["/F", "/IM", &image])
                .output()
                .await?;
            if by_name.status.success() {
                Ok(())
            } else {
                Err(command_error("kill by name", &by_name))
            }
        } else {
            self.child.start_kill()
        }
    }
}

pub fn spawn(
    runtime: &HelperRuntime,
    script: &Path,
    channel: &dyn RequestChannel,
    source: TypingSource,
) -> io::Result<ActiveRun> {
    let mut cmd = Command::new(&runtime.program);
    cmd.arg(script)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    channel.configure(&mut cmd);

    let mut child = cmd.spawn()?;
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    Ok(ActiveRun {
        pid: child.id(),
        child,
        runtime: runtime.clone(),
        source,
        started_at: Instant::now(),
        started_wall: SystemTime::now(),
        stdout,
        stderr,
    })
}

fn spawn_reader<R>(mut reader: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).trim().to_string()
    })
}

async fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    let Some(handle) = handle else {
        return String::new();
    };
    // A grandchild holding the pipe open must not stall the orchestrator.
    match tokio::time::timeout(Duration::from_millis(500), handle).await {
        Ok(Ok(text)) => text,
        _ => String::new(),
    }
}

fn command_error(what: &str, out: &std::process::Output) -> io::Error {
    let stderr = String::from_utf8_lossy(&out.stderr);
    let msg = stderr.trim();
    io::Error::new(
        io::ErrorKind::Other,
        if msg.is_empty() {
            format!("{what} failed: {}", out.status)
        } else {
            format!("{what} failed: {msg}")
        },
    )
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::channel::FsRequestChannel;
    use std::fs;

    fn sh() -> HelperRuntime {
        HelperRuntime {
            program: "sh".to_string(),
            version: String::new(),
        }
    }

    #[tokio::test]
    async fn spawn_captures_output_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("helper.sh");
        fs::write(&script, "echo typed; echo oops >&2; exit 3\n").unwrap();
        let channel = FsRequestChannel::new(dir.path());

        let mut run = spawn(&sh(), &script, &channel, TypingSource::Text).unwrap();
        assert!(run.pid().is_some());
        let status = run.wait().await.unwrap();
        assert_eq!(status.code(), Some(3));

        let out = run.collect_output().await;
        assert_eq!(out.stdout, "typed");
        assert_eq!(out.stderr, "oops");
    }

    #[tokio::test]
    async fn helper_sees_channel_dir_as_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("helper.sh");
        fs::write(&script, "cat \"$TMPDIR/snippet_temp.txt\"\n").unwrap();
        let channel = FsRequestChannel::new(dir.path());
        channel.publish("from the channel").unwrap();

        let mut run = spawn(&sh(), &script, &channel, TypingSource::Text).unwrap();
        run.wait().await.unwrap();
        assert_eq!(run.collect_output().await.stdout, "from the channel");
    }

    #[tokio::test]
    async fn request_exit_terminates_cooperative_process() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("helper.sh");
        fs::write(&script, "exec sleep 30\n").unwrap();
        let channel = FsRequestChannel::new(dir.path());

        let mut run = spawn(&sh(), &script, &channel, TypingSource::Text).unwrap();
        run.request_exit().await.unwrap();
        let status = run.wait_for(Duration::from_secs(5)).await;
        assert!(status.is_some_and(|s| !s.success()));
    }

    #[test]
    fn spawn_with_missing_runtime_is_not_found() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let _guard = rt.enter();
        let dir = tempfile::tempdir().unwrap();
        let channel = FsRequestChannel::new(dir.path());
        let runtime = HelperRuntime {
            program: "definitely-not-a-runtime".to_string(),
            version: String::new(),
        };
        let err = spawn(&runtime, &dir.path().join("x"), &channel, TypingSource::Text)
            .err()
            .expect("spawn should fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
