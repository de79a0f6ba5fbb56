use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use typer_protocol::{REQUEST_FILE_NAME, STOP_FILE_NAME};

/// Transport between the orchestrator and the typing helper: the request
/// text goes out, the stop signal goes out, nothing comes back.
pub trait RequestChannel: Send {
    /// Replaces the pending request with `text`.
    fn publish(&self, text: &str) -> io::Result<()>;
    fn raise_stop(&self) -> io::Result<()>;
    /// Returns whether a stop signal was present.
    fn clear_stop(&self) -> io::Result<bool>;
    fn stop_raised(&self) -> bool;
    /// Creates an empty request and drops any stale stop signal.
    fn reset(&self) -> io::Result<()>;
    /// Removes every artifact; each failure is returned, none aborts the rest.
    fn teardown(&self) -> Vec<(PathBuf, io::Error)>;
    /// Points a helper invocation at this channel.
    fn configure(&self, cmd: &mut tokio::process::Command);
}

/// File-based channel: `snippet_temp.txt` and `autotyper_stop.txt` in `dir`.
#[derive(Debug, Clone)]
pub struct FsRequestChannel {
    dir: PathBuf,
    request_path: PathBuf,
    stop_path: PathBuf,
}

impl FsRequestChannel {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            request_path: dir.join(REQUEST_FILE_NAME),
            stop_path: dir.join(STOP_FILE_NAME),
            dir,
        }
    }

    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn request_path(&self) -> &Path {
        &self.request_path
    }

    pub fn stop_path(&self) -> &Path {
        &self.stop_path
    }
}

impl RequestChannel for FsRequestChannel {
    fn publish(&self, text: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let staging = self.request_path.with_extension("txt.partial");
        fs::write(&staging, text.as_bytes())?;
        fs::rename(&staging, &self.request_path)
    }

    fn raise_stop(&self) -> io::Result<()> {
        fs::write(&self.stop_path, b"")
    }

    fn clear_stop(&self) -> io::Result<bool> {
        match fs::remove_file(&self.stop_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn stop_raised(&self) -> bool {
        self.stop_path.exists()
    }

    fn reset(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(&self.request_path, b"")?;
        if self.clear_stop()? {
            tracing::info!(path = %self.stop_path.display(), "removed stale stop signal");
        }
        Ok(())
    }

    fn teardown(&self) -> Vec<(PathBuf, io::Error)> {
        let mut failures = Vec::new();
        for path in [&self.request_path, &self.stop_path] {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => failures.push((path.clone(), e)),
            }
        }
        failures
    }

    fn configure(&self, cmd: &mut tokio::process::Command) {
        // Helpers resolve both files from their temp directory.
        cmd.env("TMPDIR", &self.dir)
            .env("TEMP", &self.dir)
            .env("TMP", &self.dir);
    }
}
