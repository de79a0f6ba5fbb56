use std::process::{Command, Output, Stdio};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperRuntime {
    pub program: String,
    pub version: String,
}

impl HelperRuntime {
    /// Executable name used by kill-by-name fallbacks (`python.exe` on Windows).
    pub fn image_name(&self) -> String {
        let base = std::path::Path::new(&self.program)
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.clone());
        if cfg!(windows) && !base.to_ascii_lowercase().ends_with(".exe") {
            format!("{base}.exe")
        } else {
            base
        }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no helper runtime found (tried: {})", join_names(.tried))]
    NotFound { tried: Vec<String> },
}

fn join_names(names: &[String]) -> String {
    names.join(", ")
}

pub fn default_candidates() -> Vec<String> {
    let names: &[&str] = if cfg!(windows) {
        &["python", "py", "python3"]
    } else {
        &["python3", "python"]
    };
    names.iter().map(|s| s.to_string()).collect()
}

/// Probes `candidates` in order with `--version`; first success wins.
pub fn discover(candidates: &[String]) -> Result<HelperRuntime, RuntimeError> {
    for program in candidates {
        match probe(program) {
            Ok(version) => {
                tracing::info!(runtime = %program, %version, "helper runtime found");
                return Ok(HelperRuntime {
                    program: program.clone(),
                    version,
                });
            }
            Err(msg) => tracing::debug!(runtime = %program, "probe failed: {msg}"),
        }
    }
    Err(RuntimeError::NotFound {
        tried: candidates.to_vec(),
    })
}

fn probe(program: &str) -> Result<String, String> {
    fn run(program: &str) -> std::io::Result<Output> {
        Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
    }

    let out = run(program).map_err(|e| format!("failed to run {program}: {e}"))?;
    if !out.status.success() {
        return Err(format!("{program} --version exited with {}", out.status));
    }
    // Older interpreters report their version on stderr.
    let stdout = String::from_utf8_lossy(&out.stdout).trim().to_string();
    if !stdout.is_empty() {
        return Ok(stdout);
    }
    Ok(String::from_utf8_lossy(&out.stderr).trim().to_string())
}

/// Caches the discovered runtime for the process lifetime.
pub struct RuntimeResolver {
    candidates: Vec<String>,
    cached: Option<HelperRuntime>,
}

impl RuntimeResolver {
    pub fn new(candidates: Vec<String>) -> Self {
        Self {
            candidates,
            cached: None,
        }
    }

    pub fn with_runtime(candidates: Vec<String>, runtime: HelperRuntime) -> Self {
        Self {
            candidates,
            cached: Some(runtime),
        }
    }

    pub fn resolve(&mut self) -> Result<&HelperRuntime, RuntimeError> {
        if self.cached.is_none() {
            self.cached = Some(discover(&self.candidates)?);
        }
        self.cached.as_ref().ok_or_else(|| RuntimeError::NotFound {
            tried: self.candidates.clone(),
        })
    }

    pub fn cached(&self) -> Option<&HelperRuntime> {
        self.cached.as_ref()
    }

    /// Forces the next `resolve` to probe again.
    pub fn invalidate(&mut self) {
        if let Some(old) = self.cached.take() {
            tracing::warn!(runtime = %old.program, "helper runtime invalidated");
        }
    }
}
