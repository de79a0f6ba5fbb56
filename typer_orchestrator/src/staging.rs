use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagingError {
    #[error("helper script not found (looked in: {})", join_paths(.looked))]
    SourceMissing { looked: Vec<PathBuf> },
    #[error("failed to read helper script {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to stage helper script into {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Where the helper script ships: the installed path first, then packaged
/// resource locations.
#[derive(Debug, Clone)]
pub struct HelperSource {
    pub installed: PathBuf,
    pub fallbacks: Vec<PathBuf>,
}

impl HelperSource {
    pub fn new(installed: impl Into<PathBuf>) -> Self {
        Self {
            installed: installed.into(),
            fallbacks: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallbacks.push(path.into());
        self
    }

    fn locations(&self) -> impl Iterator<Item = &PathBuf> {
        std::iter::once(&self.installed).chain(self.fallbacks.iter())
    }
}

/// A helper script copied into a writable location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedHelper {
    path: PathBuf,
    owned: bool,
}

impl StagedHelper {
    /// Wraps a script that is already in place; `remove` will delete it.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            owned: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the staged copy; a script used in place is left alone.
    pub fn remove(&self) -> io::Result<()> {
        if !self.owned {
            return Ok(());
        }
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

pub fn stage_helper(source: &HelperSource, dest_dir: &Path) -> Result<StagedHelper, StagingError> {
    let Some(found) = source.locations().find(|p| p.is_file()) else {
        return Err(StagingError::SourceMissing {
            looked: source.locations().cloned().collect(),
        });
    };
    if found != &source.installed {
        tracing::info!(path = %found.display(), "helper script taken from packaged location");
    }

    let bytes = fs::read(found).map_err(|source| StagingError::Read {
        path: found.clone(),
        source,
    })?;

    let file_name = found
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("typing_helper"));
    let dest = dest_dir.join(file_name);
    if &dest == found {
        return Ok(StagedHelper {
            path: dest,
            owned: false,
        });
    }
    fs::create_dir_all(dest_dir)
        .and_then(|_| fs::write(&dest, &bytes))
        .map_err(|source| StagingError::Write {
            path: dest.clone(),
            source,
        })?;

    tracing::info!(path = %dest.display(), "helper script staged");
    Ok(StagedHelper {
        path: dest,
        owned: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_from_installed_path() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let installed = src_dir.path().join("type_snippet.py");
        fs::write(&installed, "print('hi')").unwrap();

        let staged = stage_helper(&HelperSource::new(&installed), dest_dir.path()).unwrap();
        assert_eq!(staged.path(), dest_dir.path().join("type_snippet.py"));
        assert_eq!(fs::read_to_string(staged.path()).unwrap(), "print('hi')");
    }

    #[test]
    fn falls_back_to_packaged_location() {
        let src_dir = tempfile::tempdir().unwrap();
        let dest_dir = tempfile::tempdir().unwrap();
        let packaged = src_dir.path().join("resources").join("type_snippet.py");
        fs::create_dir_all(packaged.parent().unwrap()).unwrap();
        fs::write(&packaged, "packaged").unwrap();

        let source = HelperSource::new(src_dir.path().join("missing.py")).with_fallback(&packaged);
        let staged = stage_helper(&source, dest_dir.path()).unwrap();
        assert_eq!(fs::read_to_string(staged.path()).unwrap(), "packaged");
    }

    #[test]
    fn missing_everywhere_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = HelperSource::new(dir.path().join("a.py")).with_fallback(dir.path().join("b.py"));
        let err = stage_helper(&source, dir.path()).unwrap_err();
        assert!(matches!(err, StagingError::SourceMissing { ref looked } if looked.len() == 2));
    }

    #[test]
    fn script_already_in_place_is_not_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let installed = dir.path().join("type_snippet.py");
        fs::write(&installed, "x").unwrap();

        let staged = stage_helper(&HelperSource::new(&installed), dir.path()).unwrap();
        staged.remove().unwrap();
        assert!(installed.exists());
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("helper.py");
        fs::write(&path, "x").unwrap();
        let staged = StagedHelper::at(&path);
        staged.remove().unwrap();
        staged.remove().unwrap();
        assert!(!path.exists());
    }
}
