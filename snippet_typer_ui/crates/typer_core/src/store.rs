use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use typer_orchestrator::{SnippetStore, StoreError};
use typer_protocol::{SnippetSlots, SNIPPETS_KEY};

/// Snippets kept under the `"snippets"` key of a JSON object file. Other keys
/// in the file are preserved on save.
pub struct JsonSnippetStore {
    path: PathBuf,
}

impl JsonSnippetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_object(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)
            .map_err(|e| StoreError(format!("failed reading {}: {e}", self.path.display())))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
            Err(e) => Err(StoreError(format!(
                "failed parsing {}: {e}",
                self.path.display()
            ))),
        }
    }
}

impl SnippetStore for JsonSnippetStore {
    fn load(&self) -> Result<SnippetSlots, StoreError> {
        match self.read_object()?.remove(SNIPPETS_KEY) {
            None | Some(Value::Null) => Ok(SnippetSlots::empty()),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError(format!("invalid snippets: {e}"))),
        }
    }

    fn save(&self, slots: &SnippetSlots) -> Result<(), StoreError> {
        let mut object = self.read_object()?;
        let value = serde_json::to_value(slots).map_err(|e| StoreError(e.to_string()))?;
        object.insert(SNIPPETS_KEY.to_string(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError(e.to_string()))?;
        }
        let content =
            serde_json::to_string_pretty(&Value::Object(object)).map_err(|e| StoreError(e.to_string()))?;
        fs::write(&self.path, content)
            .map_err(|e| StoreError(format!("failed writing {}: {e}", self.path.display())))
    }
}
