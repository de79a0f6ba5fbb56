use std::sync::{Arc, Mutex};
use thiserror::Error;
use typer_protocol::SnippetSlots;

#[derive(Debug, Error)]
#[error("snippet store: {0}")]
pub struct StoreError(pub String);

/// Persistent home of the snippet slots (the `"snippets"` key).
pub trait SnippetStore: Send {
    fn load(&self) -> Result<SnippetSlots, StoreError>;
    fn save(&self, slots: &SnippetSlots) -> Result<(), StoreError>;
}

impl<T: SnippetStore + Sync + ?Sized> SnippetStore for Arc<T> {
    fn load(&self) -> Result<SnippetSlots, StoreError> {
        (**self).load()
    }

    fn save(&self, slots: &SnippetSlots) -> Result<(), StoreError> {
        (**self).save(slots)
    }
}

/// Non-persistent store, for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryStore {
    slots: Mutex<SnippetSlots>,
}

impl MemoryStore {
    pub fn new(slots: SnippetSlots) -> Self {
        Self {
            slots: Mutex::new(slots),
        }
    }
}

impl SnippetStore for MemoryStore {
    fn load(&self) -> Result<SnippetSlots, StoreError> {
        self.slots
            .lock()
            .map(|g| g.clone())
            .map_err(|_| StoreError("store lock poisoned".to_string()))
    }

    fn save(&self, slots: &SnippetSlots) -> Result<(), StoreError> {
        *self
            .slots
            .lock()
            .map_err(|_| StoreError("store lock poisoned".to_string()))? = slots.clone();
        Ok(())
    }
}
