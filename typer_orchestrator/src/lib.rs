//! Snippet typing orchestration: request channel, helper process
//! lifecycle and the single-run state machine that ties them together.

pub mod channel;
pub mod lifecycle;
pub mod orchestrator;
pub mod process;
pub mod protocol;
pub mod runtime;
pub mod staging;
pub mod store;

pub use channel::{FsRequestChannel, RequestChannel};
pub use lifecycle::{startup, StartupError, StartupOptions};
pub use orchestrator::{run, BusyPolicy, Orchestrator, OrchestratorOptions, DEFAULT_GRACE_PERIOD};
pub use protocol::OrchestratorCommand;
pub use runtime::{HelperRuntime, RuntimeError, RuntimeResolver};
pub use staging::{HelperSource, StagedHelper, StagingError};
pub use store::{MemoryStore, SnippetStore, StoreError};
