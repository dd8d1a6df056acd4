pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod models;
pub mod remote;
pub mod runtime;
pub mod storage;
pub mod store;
pub mod tracing_setup;
pub mod watcher;

// Re-export the types most callers need at crate root
pub use config::ChatConfig;
pub use models::{Lifecycle, Message, Thread, User};
pub use runtime::ChatRuntime;
pub use store::{Action, AppState, Reconciler, RemoteWrite};
