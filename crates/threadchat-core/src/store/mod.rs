pub mod actions;
pub mod app_state;
pub mod reconciler;
pub mod views;

pub use actions::{Action, RemoteWrite};
pub use app_state::AppState;
pub use reconciler::{Reconciler, Transition};
pub use views::{message_views, thread_summaries, MessageView, ThreadSummary};

/// Current time in milliseconds since the Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
