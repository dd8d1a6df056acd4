pub mod local;
pub mod session;

pub use local::{FileStorage, LocalStorage, MemoryStorage, StorageError};
pub use session::{SessionRecord, SessionStore};
