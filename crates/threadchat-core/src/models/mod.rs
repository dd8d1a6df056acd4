pub mod lifecycle;
pub mod message;
pub mod thread;
pub mod user;

pub use lifecycle::Lifecycle;
pub use message::{ConsecutiveMessage, Message};
pub use thread::Thread;
pub use user::User;
