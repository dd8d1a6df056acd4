pub mod command;
pub mod config;
pub mod format;
pub mod handler;

pub use command::CliCommand;
pub use config::load_config;
pub use handler::{execute, watch};
