/// Command parsed from the arguments, independent of clap
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// List threads with a preview of the last message
    Threads,
    /// Show the messages of one thread
    Show { thread_id: String },
    /// Create a thread, with a generated id unless one is given
    NewThread { thread_id: Option<String> },
    /// Append a message as the implicit sender
    Send { thread_id: String, text: String },
    /// Rename a thread
    Title { thread_id: String, title: String },
    LogIn { email: String, password: String },
    SignUp {
        email: String,
        password: String,
        display_name: String,
    },
    LogOut,
    /// Report the active user and the anonymous id
    WhoAmI,
    /// Follow both change feeds and print the thread list after each change
    Watch,
}

impl CliCommand {
    /// Whether the command is meaningful when the initial load failed
    pub fn needs_remote_data(&self) -> bool {
        !matches!(self, CliCommand::LogOut | CliCommand::WhoAmI)
    }
}
