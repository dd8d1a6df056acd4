use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use threadchat_cli::cli::{execute, format::render, load_config, watch, CliCommand};
use threadchat_core::tracing_setup::init_tracing;
use threadchat_core::ChatRuntime;

#[derive(Parser)]
#[command(name = "threadchat")]
#[command(about = "Threaded chat client for a Firestore backend")]
struct Cli {
    /// Pretty-print JSON output
    #[arg(long, short)]
    pretty: bool,

    /// Path to JSON config file (projectId, apiKey, dataDir, pollIntervalMs)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all threads
    Threads,

    /// Show the messages of a thread
    Show {
        /// Thread ID
        thread_id: String,
    },

    /// Create a new thread
    NewThread {
        /// Thread ID (random if omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// Send a message to a thread
    Send {
        /// Thread ID
        thread_id: String,
        /// Message content
        text: String,
    },

    /// Set the title of a thread
    Title {
        /// Thread ID
        thread_id: String,
        /// New title
        title: String,
    },

    /// Log in with an existing account
    Login {
        #[arg(long, short = 'e')]
        email: String,
        #[arg(long)]
        password: String,
    },

    /// Create an account and log in
    Signup {
        #[arg(long, short = 'e')]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, short = 'n')]
        display_name: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the active user and anonymous id
    Whoami,

    /// Follow changes and print the thread list after each one
    Watch,
}

impl From<Commands> for CliCommand {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Threads => CliCommand::Threads,
            Commands::Show { thread_id } => CliCommand::Show { thread_id },
            Commands::NewThread { id } => CliCommand::NewThread { thread_id: id },
            Commands::Send { thread_id, text } => CliCommand::Send { thread_id, text },
            Commands::Title { thread_id, title } => CliCommand::Title { thread_id, title },
            Commands::Login { email, password } => CliCommand::LogIn { email, password },
            Commands::Signup {
                email,
                password,
                display_name,
            } => CliCommand::SignUp {
                email,
                password,
                display_name,
            },
            Commands::Logout => CliCommand::LogOut,
            Commands::Whoami => CliCommand::WhoAmI,
            Commands::Watch => CliCommand::Watch,
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mut runtime = ChatRuntime::from_config(&config)?;
    let pretty = cli.pretty;

    match CliCommand::from(cli.command) {
        CliCommand::Watch => {
            let stop = async {
                let _ = tokio::signal::ctrl_c().await;
            };
            watch(&mut runtime, |value| println!("{}", render(value, pretty)), stop).await
        }
        command => {
            let result = execute(&mut runtime, command).await?;
            println!("{}", render(&result, pretty));
            Ok(())
        }
    }
}
