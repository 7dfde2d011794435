//! Switchboard CLI - Database migrations and account management.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! sb-cli migrate
//!
//! # Create a user (password from SWITCHBOARD_NEW_USER_PASSWORD)
//! sb-cli user create -e alice@example.com -n "Alice"
//!
//! # List stored users
//! sb-cli user list
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sb-cli")]
#[command(author, version, about = "Switchboard CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage stored users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// List stored users
    List,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create { email, name } => {
                commands::user::create(&email, &name).await?;
            }
            UserAction::List => commands::user::list().await?,
        },
    }
    Ok(())
}
