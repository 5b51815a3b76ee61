//! Lineup CLI - Database migrations and account management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! lineup-cli migrate
//!
//! # Create a user account
//! lineup-cli user create -e owner@example.com -p "a strong password"
//!
//! # Delete an account and everything it owns
//! lineup-cli wipe --user-id 42
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create a user account
//! - `wipe` - Delete an account, its rows, and its stored objects

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "lineup-cli")]
#[command(author, version, about = "Lineup CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Delete an account and everything it owns
    Wipe {
        /// Id of the account to delete
        #[arg(long)]
        user_id: i32,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new user account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Password (min 8 characters)
        #[arg(short, long)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
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
            UserAction::Create { email, password } => {
                commands::user::create(&email, &password).await?;
            }
        },
        Commands::Wipe { user_id } => commands::wipe::run(user_id).await?,
    }
    Ok(())
}
