//! Shopping cart CLI - database migrations and developer tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply cart store migrations (CART_DATABASE_URL / DATABASE_URL)
//! cart-cli migrate
//!
//! # Apply migrations to an explicit database
//! cart-cli migrate --database-url sqlite://./carts.db
//!
//! # Mint a bearer token for user 42, valid for one hour (needs JWT_SECRET)
//! cart-cli token --user-id 42 --ttl-secs 3600
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `token` - Issue a development bearer token

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(author, version, about = "Shopping cart service CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        /// Database URL (defaults to `CART_DATABASE_URL`, then `DATABASE_URL`)
        #[arg(long)]
        database_url: Option<String>,
    },
    /// Issue a bearer token signed with `JWT_SECRET`
    Token {
        /// User the token identifies
        #[arg(short, long)]
        user_id: i64,

        /// Lifetime in seconds; omit for a token without `exp`
        #[arg(short, long)]
        ttl_secs: Option<u64>,
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
        Commands::Migrate { database_url } => {
            commands::migrate::run(database_url).await?;
        }
        Commands::Token { user_id, ttl_secs } => {
            let token = commands::token::issue(user_id, ttl_secs)?;
            #[allow(clippy::print_stdout)]
            {
                println!("{token}");
            }
        }
    }
    Ok(())
}
