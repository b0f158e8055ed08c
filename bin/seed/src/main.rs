//! # Seed
//!
//! Maintenance CLI for a Tipboard database: create accounts (including
//! administrators, which the web form cannot do) and rebuild stored
//! reputation totals.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tb_auth_simple::SimpleAuthProvider;
use tb_core::TipService;
use tb_db_sqlite::SqliteTipRepo;

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Tipboard database maintenance")]
struct Cli {
    /// SQLite URL, shared with the server's `database.url` setting.
    #[arg(
        long,
        env = "TIPBOARD__DATABASE__URL",
        default_value = "sqlite:tipboard.db"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account.
    CreateUser {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Grant administrator rights.
        #[arg(long)]
        admin: bool,
    },
    /// Recompute a user's reputation from the votes on their tips.
    Recompute {
        #[arg(long)]
        username: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cli = Cli::parse();
    let repo = SqliteTipRepo::new(&cli.database_url)
        .await
        .with_context(|| format!("failed to open {}", cli.database_url))?;
    let service = TipService::new(Arc::new(repo), Arc::new(SimpleAuthProvider::new()));

    match cli.command {
        Command::CreateUser { username, password, admin } => {
            let user = service.create_account(&username, &password, admin).await?;
            log::info!(
                "created {} '{}' ({})",
                if user.is_admin { "admin" } else { "user" },
                user.username,
                user.id
            );
        }
        Command::Recompute { username } => {
            let user = service
                .find_user_by_name(&username)
                .await?
                .with_context(|| format!("no user named '{username}'"))?;
            let reputation = service.recompute_reputation(user.id).await?;
            log::info!("'{}' now has reputation {reputation}", user.username);
        }
    }

    Ok(())
}
