//! Session maintenance

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use expertly_server::db::SessionRepo;

use super::db::{connect_with, DbArgs};

#[derive(Parser, Debug)]
pub struct SessionsArgs {
    #[command(subcommand)]
    pub command: SessionsCommands,
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommands {
    /// Delete sessions past their expiry
    Purge(DbArgs),
}

pub async fn run_sessions(args: SessionsArgs) -> Result<()> {
    match args.command {
        SessionsCommands::Purge(db) => {
            let (_, pool) = connect_with(db).await?;
            let purged = SessionRepo::new(&pool)
                .purge_expired()
                .await
                .context("Failed to purge sessions")?;
            println!("Removed {} expired session(s)", purged);
            Ok(())
        }
    }
}
