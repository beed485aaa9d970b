//! Account administration
//!
//! `set-role` is how the first admin gets created: sign in once through
//! the API, then promote that phone number here.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use expertly_server::db::UserRepo;
use expertly_server::models::{PhoneNumber, Role};

use super::db::{connect_with, DbArgs};

#[derive(Parser, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommands,
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Change the role of an existing account
    SetRole(SetRoleArgs),
}

#[derive(Parser, Debug)]
pub struct SetRoleArgs {
    /// Phone number the account signed in with
    #[arg(long)]
    pub phone: String,

    /// New role: customer, member or admin
    #[arg(long)]
    pub role: Role,

    #[command(flatten)]
    pub db: DbArgs,
}

pub async fn run_user(args: UserArgs) -> Result<()> {
    match args.command {
        UserCommands::SetRole(args) => run_set_role(args).await,
    }
}

async fn run_set_role(args: SetRoleArgs) -> Result<()> {
    let phone = PhoneNumber::new(&args.phone)?;
    let (_, pool) = connect_with(args.db).await?;

    let user = UserRepo::new(&pool)
        .set_role(&phone, args.role)
        .await
        .with_context(|| format!("Failed to update role for {}", phone.as_str()))?;

    tracing::info!(user = %user.id, role = %user.role, "role updated");
    println!("{} ({}) is now {}", user.name, phone.as_str(), user.role);
    Ok(())
}
