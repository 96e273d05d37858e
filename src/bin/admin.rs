//! CLI administration tool for link-relay.
//!
//! Inspects and maintains short URLs directly against the database, without
//! going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Totals, or one record
//! cargo run --bin admin -- stats
//! cargo run --bin admin -- stats aZ3kQ9
//!
//! # Delete a record (asks first unless --yes)
//! cargo run --bin admin -- delete aZ3kQ9
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//!
//! # Mint an API_TOKENS entry
//! cargo run --bin admin -- token generate alice
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` or `DB_HOST`/`DB_PORT`/`DB_USER`/`DB_PASSWORD`/`DB_NAME`
//! - `REDIS_URL` or `REDIS_HOST`/`REDIS_PORT`/`REDIS_PASSWORD`/`REDIS_DB`,
//!   and `CACHE_BACKEND` (optional): when Redis is the cache, `delete` also
//!   drops the cached entry

use link_relay::application::services::identity::generate_token;
use link_relay::config::{Config, mask_connection_string};
use link_relay::domain::repositories::{LinkRepository, RepositoryError};
use link_relay::infrastructure::cache::{CacheService, RedisCache};
use link_relay::infrastructure::persistence::PgLinkRepository;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show totals, or the record for one short code
    Stats {
        /// Short code to inspect
        code: Option<String>,
    },

    /// Delete a short code
    Delete {
        code: String,

        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },

    /// API token helpers
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
}

#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Show database info
    Info,
}

#[derive(Subcommand)]
enum TokenAction {
    /// Print a fresh `owner:token` pair for API_TOKENS
    Generate {
        /// Owner recorded on links created with this token
        owner: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Token { action } => handle_token_action(action),
        command => run_against_database(command).await,
    }
}

async fn run_against_database(command: Commands) -> Result<()> {
    let database_url = Config::load_database_url()?;
    let pool = PgPool::connect(&database_url).await.with_context(|| {
        format!(
            "Failed to connect to database at {}",
            mask_connection_string(&database_url)
        )
    })?;

    match command {
        Commands::Stats { code } => handle_stats(&pool, code).await,
        Commands::Delete { code, yes } => delete_link(&pool, &code, yes).await,
        Commands::Db { action } => handle_db_action(action, &pool).await,
        Commands::Token { action } => handle_token_action(action),
    }
}

/// Prints one record, or table-wide totals when no code is given.
async fn handle_stats(pool: &PgPool, code: Option<String>) -> Result<()> {
    let Some(code) = code else {
        return print_totals(pool).await;
    };

    let repo = PgLinkRepository::new(Arc::new(pool.clone()));
    let Some(record) = repo
        .find_by_code(&code)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
    else {
        println!("{} {}", "Short code not found:".yellow(), code.cyan());
        return Ok(());
    };

    println!("{}", "Short URL".bright_blue().bold());
    println!();
    println!("  Code:     {}", record.short_code.cyan());
    println!("  Target:   {}", record.original_url.bright_white());
    println!(
        "  Accesses: {}",
        record.access_count.to_string().bright_green().bold()
    );
    println!(
        "  Owner:    {}",
        record.owner_id.as_deref().unwrap_or("-").bright_black()
    );
    println!(
        "  Created:  {}",
        record
            .created_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black()
    );
    println!(
        "  Updated:  {}",
        record
            .updated_at
            .format("%Y-%m-%d %H:%M")
            .to_string()
            .bright_black()
    );
    println!();

    Ok(())
}

async fn print_totals(pool: &PgPool) -> Result<()> {
    let (links, accesses): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(access_count), 0)::BIGINT FROM short_urls",
    )
    .fetch_one(pool)
    .await?;

    println!("{}", "Statistics".bright_blue().bold());
    println!();
    println!("  Short URLs: {}", links.to_string().bright_green().bold());
    println!("  Accesses:   {}", accesses.to_string().bright_green().bold());
    println!();

    Ok(())
}

/// Deletes a record after confirmation (default: No).
///
/// When the service caches in Redis (`REDIS_URL` or `REDIS_HOST` and friends,
/// unless `CACHE_BACKEND` says otherwise) the cached entry is dropped too.
/// An in-process cache cannot be reached from here and keeps the entry until
/// its TTL runs out.
async fn delete_link(pool: &PgPool, code: &str, skip_confirm: bool) -> Result<()> {
    let repo = PgLinkRepository::new(Arc::new(pool.clone()));

    let record = repo
        .find_by_code(code)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .with_context(|| format!("Short code '{code}' not found"))?;

    println!("  Code:   {}", record.short_code.cyan());
    println!("  Target: {}", record.original_url.bright_white());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete this short URL?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "Cancelled".red());
            return Ok(());
        }
    }

    match repo.delete_by_code(code).await {
        Ok(()) => {}
        Err(RepositoryError::NotFound) => {
            println!("{}", "Already deleted".yellow());
            return Ok(());
        }
        Err(e) => anyhow::bail!("Failed to delete: {}", e),
    }

    if let Some(redis_url) = Config::load_cache_redis_url()? {
        match RedisCache::connect(&redis_url, Duration::from_secs(3600)).await {
            Ok(cache) => {
                if let Err(e) = cache.invalidate(code).await {
                    println!("{} {}", "Cache entry not removed:".yellow(), e);
                }
            }
            Err(e) => println!("{} {}", "Cache unreachable:".yellow(), e),
        }
    }

    println!("{}", "Short URL deleted".green().bold());
    Ok(())
}

async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "Checking database connection...".bright_blue());

            let repo = PgLinkRepository::new(Arc::new(pool.clone()));
            repo.ping()
                .await
                .map_err(|e| anyhow::anyhow!("Database check failed: {}", e))?;

            println!("{}", "Database connection OK".green().bold());
        }
        DbAction::Info => {
            println!("{}", "Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT version()")
                .fetch_one(pool)
                .await?;

            println!("  PostgreSQL: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}

fn handle_token_action(action: TokenAction) -> Result<()> {
    match action {
        TokenAction::Generate { owner } => {
            anyhow::ensure!(
                !owner.is_empty() && !owner.contains([':', ',']),
                "Owner must be non-empty and contain neither ':' nor ','"
            );

            let token = generate_token().context("OS random source unavailable")?;

            println!("{}", "API token".bright_blue().bold());
            println!();
            println!("  Owner: {}", owner.cyan());
            println!("  Token: {}", token.bright_yellow().bold());
            println!();
            println!("{}", "Append to API_TOKENS (comma separated):".bright_white());
            println!("  {}:{}", owner, token);
            println!();
            println!("{}", "Add this to your requests:".bright_white());
            println!(
                "  {}: Bearer {}",
                "Authorization".bright_cyan(),
                token.bright_yellow()
            );
            println!();
        }
    }

    Ok(())
}
