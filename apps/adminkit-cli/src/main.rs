//! `adminkit`: operator tool for the data-access engine.
//!
//! Inspects entity metadata, compiles filters to SQL, resolves a principal's
//! privileges and runs scoped queries, all from the same YAML configuration
//! the embedding service uses.

mod commands;
mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use adminkit_db::Page;
use adminkit_security::SecurityContext;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "adminkit", version, about = "AdminKit data-access engine tool")]
struct Cli {
    /// YAML configuration file; `ADMINKIT__*` variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the configuration and list registered entities
    Entities,

    /// Compile a JSON filter against an entity
    Compile {
        entity: String,
        /// Filter document, e.g. '{"age": {"$gte": 18}}'
        filter: String,
    },

    /// Resolve the privileges of a principal in an organization
    Resolve {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        org: Uuid,
    },

    /// Run a scoped query as a principal
    Query {
        entity: String,
        #[arg(default_value = "{}")]
        filter: String,
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        org: Uuid,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long)]
        limit: Option<u64>,
        /// Also count all matching rows
        #[arg(long)]
        total: bool,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = AppConfig::load(cli.config.as_deref())?;
    logging::init(&cfg.logging)?;
    tracing::debug!(config = ?cli.config, entities = cfg.entities.len(), "configuration loaded");

    let out = match cli.command {
        Command::Entities => commands::entities(&cfg)?,
        Command::Compile { entity, filter } => commands::compile(&cfg, &entity, &filter)?,
        Command::Resolve { user, org } => commands::resolve(&cfg, user, org).await?,
        Command::Query {
            entity,
            filter,
            user,
            org,
            offset,
            limit,
            total,
        } => {
            let ctx = SecurityContext::builder()
                .principal_id(user)
                .active_org_id(org)
                .build();
            let page = Page {
                offset,
                limit,
                with_total: total,
            };
            commands::query(&cfg, &entity, &filter, &ctx, page).await?
        }
    };

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&out)?
    } else {
        serde_json::to_string(&out)?
    };
    println!("{rendered}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
