// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

//! # Alpheric Content CLI
//!
//! The `alpheric` binary drives the website's content layer from a terminal:
//! it fetches CMS records, computes and resolves slugs, renders enriched pages
//! and submits lead forms, exactly as the site does.
//!
//! ## Commands
//!
//! - `alpheric slug <TEXT>` - Print the slug for a display name
//! - `alpheric fetch|list|resolve|page` - Content operations
//! - `alpheric form submit|upload` - Lead capture
//! - `alpheric config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use alpheric_content::commands::{self, ConfigCommand, FormCommand};
use alpheric_content::session::SessionOptions;

/// Alpheric content layer - CMS records, slugs and page resolution
#[derive(Parser)]
#[command(name = "alpheric")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "ALPHERIC_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// CMS API token ("key:secret")
    #[arg(long, global = true, env = "ALPHERIC_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Print content events (fetches, cache updates) to stderr
    #[arg(long, global = true)]
    events: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "ALPHERIC_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URL slug for a display name
    #[command(name = "slug")]
    Slug {
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Fetch one record by internal name
    #[command(name = "fetch")]
    Fetch {
        /// Entity kind (e.g. case-study, pilot, service-page-l2)
        #[arg(value_name = "KIND")]
        kind: String,

        #[arg(value_name = "NAME")]
        name: String,
    },

    /// List every record of a kind with its slug
    #[command(name = "list")]
    List {
        #[arg(value_name = "KIND")]
        kind: String,
    },

    /// Resolve a URL slug to a record
    #[command(name = "resolve")]
    Resolve {
        #[arg(value_name = "KIND")]
        kind: String,

        #[arg(value_name = "SLUG")]
        slug: String,
    },

    /// Load an enriched page (design-page, service-category, industry-page, pilot-programme)
    #[command(name = "page")]
    Page {
        #[arg(value_name = "PRESET")]
        preset: String,

        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Lead-capture forms
    #[command(name = "form")]
    Form {
        #[command(subcommand)]
        command: FormCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let session = SessionOptions {
        config: cli.config.clone(),
        token: cli.token.clone(),
        events: cli.events,
    };

    match cli.command {
        Some(Commands::Slug { text }) => commands::slug::handle_command(&text),
        Some(Commands::Fetch { kind, name }) => {
            commands::content::fetch(session, &kind, &name).await
        }
        Some(Commands::List { kind }) => commands::content::list(session, &kind).await,
        Some(Commands::Resolve { kind, slug }) => {
            commands::content::resolve(session, &kind, &slug).await
        }
        Some(Commands::Page { preset, name }) => {
            commands::content::page(session, &preset, &name).await
        }
        Some(Commands::Form { command }) => commands::form::handle_command(command, session).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
