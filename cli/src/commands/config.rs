// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use alpheric_content_core::domain::site_config::SiteConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./alpheric-config.yaml)
        #[arg(short, long, default_value = "./alpheric-config.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => {
            generate(&output, examples)?;
            println!(
                "{}",
                format!("✓ Configuration generated: {}", output.display()).green()
            );
            Ok(())
        }
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = SiteConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. ALPHERIC_CONFIG_PATH: {}",
            std::env::var("ALPHERIC_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./alpheric-config.yaml");
        println!("  4. ~/.alpheric/config.yaml");
        println!("  5. /etc/alpheric/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Site:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let cms = &config.spec.cms;
    println!("{}", "CMS:".bold());
    println!("  Base URL: {}", cms.base_url);
    println!("  Content host: {}", cms.content_host);
    println!(
        "  API token: {}",
        if config.api_token().is_some() {
            "configured".green()
        } else {
            "(not set)".yellow()
        }
    );
    println!("  Timeout: {}s", cms.timeout_seconds);
    if cms.list_page_length == 0 {
        println!("  List page length: unlimited");
    } else {
        println!("  List page length: {}", cms.list_page_length);
    }
    println!();

    println!("{}", "Slugs:".bold());
    println!("  Lenient fallback: {}", config.spec.slugs.lenient_fallback);
    println!(
        "  Disambiguate collisions: {}",
        config.spec.slugs.disambiguate_collisions
    );
    println!();

    if !config.spec.fallback_names.is_empty() {
        println!("{}", "Fallback names:".bold());
        for (kind, names) in &config.spec.fallback_names {
            println!("  {} ({})", kind.to_string().bold(), names.len());
            for name in names {
                println!("    - {}", name);
            }
        }
        println!();
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = SiteConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

pub fn generate(output: &Path, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    Ok(())
}
