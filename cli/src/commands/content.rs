// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

//! Content commands
//!
//! Commands: fetch, list, resolve, page

use anyhow::{Context, Result};
use colored::Colorize;
use std::sync::Arc;
use tracing::debug;

use alpheric_content_core::application::{ContentOrchestrator, EnrichmentPlan, PageResolver};
use alpheric_content_core::domain::entity::EntityKind;
use alpheric_content_core::domain::errors::ContentError;
use alpheric_content_core::domain::page::PageState;
use alpheric_content_core::domain::record::CmsRecord;

use crate::session::{parse_kind, Session, SessionOptions};

pub async fn fetch(options: SessionOptions, kind: &str, name: &str) -> Result<()> {
    let kind = parse_kind(kind)?;
    let session = Session::open(options)?;
    let cancel = session.cancel_on_interrupt();

    let record = session
        .ctx
        .cache(kind)
        .fetch_one(name, &cancel)
        .await
        .with_context(|| format!("Failed to fetch {} '{}'", kind, name))?;

    print_record(&record)
}

pub async fn list(options: SessionOptions, kind: &str) -> Result<()> {
    let kind = parse_kind(kind)?;
    let session = Session::open(options)?;
    let cancel = session.cancel_on_interrupt();
    let cache = session.ctx.cache(kind);

    let records = cache
        .fetch_all(&cancel)
        .await
        .with_context(|| format!("Failed to list {}", kind))?;

    if records.is_empty() {
        println!("{}", format!("No {} records", kind).yellow());
        return Ok(());
    }

    let index = cache.slug_index(session.ctx.disambiguate_slugs());
    println!("{}", format!("{} ({}):", kind, records.len()).bold());
    for record in &records {
        let name = record.name().unwrap_or_default();
        let title = record.display_name(kind).unwrap_or(name);
        let slug = index.slug_for(name).unwrap_or("-");
        println!("  {} {} {}", slug.cyan(), title, format!("[{}]", name).dimmed());
    }

    Ok(())
}

pub async fn resolve(options: SessionOptions, kind: &str, slug: &str) -> Result<()> {
    let kind = parse_kind(kind)?;
    let session = Session::open(options)?;
    let cancel = session.cancel_on_interrupt();

    let resolver = PageResolver::new(Arc::clone(&session.ctx), kind);
    debug!(kind = %kind, slug = %slug, source = ?resolver.source(), "Resolving slug");

    let state = resolver.resolve(slug, &cancel).await?;
    let (name, record) = found_record(kind, state)?;
    eprintln!("{}", format!("✓ {} → {}", slug, name).green());
    print_record(&record)
}

/// The record a terminal page state carries; `NotFound` becomes
/// `ContentError::NotFound`.
pub fn found_record(kind: EntityKind, state: PageState) -> Result<(String, CmsRecord)> {
    match state {
        PageState::Found { name, record, .. } => Ok((name, record)),
        PageState::NotFound { slug } => Err(ContentError::NotFound { kind, slug }.into()),
        PageState::Failed { message, .. } => anyhow::bail!(message),
        other => anyhow::bail!("Resolution stopped early: {:?}", other),
    }
}

pub async fn page(options: SessionOptions, preset: &str, name: &str) -> Result<()> {
    let plan = EnrichmentPlan::preset(preset).with_context(|| {
        format!(
            "Unknown page preset '{}'. Known presets: {}",
            preset,
            EnrichmentPlan::PRESETS.join(", ")
        )
    })?;
    let session = Session::open(options)?;
    let cancel = session.cancel_on_interrupt();

    let record = ContentOrchestrator::new(Arc::clone(&session.ctx))
        .load_enriched(&plan, name, &cancel)
        .await
        .with_context(|| format!("Failed to load {} page '{}'", plan.parent, name))?;

    print_record(&record)
}

fn print_record(record: &CmsRecord) -> Result<()> {
    let json = serde_json::to_string_pretty(record).context("Failed to serialize record")?;
    println!("{}", json);
    Ok(())
}
