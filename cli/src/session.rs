// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

//! Content session for one CLI invocation
//!
//! Loads configuration, builds the content context and wires Ctrl-C to
//! cancellation so an interrupted command aborts its requests.

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use alpheric_content_core::application::ContentContext;
use alpheric_content_core::domain::entity::EntityKind;
use alpheric_content_core::domain::events::ContentEvent;
use alpheric_content_core::domain::resource::ApiToken;
use alpheric_content_core::domain::site_config::SiteConfigManifest;
use alpheric_content_core::infrastructure::event_bus::{EventBusError, EventReceiver};

/// Global flags that shape a session
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub config: Option<PathBuf>,
    pub token: Option<String>,
    pub events: bool,
}

pub struct Session {
    pub config: SiteConfigManifest,
    pub ctx: Arc<ContentContext>,
}

impl Session {
    pub fn open(options: SessionOptions) -> Result<Self> {
        let config = SiteConfigManifest::load_or_default(options.config)
            .context("Failed to load configuration")?;
        config
            .validate()
            .context("Configuration validation failed")?;

        let ctx = ContentContext::from_config(&config).context("Failed to create CMS client")?;
        if let Some(token) = options.token.filter(|t| !t.trim().is_empty()) {
            ctx.set_token(ApiToken::new(token));
        }
        if ctx.token().is_none() {
            eprintln!(
                "{}",
                "⚠ No CMS token configured (set ALPHERIC_API_TOKEN or --token)".yellow()
            );
        }

        let ctx = Arc::new(ctx);
        if options.events {
            spawn_event_printer(ctx.events().subscribe());
        }

        Ok(Self { config, ctx })
    }

    /// Token for one command, cancelled on Ctrl-C.
    pub fn cancel_on_interrupt(&self) -> CancellationToken {
        let cancel = self.ctx.child_token();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("{}", "Interrupted; cancelling requests".dimmed());
                interrupt.cancel();
            }
        });
        cancel
    }
}

pub fn parse_kind(kind: &str) -> Result<EntityKind> {
    kind.parse::<EntityKind>().with_context(|| {
        let known: Vec<String> = EntityKind::ALL.iter().map(|k| k.to_string()).collect();
        format!("Known kinds: {}", known.join(", "))
    })
}

fn spawn_event_printer(mut receiver: EventReceiver) {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => eprintln!("{}", describe_event(&event).dimmed()),
                Err(EventBusError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    });
}

pub fn describe_event(event: &ContentEvent) -> String {
    match event {
        ContentEvent::FetchStarted { kind, name, .. } => format!("→ fetching {} {}", kind, name),
        ContentEvent::RecordStored { kind, name, .. } => format!("✓ stored {} {}", kind, name),
        ContentEvent::FetchFailed {
            kind,
            name,
            message,
            ..
        } => format!("✗ {} {}: {}", kind, name, message),
        ContentEvent::CacheCleared { kind, .. } => format!("· {} cache cleared", kind),
        ContentEvent::CacheSettled { kind, entries, .. } => {
            format!("· {} cache settled ({} entries)", kind, entries)
        }
    }
}
