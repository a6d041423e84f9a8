// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Content Context
//!
//! Owns everything a page needs to reach the CMS: the resource client, the
//! auth token, one entity cache per kind, the in-flight registry, the event
//! bus and the root cancellation token. Built once at startup and passed to
//! resolvers and orchestrators; `shutdown` cancels every outstanding fetch.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::entity_cache::{ContentBackend, EntityCache};
use crate::domain::entity::EntityKind;
use crate::domain::errors::ContentError;
use crate::domain::resource::{ApiToken, ResourceClient};
use crate::domain::site_config::{SiteConfigManifest, SlugConfig};
use crate::domain::slug::MatchMode;
use crate::infrastructure::cms_client::CmsClient;
use crate::infrastructure::event_bus::EventBus;

/// Settings the context needs beyond the resource client
#[derive(Debug, Clone)]
pub struct ContentOptions {
    pub content_host: String,
    pub slugs: SlugConfig,
    pub fallback_names: BTreeMap<EntityKind, Vec<String>>,
    pub list_page_length: u32,
    pub event_capacity: usize,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self::from(&SiteConfigManifest::default())
    }
}

impl From<&SiteConfigManifest> for ContentOptions {
    fn from(config: &SiteConfigManifest) -> Self {
        Self {
            content_host: config.spec.cms.content_host.clone(),
            slugs: config.spec.slugs.clone(),
            fallback_names: config.spec.fallback_names.clone(),
            list_page_length: config.spec.cms.list_page_length,
            event_capacity: 1000,
        }
    }
}

pub struct ContentContext {
    backend: Arc<ContentBackend>,
    caches: Mutex<BTreeMap<EntityKind, Arc<EntityCache>>>,
    options: ContentOptions,
    root: CancellationToken,
}

impl ContentContext {
    pub fn new(client: Arc<dyn ResourceClient>, options: ContentOptions) -> Self {
        let root = CancellationToken::new();
        let backend = Arc::new(ContentBackend::new(
            client,
            EventBus::new(options.event_capacity),
            root.clone(),
            options.list_page_length,
        ));

        let caches = EntityKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(EntityCache::new(kind, Arc::clone(&backend)))))
            .collect();

        Self {
            backend,
            caches: Mutex::new(caches),
            options,
            root,
        }
    }

    /// Context talking to the configured CMS, with the configured token.
    pub fn from_config(config: &SiteConfigManifest) -> Result<Self, ContentError> {
        let client = CmsClient::from_config(&config.spec.cms)?;
        let context = Self::new(Arc::new(client), ContentOptions::from(config));

        match config.api_token() {
            Some(token) => context.set_token(token),
            None => info!("No CMS token configured; fetches will fail until one is set"),
        }

        Ok(context)
    }

    pub fn cache(&self, kind: EntityKind) -> Arc<EntityCache> {
        let mut caches = self.caches.lock();
        let cache = caches
            .entry(kind)
            .or_insert_with(|| Arc::new(EntityCache::new(kind, Arc::clone(&self.backend))));
        Arc::clone(cache)
    }

    pub fn set_token(&self, token: ApiToken) {
        self.backend.set_token(Some(token));
    }

    pub fn clear_token(&self) {
        self.backend.set_token(None);
    }

    pub fn token(&self) -> Option<ApiToken> {
        self.backend.token()
    }

    pub fn client(&self) -> Arc<dyn ResourceClient> {
        self.backend.client()
    }

    pub fn events(&self) -> &EventBus {
        self.backend.events()
    }

    pub fn options(&self) -> &ContentOptions {
        &self.options
    }

    pub fn content_host(&self) -> &str {
        &self.options.content_host
    }

    pub fn match_mode(&self) -> MatchMode {
        if self.options.slugs.lenient_fallback {
            MatchMode::Lenient
        } else {
            MatchMode::Exact
        }
    }

    pub fn disambiguate_slugs(&self) -> bool {
        self.options.slugs.disambiguate_collisions
    }

    pub fn fallback_names(&self, kind: EntityKind) -> &[String] {
        self.options
            .fallback_names
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Token for one operation; cancelled by `shutdown`.
    pub fn child_token(&self) -> CancellationToken {
        self.root.child_token()
    }

    pub fn flights_in_progress(&self) -> usize {
        self.backend.flights_in_progress()
    }

    /// Cancel every outstanding fetch.
    pub fn shutdown(&self) {
        info!("Shutting down content context");
        self.root.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.root.is_cancelled()
    }
}
