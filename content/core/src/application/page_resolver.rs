// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Page Resolver
//!
//! Turns a route's slug parameter into a cached record.
//!
//! # State Machine
//!
//! ```text
//! INIT -> RESOLVING_SLUG -> FOUND
//!                        -> FETCHING -> (settled) -> RESOLVING_SLUG ...
//!                        -> NOT_FOUND   (cache populated, not loading, no match)
//!                        -> FAILED      (whole-operation fetch failure, retryable)
//! ```
//!
//! A resolver never issues a second list fetch while its cache is loading;
//! it waits for the cache's `CacheSettled` event instead. `watch` restarts
//! resolution whenever the slug parameter changes, cancelling the pass in
//! progress so stale results are never published.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::application::context::ContentContext;
use crate::application::entity_cache::EntityCache;
use crate::domain::entity::EntityKind;
use crate::domain::errors::ContentError;
use crate::domain::page::PageState;
use crate::domain::slug::{SlugIndex, SlugMatch};
use crate::infrastructure::event_bus::EventBusError;

/// Where a resolver finds candidate names
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionSource {
    /// List the kind's collection
    Collection,
    /// A fixed list of internal names, fetched one at a time
    Candidates(Vec<String>),
}

pub struct PageResolver {
    ctx: Arc<ContentContext>,
    kind: EntityKind,
    source: ResolutionSource,
}

impl PageResolver {
    /// Resolver for `kind`, using the configured fallback names when the
    /// kind has any and the collection otherwise.
    pub fn new(ctx: Arc<ContentContext>, kind: EntityKind) -> Self {
        let fallback = ctx.fallback_names(kind);
        let source = if fallback.is_empty() {
            ResolutionSource::Collection
        } else {
            ResolutionSource::Candidates(fallback.to_vec())
        };

        Self { ctx, kind, source }
    }

    pub fn with_source(mut self, source: ResolutionSource) -> Self {
        self.source = source;
        self
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn source(&self) -> &ResolutionSource {
        &self.source
    }

    /// Run one resolution pass to a terminal state.
    ///
    /// `Err` is only ever `ContentError::Cancelled`; every other failure is
    /// reported as `PageState::Failed`.
    pub async fn resolve(
        &self,
        slug: &str,
        cancel: &CancellationToken,
    ) -> Result<PageState, ContentError> {
        self.run(slug, cancel, &|_| {}).await
    }

    /// Drive resolution from a stream of slug parameters.
    ///
    /// Publishes every state transition on the returned channel. The task
    /// ends when the parameter sender is dropped, every state receiver is
    /// dropped, or the context shuts down.
    pub fn watch(
        self: Arc<Self>,
        mut params: watch::Receiver<String>,
    ) -> (watch::Receiver<PageState>, JoinHandle<()>) {
        let (states, receiver) = watch::channel(PageState::Init);
        let root = self.ctx.child_token();

        let handle = tokio::spawn(async move {
            loop {
                let slug = params.borrow_and_update().clone();
                let pass_cancel = root.child_token();
                let report = |state: PageState| {
                    let _ = states.send(state);
                };

                let step = tokio::select! {
                    result = self.run(&slug, &pass_cancel, &report) => Step::Finished(result),
                    changed = params.changed() => Step::SlugChanged(changed.is_ok()),
                    _ = root.cancelled() => Step::Shutdown,
                };

                match step {
                    Step::Finished(Ok(state)) => {
                        let _ = states.send(state);
                        tokio::select! {
                            changed = params.changed() => if changed.is_err() { break },
                            _ = root.cancelled() => break,
                        }
                    }
                    Step::Finished(Err(_)) | Step::Shutdown => break,
                    Step::SlugChanged(open) => {
                        pass_cancel.cancel();
                        if !open {
                            break;
                        }
                        debug!(kind = %self.kind, "Slug changed mid-resolution; restarting");
                    }
                }

                if states.is_closed() {
                    break;
                }
            }
        });

        (receiver, handle)
    }

    async fn run<F>(
        &self,
        slug: &str,
        cancel: &CancellationToken,
        report: &F,
    ) -> Result<PageState, ContentError>
    where
        F: Fn(PageState) + Sync,
    {
        report(PageState::ResolvingSlug {
            slug: slug.to_string(),
        });

        if slug.is_empty() {
            return Ok(PageState::NotFound {
                slug: String::new(),
            });
        }

        let cache = self.ctx.cache(self.kind);
        match &self.source {
            ResolutionSource::Collection => {
                self.resolve_from_collection(&cache, slug, cancel, report)
                    .await
            }
            ResolutionSource::Candidates(names) => {
                self.resolve_from_candidates(&cache, names, slug, cancel, report)
                    .await
            }
        }
    }

    async fn resolve_from_collection<F>(
        &self,
        cache: &EntityCache,
        slug: &str,
        cancel: &CancellationToken,
        report: &F,
    ) -> Result<PageState, ContentError>
    where
        F: Fn(PageState) + Sync,
    {
        let mut attempted = false;

        loop {
            // Subscribe before inspecting `loading` so a settle in between is not missed
            let mut events = cache.subscribe();

            if let Some(state) = self.lookup(cache, slug) {
                return Ok(state);
            }

            if cache.is_loading() {
                report(PageState::Fetching {
                    slug: slug.to_string(),
                });
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ContentError::Cancelled),
                    settled = events.settled() => match settled {
                        Ok(_) | Err(EventBusError::Lagged(_)) => {}
                        Err(e) => debug!(error = %e, "Stopped waiting for cache to settle"),
                    },
                }
                continue;
            }

            if attempted || cache.is_populated() {
                debug!(kind = %self.kind, slug, "No record matches slug");
                return Ok(PageState::NotFound {
                    slug: slug.to_string(),
                });
            }

            attempted = true;
            report(PageState::Fetching {
                slug: slug.to_string(),
            });
            match cache.fetch_all(cancel).await {
                Ok(_) => {}
                Err(ContentError::Cancelled) => return Err(ContentError::Cancelled),
                Err(e) => {
                    warn!(kind = %self.kind, slug, error = %e, "Page could not be loaded");
                    return Ok(PageState::Failed {
                        slug: slug.to_string(),
                        message: e.user_message(),
                    });
                }
            }
        }
    }

    async fn resolve_from_candidates<F>(
        &self,
        cache: &EntityCache,
        candidates: &[String],
        slug: &str,
        cancel: &CancellationToken,
        report: &F,
    ) -> Result<PageState, ContentError>
    where
        F: Fn(PageState) + Sync,
    {
        if let Some(state) = self.lookup(cache, slug) {
            return Ok(state);
        }

        let index = SlugIndex::build(
            candidates.iter().map(|name| (name.clone(), name.clone())),
            self.ctx.disambiguate_slugs(),
        );
        let name = match index.resolve(slug, self.ctx.match_mode()) {
            SlugMatch::Exact(name) | SlugMatch::Lenient(name) => name,
            SlugMatch::Ambiguous(names) => return Ok(self.ambiguous(slug, &names)),
            SlugMatch::Missing => {
                return Ok(PageState::NotFound {
                    slug: slug.to_string(),
                })
            }
        };

        report(PageState::Fetching {
            slug: slug.to_string(),
        });
        match cache.fetch_one(&name, cancel).await {
            Ok(record) => Ok(PageState::Found {
                slug: slug.to_string(),
                name,
                record,
            }),
            Err(ContentError::Cancelled) => Err(ContentError::Cancelled),
            Err(e) if e.is_not_found() => Ok(PageState::NotFound {
                slug: slug.to_string(),
            }),
            Err(e) => {
                warn!(kind = %self.kind, slug, error = %e, "Page could not be loaded");
                Ok(PageState::Failed {
                    slug: slug.to_string(),
                    message: e.user_message(),
                })
            }
        }
    }

    /// Resolve against what is already cached. `None` means "not yet".
    fn lookup(&self, cache: &EntityCache, slug: &str) -> Option<PageState> {
        let index = cache.slug_index(self.ctx.disambiguate_slugs());
        match index.resolve(slug, self.ctx.match_mode()) {
            SlugMatch::Exact(name) | SlugMatch::Lenient(name) => {
                cache.get(&name).map(|record| PageState::Found {
                    slug: slug.to_string(),
                    name,
                    record,
                })
            }
            SlugMatch::Ambiguous(names) => Some(self.ambiguous(slug, &names)),
            SlugMatch::Missing => None,
        }
    }

    fn ambiguous(&self, slug: &str, names: &[String]) -> PageState {
        warn!(kind = %self.kind, slug, ?names, "Slug is claimed by several records");
        PageState::NotFound {
            slug: slug.to_string(),
        }
    }
}

enum Step {
    Finished(Result<PageState, ContentError>),
    SlugChanged(bool),
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::context::ContentOptions;
    use crate::domain::resource::{ApiToken, ResourcePath};
    use crate::infrastructure::in_memory_client::InMemoryResourceClient;
    use serde_json::json;

    fn context(client: Arc<InMemoryResourceClient>, options: ContentOptions) -> Arc<ContentContext> {
        let ctx = ContentContext::new(client, options);
        ctx.set_token(ApiToken::new("key:secret"));
        Arc::new(ctx)
    }

    #[tokio::test]
    async fn test_empty_slug_is_not_found() {
        let ctx = context(Arc::new(InMemoryResourceClient::new()), ContentOptions::default());
        let resolver = PageResolver::new(ctx, EntityKind::CaseStudy);
        let state = resolver.resolve("", &CancellationToken::new()).await.unwrap();
        assert_eq!(state, PageState::NotFound { slug: String::new() });
    }

    #[tokio::test]
    async fn test_candidates_come_from_fallback_names() {
        let client = Arc::new(InMemoryResourceClient::new());
        client.respond(
            &ResourcePath::detail(EntityKind::Pilot, "Dreamers"),
            json!({"name": "Dreamers", "pilot_name": "Dreamers"}),
        );

        let mut options = ContentOptions::default();
        options
            .fallback_names
            .insert(EntityKind::Pilot, vec!["Dreamers".to_string(), "Makers".to_string()]);
        let ctx = context(Arc::clone(&client), options);

        let resolver = PageResolver::new(ctx, EntityKind::Pilot);
        assert!(matches!(resolver.source(), ResolutionSource::Candidates(names) if names.len() == 2));

        let state = resolver.resolve("dreamers", &CancellationToken::new()).await.unwrap();
        assert_eq!(state.record().and_then(|r| r.name()), Some("Dreamers"));

        let missing = resolver.resolve("makers", &CancellationToken::new()).await.unwrap();
        assert_eq!(missing, PageState::NotFound { slug: "makers".to_string() });
    }

    #[tokio::test]
    async fn test_cancelled_pass_returns_cancelled() {
        let client = Arc::new(InMemoryResourceClient::with_latency(std::time::Duration::from_secs(30)));
        let ctx = context(client, ContentOptions::default());
        let resolver = PageResolver::new(ctx, EntityKind::CaseStudy);

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(
            resolver.resolve("acme-rebrand", &cancel).await,
            Err(ContentError::Cancelled)
        );
    }
}
