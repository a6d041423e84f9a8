// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Entity Cache
//!
//! Keyed store of fetched CMS records for one entity kind.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Fetch records through the resource client, keep them
//!   by internal name, track `loading` / `error` for the presentation layer
//! - **Collaborators:**
//!   - Domain: CmsRecord, ResourceClient, SlugIndex
//!   - Application: InFlightRegistry (shared by every cache)
//!   - Infrastructure: EventBus
//!
//! # Failure Policy
//!
//! Fan-out fetches are best effort: when at least one record arrives, the
//! failures are logged and dropped and `error` stays clear. Only whole-operation
//! failures (every fetch failed, the list request failed, no token) reach
//! `error`. Cancellation never does.

use chrono::{DateTime, Utc};
use futures::future::{join_all, FutureExt};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::inflight::InFlightRegistry;
use crate::domain::entity::EntityKind;
use crate::domain::errors::ContentError;
use crate::domain::events::ContentEvent;
use crate::domain::record::CmsRecord;
use crate::domain::resource::{ApiToken, ResourceClient, ResourcePath};
use crate::domain::slug::SlugIndex;
use crate::infrastructure::event_bus::{EventBus, KindEventReceiver};

pub type RecordKey = (EntityKind, String);

/// Collaborators shared by every cache of one application context
pub struct ContentBackend {
    client: Arc<dyn ResourceClient>,
    token: RwLock<Option<ApiToken>>,
    flights: InFlightRegistry<RecordKey, CmsRecord>,
    events: EventBus,
    list_page_length: u32,
}

impl ContentBackend {
    pub fn new(
        client: Arc<dyn ResourceClient>,
        events: EventBus,
        root: CancellationToken,
        list_page_length: u32,
    ) -> Self {
        Self {
            client,
            token: RwLock::new(None),
            flights: InFlightRegistry::new(root),
            events,
            list_page_length,
        }
    }

    pub fn client(&self) -> Arc<dyn ResourceClient> {
        Arc::clone(&self.client)
    }

    pub fn token(&self) -> Option<ApiToken> {
        self.token.read().clone()
    }

    pub fn set_token(&self, token: Option<ApiToken>) {
        *self.token.write() = token;
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn flights_in_progress(&self) -> usize {
        self.flights.in_flight()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedRecord {
    pub record: CmsRecord,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: IndexMap<String, CachedRecord>,
    in_flight: usize,
    error: Option<String>,
    /// A collection listing has completed since the last clear
    populated: bool,
}

/// Point-in-time view of a cache, for rendering
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub kind: EntityKind,
    pub entries: IndexMap<String, CachedRecord>,
    pub loading: bool,
    pub error: Option<String>,
}

/// The last whole operation that failed, re-dispatched by `retry`
#[derive(Debug, Clone, PartialEq)]
enum FailedRequest {
    One(String),
    Many(Vec<String>),
    All,
}

pub struct EntityCache {
    kind: EntityKind,
    backend: Arc<ContentBackend>,
    state: RwLock<CacheState>,
    last_failure: Mutex<Option<FailedRequest>>,
}

impl EntityCache {
    pub fn new(kind: EntityKind, backend: Arc<ContentBackend>) -> Self {
        Self {
            kind,
            backend,
            state: RwLock::new(CacheState::default()),
            last_failure: Mutex::new(None),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Fetch one record and store it under `name`.
    pub async fn fetch_one(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<CmsRecord, ContentError> {
        let _loading = self.begin_loading();

        match self.fetch_detail(name, cancel).await {
            Ok(record) => {
                self.clear_error();
                Ok(record)
            }
            Err(e) => {
                self.record_failure(&e, FailedRequest::One(name.to_string()));
                Err(e)
            }
        }
    }

    /// Cached record, or `fetch_one` on a miss.
    pub async fn ensure_one(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<CmsRecord, ContentError> {
        if let Some(record) = self.get(name) {
            debug!(kind = %self.kind, name, "Cache hit");
            return Ok(record);
        }
        self.fetch_one(name, cancel).await
    }

    /// Fetch every name concurrently; partial failures are tolerated.
    pub async fn fetch_many<I, S>(
        &self,
        names: I,
        cancel: &CancellationToken,
    ) -> Result<Vec<CmsRecord>, ContentError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let _loading = self.begin_loading();
        let results = self.fan_out(&names, cancel).await;
        self.settle_batch(results, cancel, FailedRequest::Many(names))
    }

    /// List the collection, then fetch every listed record.
    pub async fn fetch_all(&self, cancel: &CancellationToken) -> Result<Vec<CmsRecord>, ContentError> {
        let _loading = self.begin_loading();

        let names = match self.list_names(cancel).await {
            Ok(names) => names,
            Err(e) => {
                self.record_failure(&e, FailedRequest::All);
                return Err(e);
            }
        };

        if names.is_empty() {
            debug!(kind = %self.kind, "Collection is empty");
            self.clear_error();
            self.state.write().populated = true;
            return Ok(Vec::new());
        }

        let results = self.fan_out(&names, cancel).await;
        let records = self.settle_batch(results, cancel, FailedRequest::All)?;
        self.state.write().populated = true;
        Ok(records)
    }

    /// `fetch_all` for callers that degrade instead of surfacing failures:
    /// `error` is never written and records that fail to load are dropped.
    pub async fn fetch_all_quietly(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<CmsRecord>, ContentError> {
        let _loading = self.begin_loading();

        let names = self.list_names(cancel).await?;
        let results = self.fan_out(&names, cancel).await;
        if cancel.is_cancelled() {
            return Err(ContentError::Cancelled);
        }

        let mut records = Vec::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(record) => records.push(record),
                Err(ContentError::Cancelled) => {}
                Err(e) => {
                    debug!(kind = %self.kind, %name, error = %e, "Skipping record that failed to load")
                }
            }
        }

        if names.is_empty() || !records.is_empty() {
            self.state.write().populated = true;
        }
        Ok(records)
    }

    /// Fetch every name concurrently and report each outcome, leaving
    /// `error` untouched.
    pub async fn fetch_settled<I, S>(
        &self,
        names: I,
        cancel: &CancellationToken,
    ) -> Vec<(String, Result<CmsRecord, ContentError>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Vec::new();
        }

        let _loading = self.begin_loading();
        self.fan_out(&names, cancel).await
    }

    /// Re-dispatch the last failed operation. Does nothing when the last
    /// operation succeeded.
    pub async fn retry(&self, cancel: &CancellationToken) -> Result<Vec<CmsRecord>, ContentError> {
        let failed = self.last_failure.lock().take();
        match failed {
            None => Ok(Vec::new()),
            Some(FailedRequest::One(name)) => {
                info!(kind = %self.kind, %name, "Retrying fetch");
                self.fetch_one(&name, cancel).await.map(|record| vec![record])
            }
            Some(FailedRequest::Many(names)) => {
                info!(kind = %self.kind, count = names.len(), "Retrying batch fetch");
                self.fetch_many(names, cancel).await
            }
            Some(FailedRequest::All) => {
                info!(kind = %self.kind, "Retrying collection fetch");
                self.fetch_all(cancel).await
            }
        }
    }

    pub fn has_failed_request(&self) -> bool {
        self.last_failure.lock().is_some()
    }

    /// Drop every entry and the error. Fetches still in flight will repopulate.
    pub fn clear(&self) {
        {
            let mut state = self.state.write();
            state.entries.clear();
            state.error = None;
            state.populated = false;
        }
        *self.last_failure.lock() = None;

        info!(kind = %self.kind, "Cache cleared");
        self.backend.events.publish(ContentEvent::CacheCleared {
            kind: self.kind,
            cleared_at: Utc::now(),
        });
    }

    /// Insert or replace a record under its own name.
    pub fn store(&self, record: CmsRecord) -> Result<(), ContentError> {
        let name = record
            .name()
            .map(str::to_string)
            .ok_or_else(|| ContentError::Decode(format!("{} record has no name", self.kind)))?;
        self.insert(name, record);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<CmsRecord> {
        self.state.read().entries.get(name).map(|cached| cached.record.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().entries.contains_key(name)
    }

    /// Internal names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.state.read().entries.keys().cloned().collect()
    }

    pub fn records(&self) -> Vec<CmsRecord> {
        self.state
            .read()
            .entries
            .values()
            .map(|cached| cached.record.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().in_flight > 0
    }

    /// Whether `fetch_all` has completed since the last `clear`.
    pub fn is_populated(&self) -> bool {
        self.state.read().populated
    }

    pub fn error(&self) -> Option<String> {
        self.state.read().error.clone()
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let state = self.state.read();
        CacheSnapshot {
            kind: self.kind,
            entries: state.entries.clone(),
            loading: state.in_flight > 0,
            error: state.error.clone(),
        }
    }

    /// Slugs for every cached record, in insertion order.
    pub fn slug_index(&self, disambiguate: bool) -> SlugIndex {
        let state = self.state.read();
        SlugIndex::build(
            state.entries.iter().map(|(name, cached)| {
                let display = cached.record.display_name(self.kind).unwrap_or(name.as_str());
                (name.clone(), display.to_string())
            }),
            disambiguate,
        )
    }

    /// Events for this cache's kind only.
    pub fn subscribe(&self) -> KindEventReceiver {
        self.backend.events.subscribe_kind(self.kind)
    }

    async fn fetch_detail(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<CmsRecord, ContentError> {
        let token = self.backend.token().ok_or_else(ContentError::missing_token)?;

        let kind = self.kind;
        let client = self.backend.client();
        let owned_name = name.to_string();

        self.backend.events.publish(ContentEvent::FetchStarted {
            kind,
            name: owned_name.clone(),
            started_at: Utc::now(),
        });

        let result = self
            .backend
            .flights
            .run((kind, owned_name.clone()), cancel, move |flight_cancel| {
                async move {
                    let path = ResourcePath::detail(kind, &owned_name);
                    let body = client.get(&path, &token, &flight_cancel).await?;
                    let mut record = CmsRecord::from_value(body)?;
                    record.ensure_name(&owned_name);
                    Ok(record)
                }
                .boxed()
            })
            .await;

        match &result {
            Ok(record) => {
                self.insert(name.to_string(), record.clone());
                info!(kind = %kind, name, "Fetched record");
                self.backend.events.publish(ContentEvent::RecordStored {
                    kind,
                    name: name.to_string(),
                    stored_at: Utc::now(),
                });
            }
            Err(ContentError::Cancelled) => {
                debug!(kind = %kind, name, "Fetch cancelled");
            }
            Err(e) => {
                debug!(kind = %kind, name, error = %e, "Fetch failed");
                self.backend.events.publish(ContentEvent::FetchFailed {
                    kind,
                    name: name.to_string(),
                    message: e.to_string(),
                    failed_at: Utc::now(),
                });
            }
        }

        result
    }

    async fn fan_out(
        &self,
        names: &[String],
        cancel: &CancellationToken,
    ) -> Vec<(String, Result<CmsRecord, ContentError>)> {
        let results = join_all(names.iter().map(|name| self.fetch_detail(name, cancel))).await;
        names.iter().cloned().zip(results).collect()
    }

    async fn list_names(&self, cancel: &CancellationToken) -> Result<Vec<String>, ContentError> {
        let token = self.backend.token().ok_or_else(ContentError::missing_token)?;

        let path = ResourcePath::list(self.kind)
            .with_query("fields", r#"["name"]"#)
            .with_query("limit_page_length", self.backend.list_page_length.to_string());

        let body = self.backend.client.get(&path, &token, cancel).await?;
        let stubs = body.as_array().ok_or_else(|| {
            ContentError::Decode(format!("{} listing is not an array", self.kind))
        })?;

        Ok(stubs
            .iter()
            .filter_map(|stub| stub.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect())
    }

    fn settle_batch(
        &self,
        results: Vec<(String, Result<CmsRecord, ContentError>)>,
        cancel: &CancellationToken,
        request: FailedRequest,
    ) -> Result<Vec<CmsRecord>, ContentError> {
        if cancel.is_cancelled() {
            return Err(ContentError::Cancelled);
        }

        let mut records = Vec::new();
        let mut failures = Vec::new();
        for (name, result) in results {
            match result {
                Ok(record) => records.push(record),
                Err(ContentError::Cancelled) => {}
                Err(e) => failures.push((name, e)),
            }
        }

        if records.is_empty() {
            if failures.is_empty() {
                return Err(ContentError::Cancelled);
            }

            let message = failures
                .iter()
                .map(|(name, e)| format!("{}: {}", name, e))
                .collect::<Vec<_>>()
                .join("; ");
            let error = ContentError::Batch {
                failed: failures.len(),
                message,
            };
            self.record_failure(&error, request);
            return Err(error);
        }

        for (name, e) in &failures {
            warn!(kind = %self.kind, %name, error = %e, "Dropping record that failed to load");
        }
        self.clear_error();
        Ok(records)
    }

    fn insert(&self, name: String, record: CmsRecord) {
        self.state.write().entries.insert(
            name,
            CachedRecord {
                record,
                fetched_at: Utc::now(),
            },
        );
    }

    fn clear_error(&self) {
        self.state.write().error = None;
        *self.last_failure.lock() = None;
    }

    fn record_failure(&self, error: &ContentError, request: FailedRequest) {
        if error.is_cancelled() {
            return;
        }
        warn!(kind = %self.kind, error = %error, "Content request failed");
        self.state.write().error = Some(error.to_string());
        *self.last_failure.lock() = Some(request);
    }

    fn begin_loading(&self) -> LoadingGuard<'_> {
        self.state.write().in_flight += 1;
        LoadingGuard { cache: self }
    }
}

/// Keeps `loading` raised for the lifetime of one public operation.
struct LoadingGuard<'a> {
    cache: &'a EntityCache,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let settled = {
            let mut state = self.cache.state.write();
            state.in_flight = state.in_flight.saturating_sub(1);
            (state.in_flight == 0).then_some(state.entries.len())
        };

        if let Some(entries) = settled {
            self.cache.backend.events.publish(ContentEvent::CacheSettled {
                kind: self.cache.kind,
                entries,
                settled_at: Utc::now(),
            });
        }
    }
}
