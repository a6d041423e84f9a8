// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

use alpheric_content_core::application::{ContentContext, ContentOptions};
use alpheric_content_core::domain::entity::EntityKind;
use alpheric_content_core::domain::errors::ContentError;
use alpheric_content_core::domain::events::ContentEvent;
use alpheric_content_core::domain::resource::{ApiToken, ResourcePath};
use alpheric_content_core::domain::slug::{MatchMode, SlugMatch};
use alpheric_content_core::infrastructure::in_memory_client::InMemoryResourceClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};
use tokio_util::sync::CancellationToken;

fn context(client: &Arc<InMemoryResourceClient>) -> ContentContext {
    let ctx = ContentContext::new(client.clone(), ContentOptions::default());
    ctx.set_token(ApiToken::new("key:secret"));
    ctx
}

fn server_error() -> ContentError {
    ContentError::Http {
        status: 500,
        message: "Internal Server Error".to_string(),
    }
}

#[tokio::test]
async fn test_partial_failure_is_tolerated() {
    let client = Arc::new(InMemoryResourceClient::new());
    for name in ["CaseStudy-0001", "CaseStudy-0002", "CaseStudy-0003"] {
        client.insert_record(EntityKind::CaseStudy, json!({"name": name}));
    }
    client.fail(
        &ResourcePath::detail(EntityKind::CaseStudy, "CaseStudy-0002"),
        server_error(),
    );

    let ctx = context(&client);
    let cache = ctx.cache(EntityKind::CaseStudy);
    let records = assert_ok!(
        cache
            .fetch_many(
                ["CaseStudy-0001", "CaseStudy-0002", "CaseStudy-0003"],
                &CancellationToken::new()
            )
            .await
    );

    assert_eq!(records.len(), 2);
    assert_eq!(cache.error(), None);
    assert!(!cache.contains("CaseStudy-0002"));
    assert!(!cache.is_loading());
}

#[tokio::test]
async fn test_all_failures_escalate() {
    let client = Arc::new(InMemoryResourceClient::new());
    client.fail(&ResourcePath::detail(EntityKind::Pilot, "Dreamers"), server_error());
    client.fail(
        &ResourcePath::detail(EntityKind::Pilot, "Makers"),
        ContentError::Network("connection reset".to_string()),
    );

    let ctx = context(&client);
    let cache = ctx.cache(EntityKind::Pilot);
    let err = assert_err!(
        cache
            .fetch_many(["Dreamers", "Makers"], &CancellationToken::new())
            .await
    );

    match &err {
        ContentError::Batch { failed, message } => {
            assert_eq!(*failed, 2);
            assert!(message.contains("Dreamers: HTTP 500: Internal Server Error"));
            assert!(message.contains("; Makers: Network error: connection reset"));
        }
        other => panic!("expected a batch error, got {other:?}"),
    }
    assert_eq!(cache.error(), Some(err.to_string()));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_concurrent_requests_are_deduplicated() {
    let client = Arc::new(InMemoryResourceClient::with_latency(Duration::from_millis(50)));
    client.insert_record(EntityKind::CaseStudy, json!({"name": "CaseStudy-0001"}));

    let ctx = context(&client);
    let cache = ctx.cache(EntityKind::CaseStudy);
    let cancel = CancellationToken::new();

    let (a, b, c) = tokio::join!(
        cache.fetch_one("CaseStudy-0001", &cancel),
        cache.fetch_one("CaseStudy-0001", &cancel),
        cache.fetch_many(["CaseStudy-0001"], &cancel),
    );

    assert_ok!(a);
    assert_ok!(b);
    assert_ok!(c);
    assert_eq!(
        client.call_count(&ResourcePath::detail(EntityKind::CaseStudy, "CaseStudy-0001")),
        1
    );
    assert_eq!(ctx.flights_in_progress(), 0);
}

#[tokio::test]
async fn test_missing_token_fails_without_network() {
    let client = Arc::new(InMemoryResourceClient::new());
    let ctx = ContentContext::new(client.clone(), ContentOptions::default());
    let cache = ctx.cache(EntityKind::Insight);

    let err = assert_err!(cache.fetch_one("insight-1", &CancellationToken::new()).await);
    assert_eq!(err, ContentError::missing_token());
    assert_eq!(cache.error().as_deref(), Some("No authentication token available"));

    let err = assert_err!(cache.fetch_all(&CancellationToken::new()).await);
    assert!(matches!(err, ContentError::Auth(_)));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_fetch_all_scenario() {
    let client = Arc::new(InMemoryResourceClient::new());
    client.insert_record(
        EntityKind::CaseStudy,
        json!({
            "name": "CaseStudy-0001",
            "full_title": "Acme Rebrand",
            "attachments": [{"attach": "/files/hero.png"}]
        }),
    );

    let ctx = context(&client);
    let cache = ctx.cache(EntityKind::CaseStudy);
    assert_ok!(cache.fetch_all(&CancellationToken::new()).await);

    assert_eq!(cache.len(), 1);
    let record = cache.get("CaseStudy-0001").unwrap();
    assert_eq!(record.str_field("full_title"), Some("Acme Rebrand"));
    assert!(cache.is_populated());

    let index = cache.slug_index(true);
    assert_eq!(
        index.resolve("acme-rebrand", MatchMode::Exact),
        SlugMatch::Exact("CaseStudy-0001".to_string())
    );
}

#[tokio::test]
async fn test_list_failure_sets_error_and_retry_recovers() {
    let client = Arc::new(InMemoryResourceClient::new());
    client.fail(&ResourcePath::list(EntityKind::BrandClient), server_error());

    let ctx = context(&client);
    let cache = ctx.cache(EntityKind::BrandClient);
    assert_err!(cache.fetch_all(&CancellationToken::new()).await);
    assert!(cache.error().is_some());
    assert!(cache.has_failed_request());

    client.respond(&ResourcePath::list(EntityKind::BrandClient), json!([{"name": "Acme"}]));
    client.respond(
        &ResourcePath::detail(EntityKind::BrandClient, "Acme"),
        json!({"name": "Acme", "client_name": "Acme Corp"}),
    );

    let records = assert_ok!(cache.retry(&CancellationToken::new()).await);
    assert_eq!(records.len(), 1);
    assert_eq!(cache.error(), None);
    assert!(!cache.has_failed_request());
}

#[tokio::test]
async fn test_quiet_listing_never_writes_error() {
    let client = Arc::new(InMemoryResourceClient::new());
    client.fail(&ResourcePath::list(EntityKind::CaseStudy), server_error());

    let ctx = context(&client);
    let cache = ctx.cache(EntityKind::CaseStudy);
    assert_err!(cache.fetch_all_quietly(&CancellationToken::new()).await);
    assert_eq!(cache.error(), None);
    assert!(!cache.has_failed_request());
    assert!(!cache.is_loading());

    client.respond(
        &ResourcePath::list(EntityKind::CaseStudy),
        json!([{"name": "CaseStudy-0001"}, {"name": "CaseStudy-0002"}]),
    );
    client.respond(
        &ResourcePath::detail(EntityKind::CaseStudy, "CaseStudy-0001"),
        json!({"name": "CaseStudy-0001", "full_title": "Acme Rebrand"}),
    );
    client.fail(
        &ResourcePath::detail(EntityKind::CaseStudy, "CaseStudy-0002"),
        server_error(),
    );

    let records = assert_ok!(cache.fetch_all_quietly(&CancellationToken::new()).await);
    assert_eq!(records.len(), 1);
    assert_eq!(cache.error(), None);
    assert!(cache.is_populated());
}

#[tokio::test]
async fn test_lifecycle_events_are_published() {
    let client = Arc::new(InMemoryResourceClient::new());
    client.insert_record(EntityKind::SubPilot, json!({"name": "SP-1"}));

    let ctx = context(&client);
    let cache = ctx.cache(EntityKind::SubPilot);
    let mut events = cache.subscribe();

    assert_ok!(cache.fetch_one("SP-1", &CancellationToken::new()).await);

    assert!(matches!(events.recv().await.unwrap(), ContentEvent::FetchStarted { .. }));
    assert!(matches!(events.recv().await.unwrap(), ContentEvent::RecordStored { .. }));
    assert!(matches!(
        events.recv().await.unwrap(),
        ContentEvent::CacheSettled { entries: 1, .. }
    ));
}

#[tokio::test]
async fn test_shutdown_cancels_outstanding_fetches() {
    let client = Arc::new(InMemoryResourceClient::with_latency(Duration::from_secs(30)));
    client.insert_record(EntityKind::CaseStudy, json!({"name": "CaseStudy-0001"}));

    let ctx = Arc::new(context(&client));
    let cache = ctx.cache(EntityKind::CaseStudy);

    let pending = {
        let cache = Arc::clone(&cache);
        let cancel = ctx.child_token();
        tokio::spawn(async move { cache.fetch_one("CaseStudy-0001", &cancel).await })
    };

    while !cache.is_loading() {
        tokio::task::yield_now().await;
    }
    ctx.shutdown();

    let result = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .expect("fetch did not stop")
        .unwrap();
    assert_eq!(result, Err(ContentError::Cancelled));
    assert_eq!(cache.error(), None);
    assert!(!cache.is_loading());
}

#[tokio::test]
async fn test_abandoned_fetch_releases_its_flight() {
    let client = Arc::new(InMemoryResourceClient::with_latency(Duration::from_secs(30)));
    client.insert_record(EntityKind::CaseStudy, json!({"name": "CaseStudy-0001"}));

    let ctx = Arc::new(context(&client));
    let cache = ctx.cache(EntityKind::CaseStudy);
    let cancel = CancellationToken::new();

    let pending = {
        let cache = Arc::clone(&cache);
        let cancel = cancel.clone();
        tokio::spawn(async move { cache.fetch_one("CaseStudy-0001", &cancel).await })
    };

    while ctx.flights_in_progress() == 0 {
        tokio::task::yield_now().await;
    }
    cancel.cancel();

    assert_eq!(pending.await.unwrap(), Err(ContentError::Cancelled));
    assert_eq!(ctx.flights_in_progress(), 0);
    assert_eq!(cache.error(), None);
}
