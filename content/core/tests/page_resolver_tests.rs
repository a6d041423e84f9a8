// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

use alpheric_content_core::application::{ContentContext, ContentOptions, PageResolver};
use alpheric_content_core::domain::entity::EntityKind;
use alpheric_content_core::domain::errors::ContentError;
use alpheric_content_core::domain::page::PageState;
use alpheric_content_core::domain::resource::{ApiToken, ResourcePath};
use alpheric_content_core::domain::slug::SlugIndex;
use alpheric_content_core::infrastructure::in_memory_client::InMemoryResourceClient;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

fn context(client: &Arc<InMemoryResourceClient>) -> Arc<ContentContext> {
    let ctx = ContentContext::new(client.clone(), ContentOptions::default());
    ctx.set_token(ApiToken::new("key:secret"));
    Arc::new(ctx)
}

fn seed_case_studies(client: &InMemoryResourceClient) {
    client.insert_record(
        EntityKind::CaseStudy,
        json!({"name": "CaseStudy-0001", "full_title": "Acme Rebrand"}),
    );
    client.insert_record(
        EntityKind::CaseStudy,
        json!({"name": "CaseStudy-0002", "full_title": "Globex Launch"}),
    );
}

fn list_calls(client: &InMemoryResourceClient) -> usize {
    client.call_count(&ResourcePath::list(EntityKind::CaseStudy))
}

#[tokio::test]
async fn test_empty_cache_fetches_then_finds() {
    let client = Arc::new(InMemoryResourceClient::new());
    seed_case_studies(&client);
    let ctx = context(&client);

    let resolver = PageResolver::new(Arc::clone(&ctx), EntityKind::CaseStudy);
    let state = resolver
        .resolve("acme-rebrand", &CancellationToken::new())
        .await
        .unwrap();

    match state {
        PageState::Found { slug, name, record } => {
            assert_eq!(slug, "acme-rebrand");
            assert_eq!(name, "CaseStudy-0001");
            assert_eq!(record.str_field("full_title"), Some("Acme Rebrand"));
        }
        other => panic!("expected Found, got {other:?}"),
    }
    assert_eq!(list_calls(&client), 1);

    // Second visit is served from the cache
    let again = resolver
        .resolve("globex-launch", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(again.record().and_then(|r| r.name()), Some("CaseStudy-0002"));
    assert_eq!(list_calls(&client), 1);
}

#[tokio::test]
async fn test_unknown_slug_is_not_found_once_populated() {
    let client = Arc::new(InMemoryResourceClient::new());
    seed_case_studies(&client);
    let ctx = context(&client);
    let resolver = PageResolver::new(ctx, EntityKind::CaseStudy);

    for _ in 0..2 {
        let state = resolver
            .resolve("initech-rollout", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            state,
            PageState::NotFound {
                slug: "initech-rollout".to_string()
            }
        );
    }
    assert_eq!(list_calls(&client), 1);
}

#[tokio::test]
async fn test_waits_for_load_already_in_progress() {
    let client = Arc::new(InMemoryResourceClient::with_latency(Duration::from_millis(40)));
    seed_case_studies(&client);
    let ctx = context(&client);
    let cache = ctx.cache(EntityKind::CaseStudy);

    let loading = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.fetch_all(&CancellationToken::new()).await })
    };
    while !cache.is_loading() {
        tokio::task::yield_now().await;
    }

    let resolver = PageResolver::new(Arc::clone(&ctx), EntityKind::CaseStudy);
    let state = resolver
        .resolve("globex-launch", &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(state, PageState::Found { ref name, .. } if name == "CaseStudy-0002"));
    assert!(loading.await.unwrap().is_ok());
    assert_eq!(list_calls(&client), 1);
}

#[tokio::test]
async fn test_whole_failure_is_reported_and_retryable() {
    let client = Arc::new(InMemoryResourceClient::new());
    client.fail(
        &ResourcePath::list(EntityKind::CaseStudy),
        ContentError::Network("connection refused".to_string()),
    );
    let ctx = context(&client);
    let resolver = PageResolver::new(Arc::clone(&ctx), EntityKind::CaseStudy);

    let state = resolver
        .resolve("acme-rebrand", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        state,
        PageState::Failed {
            slug: "acme-rebrand".to_string(),
            message: "Please check your connection and try again.".to_string()
        }
    );
    assert!(ctx.cache(EntityKind::CaseStudy).error().is_some());

    seed_case_studies(&client);
    client.respond(
        &ResourcePath::list(EntityKind::CaseStudy),
        json!([{"name": "CaseStudy-0001"}, {"name": "CaseStudy-0002"}]),
    );

    let state = resolver
        .resolve("acme-rebrand", &CancellationToken::new())
        .await
        .unwrap();
    assert!(matches!(state, PageState::Found { .. }));
}

#[tokio::test]
async fn test_colliding_slugs_are_never_guessed() {
    let client = Arc::new(InMemoryResourceClient::new());
    client.insert_record(
        EntityKind::Insight,
        json!({"name": "INS-1", "title": "Design Trends"}),
    );
    client.insert_record(
        EntityKind::Insight,
        json!({"name": "INS-2", "title": "Design: Trends"}),
    );
    let ctx = context(&client);
    let resolver = PageResolver::new(Arc::clone(&ctx), EntityKind::Insight);

    let bare = resolver
        .resolve("design-trends", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        bare,
        PageState::NotFound {
            slug: "design-trends".to_string()
        }
    );

    let index: SlugIndex = ctx.cache(EntityKind::Insight).slug_index(true);
    let canonical = index.slug_for("INS-2").unwrap().to_string();
    assert!(canonical.starts_with("design-trends-"));

    let state = resolver
        .resolve(&canonical, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(state.record().and_then(|r| r.name()), Some("INS-2"));
}

#[tokio::test]
async fn test_lenient_match_is_accepted_when_enabled() {
    let client = Arc::new(InMemoryResourceClient::new());
    client.insert_record(
        EntityKind::BrandClient,
        json!({"name": "BC-1", "client_name": "Acme & Sons"}),
    );
    let ctx = context(&client);
    let resolver = PageResolver::new(Arc::clone(&ctx), EntityKind::BrandClient);

    // "acme-&-sons" was never a canonical slug; only the display-name shim matches it
    let state = resolver
        .resolve("acme-&-sons", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(state.record().and_then(|r| r.name()), Some("BC-1"));
}

#[tokio::test]
async fn test_watch_restarts_when_slug_changes() {
    let client = Arc::new(InMemoryResourceClient::with_latency(Duration::from_millis(30)));
    seed_case_studies(&client);
    let ctx = context(&client);
    let resolver = Arc::new(PageResolver::new(Arc::clone(&ctx), EntityKind::CaseStudy));

    let (params, params_rx) = watch::channel("acme-rebrand".to_string());
    let (mut states, handle) = resolver.watch(params_rx);

    tokio::task::yield_now().await;
    params.send("globex-launch".to_string()).unwrap();

    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            states.changed().await.unwrap();
            let state = states.borrow_and_update().clone();
            if state.is_terminal() {
                if let Some("globex-launch") = state.slug() {
                    return state;
                }
            }
        }
    })
    .await
    .expect("resolver never settled on the new slug");

    assert_eq!(settled.record().and_then(|r| r.name()), Some("CaseStudy-0002"));

    drop(params);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("resolver task did not stop")
        .unwrap();
}
