// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Application layer: use cases over the content domain.

pub mod context;
pub mod enrichment;
pub mod entity_cache;
pub mod inflight;
pub mod lead_capture;
pub mod page_resolver;

pub use context::{ContentContext, ContentOptions};
pub use enrichment::{ContentOrchestrator, EnrichmentPlan};
pub use entity_cache::{CacheSnapshot, EntityCache};
pub use lead_capture::LeadCaptureService;
pub use page_resolver::{PageResolver, ResolutionSource};
