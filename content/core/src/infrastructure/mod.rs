// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Infrastructure layer: adapters for the CMS and event streaming.

pub mod cms_client;
pub mod event_bus;
pub mod in_memory_client;

pub use cms_client::CmsClient;
pub use event_bus::{EventBus, EventBusError};
pub use in_memory_client::InMemoryResourceClient;
