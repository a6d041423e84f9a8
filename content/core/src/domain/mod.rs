// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: pure content types and functions with no I/O.

pub mod attachment;
pub mod entity;
pub mod errors;
pub mod events;
pub mod forms;
pub mod page;
pub mod record;
pub mod resource;
pub mod site_config;
pub mod slug;

pub use entity::EntityKind;
pub use errors::ContentError;
pub use record::CmsRecord;
