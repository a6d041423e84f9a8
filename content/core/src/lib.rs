// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Alpheric content core
//!
//! CMS-backed content layer for the Alpheric website: turns CMS records into
//! slug-addressable pages, caches them per entity kind and resolves routes.
//!
//! # Architecture
//!
//! - **Domain:** records, slugs, errors, the remote resource contract
//! - **Application:** entity caches, fetch orchestration, page resolution
//! - **Infrastructure:** HTTP client for the CMS, event bus

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
