// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Page resolution states
//!
//! `INIT → RESOLVING_SLUG → (FETCHING | FOUND | NOT_FOUND)`; `FETCHING` loops
//! back to `RESOLVING_SLUG` once the cache settles. `Failed` is the visible
//! error state for a whole-operation failure and can be retried.

use serde::Serialize;

use crate::domain::record::CmsRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PageState {
    Init,
    ResolvingSlug { slug: String },
    Fetching { slug: String },
    Found { slug: String, name: String, record: CmsRecord },
    NotFound { slug: String },
    Failed { slug: String, message: String },
}

impl PageState {
    /// `Found`, `NotFound` and `Failed` end a resolution pass.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PageState::Found { .. } | PageState::NotFound { .. } | PageState::Failed { .. }
        )
    }

    pub fn slug(&self) -> Option<&str> {
        match self {
            PageState::Init => None,
            PageState::ResolvingSlug { slug }
            | PageState::Fetching { slug }
            | PageState::Found { slug, .. }
            | PageState::NotFound { slug }
            | PageState::Failed { slug, .. } => Some(slug),
        }
    }

    pub fn record(&self) -> Option<&CmsRecord> {
        match self {
            PageState::Found { record, .. } => Some(record),
            _ => None,
        }
    }
}
