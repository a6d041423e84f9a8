// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entity::EntityKind;

/// Entity cache lifecycle events
///
/// Published by the entity caches on the content event bus. Page resolvers
/// wait on `CacheSettled` to re-attempt slug resolution; the CLI prints them
/// with `--events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentEvent {
    FetchStarted {
        kind: EntityKind,
        name: String,
        started_at: DateTime<Utc>,
    },
    RecordStored {
        kind: EntityKind,
        name: String,
        stored_at: DateTime<Utc>,
    },
    FetchFailed {
        kind: EntityKind,
        name: String,
        message: String,
        failed_at: DateTime<Utc>,
    },
    CacheCleared {
        kind: EntityKind,
        cleared_at: DateTime<Utc>,
    },
    /// The cache's last outstanding operation finished (`loading` is false)
    CacheSettled {
        kind: EntityKind,
        entries: usize,
        settled_at: DateTime<Utc>,
    },
}

impl ContentEvent {
    pub fn kind(&self) -> EntityKind {
        match self {
            ContentEvent::FetchStarted { kind, .. }
            | ContentEvent::RecordStored { kind, .. }
            | ContentEvent::FetchFailed { kind, .. }
            | ContentEvent::CacheCleared { kind, .. }
            | ContentEvent::CacheSettled { kind, .. } => *kind,
        }
    }
}
