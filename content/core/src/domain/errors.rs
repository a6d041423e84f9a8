// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Content errors
//!
//! One taxonomy for everything that can go wrong between a route and the CMS.
//! Errors are `Clone` because a single in-flight fetch hands its result to
//! every waiter attached to it.

use crate::domain::entity::EntityKind;

/// Errors that can occur while fetching or resolving content
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    /// No response reached us (connection refused, DNS, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The CMS answered with a non-2xx status
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// No token configured; raised before any network I/O
    #[error("{0}")]
    Auth(String),

    /// Slug resolution exhausted every candidate
    #[error("No {kind} found for '{slug}'")]
    NotFound { kind: EntityKind, slug: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Invalid submission: {0}")]
    Validation(String),

    /// Every request of a fan-out failed
    #[error("All {failed} requests failed: {message}")]
    Batch { failed: usize, message: String },

    #[error("Request cancelled")]
    Cancelled,
}

impl ContentError {
    pub fn missing_token() -> Self {
        ContentError::Auth("No authentication token available".to_string())
    }

    /// Text suitable for showing to a site visitor.
    pub fn user_message(&self) -> String {
        match self {
            ContentError::Network(_) => {
                "Please check your connection and try again.".to_string()
            }
            ContentError::NotFound { .. } => "This page doesn't exist.".to_string(),
            ContentError::Http { status, .. } if *status == 404 => {
                "This page doesn't exist.".to_string()
            }
            ContentError::Http { message, .. } => message.clone(),
            ContentError::Validation(message) => message.clone(),
            _ => "Something went wrong while loading this page.".to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ContentError::NotFound { .. } | ContentError::Http { status: 404, .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ContentError::Cancelled)
    }
}

impl From<serde_json::Error> for ContentError {
    fn from(e: serde_json::Error) -> Self {
        ContentError::Decode(e.to_string())
    }
}
