// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Attachment URL normalisation
//!
//! The CMS hands back file paths relative to its own host (`/files/hero.png`,
//! sometimes just `hero.png`). Pages need absolute URLs on the content host.

const FILES_PREFIX: &str = "/files/";

/// Rewrite a CMS attachment path into an absolute URL on `host`.
///
/// - `http://` / `https://` URLs pass through untouched
/// - `/files/...` is prefixed with the host
/// - any other relative path is placed under `/files/` first
pub fn normalize_url(path: &str, host: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return String::new();
    }

    let lowered = path.to_ascii_lowercase();
    if lowered.starts_with("http://") || lowered.starts_with("https://") {
        return path.to_string();
    }

    let host = host.trim_end_matches('/');
    if path.starts_with(FILES_PREFIX) {
        format!("{}{}", host, path)
    } else {
        format!("{}{}{}", host, FILES_PREFIX, path.trim_start_matches('/'))
    }
}
