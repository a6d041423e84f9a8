// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Slug codec
//!
//! Routes address CMS records by slugs derived from their display names, while
//! the CMS addresses them by opaque internal names (`CaseStudy-0014`). This
//! module maps display names to slugs and slugs back to names.
//!
//! Two names can collapse to the same slug. [`SlugIndex`] makes that explicit:
//! with disambiguation enabled every member of a colliding group gets a short
//! hash suffix, and asking for the bare, shared slug reports
//! [`SlugMatch::Ambiguous`] instead of picking one.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::warn;

/// Hex characters of the SHA-256 name digest appended to colliding slugs.
const DISAMBIGUATION_HASH_LEN: usize = 6;

/// Lower-case `display_name` and collapse every run of characters outside
/// `[a-z0-9]` into a single `-`, with no leading or trailing `-`.
pub fn slugify(display_name: &str) -> String {
    let lowered = display_name.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_separator = false;

    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Recover the candidate whose slug is `slug`.
///
/// Exact slug matches win, in candidate order. Failing that, a candidate
/// matches when it equals the slug with hyphens read as spaces, ignoring case
/// and surrounding whitespace. An empty slug never resolves.
pub fn resolve_original_name<S: AsRef<str>>(slug: &str, candidates: &[S]) -> Option<String> {
    if let Some(name) = resolve_exact(slug, candidates) {
        return Some(name);
    }
    if slug.is_empty() {
        return None;
    }

    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|candidate| lenient_matches(candidate, slug))
        .map(str::to_string)
}

/// Exact-only reverse lookup: first candidate whose slug equals `slug`.
pub fn resolve_exact<S: AsRef<str>>(slug: &str, candidates: &[S]) -> Option<String> {
    if slug.is_empty() {
        return None;
    }

    candidates
        .iter()
        .map(AsRef::as_ref)
        .find(|candidate| slugify(candidate) == slug)
        .map(str::to_string)
}

fn lenient_matches(candidate: &str, slug: &str) -> bool {
    let spaced = slug.replace('-', " ");
    candidate.trim().to_lowercase() == spaced.trim().to_lowercase()
}

fn short_hash(name: &str) -> String {
    let digest = hex::encode(Sha256::digest(name.as_bytes()));
    digest[..DISAMBIGUATION_HASH_LEN].to_string()
}

/// How far reverse lookup may stray from an exact slug match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    /// Also accept "hyphens as spaces" display-name matches.
    /// Kept for links minted before slugs were canonical.
    Lenient,
}

/// Outcome of a reverse lookup against a [`SlugIndex`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugMatch {
    Exact(String),
    Lenient(String),
    /// More than one record claims this slug
    Ambiguous(Vec<String>),
    Missing,
}

impl SlugMatch {
    /// Internal name of the matched record, if the match is unambiguous.
    pub fn name(&self) -> Option<&str> {
        match self {
            SlugMatch::Exact(name) | SlugMatch::Lenient(name) => Some(name),
            SlugMatch::Ambiguous(_) | SlugMatch::Missing => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugEntry {
    /// Internal CMS name
    pub name: String,
    pub display: String,
    /// `slugify(display)`
    pub base: String,
    /// Canonical slug; differs from `base` only for disambiguated collisions
    pub slug: String,
}

/// Canonical slugs for one entity kind, in candidate (cache insertion) order.
#[derive(Debug, Clone, Default)]
pub struct SlugIndex {
    entries: Vec<SlugEntry>,
    disambiguated: bool,
}

impl SlugIndex {
    /// Build an index from `(internal name, display name)` pairs.
    pub fn build<I, N, D>(pairs: I, disambiguate: bool) -> Self
    where
        I: IntoIterator<Item = (N, D)>,
        N: Into<String>,
        D: Into<String>,
    {
        let mut entries: Vec<SlugEntry> = pairs
            .into_iter()
            .map(|(name, display)| {
                let display = display.into();
                let base = slugify(&display);
                SlugEntry {
                    name: name.into(),
                    display,
                    slug: base.clone(),
                    base,
                }
            })
            .collect();

        if disambiguate {
            let mut group_sizes: HashMap<String, usize> = HashMap::new();
            for entry in &entries {
                *group_sizes.entry(entry.base.clone()).or_default() += 1;
            }

            for entry in &mut entries {
                if group_sizes.get(&entry.base).copied().unwrap_or(0) > 1 {
                    let suffix = short_hash(&entry.name);
                    entry.slug = if entry.base.is_empty() {
                        suffix
                    } else {
                        format!("{}-{}", entry.base, suffix)
                    };
                }
            }
        }

        Self {
            entries,
            disambiguated: disambiguate,
        }
    }

    pub fn entries(&self) -> &[SlugEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical slug for a record, for building links.
    pub fn slug_for(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.slug.as_str())
    }

    pub fn resolve(&self, slug: &str, mode: MatchMode) -> SlugMatch {
        if slug.is_empty() {
            return SlugMatch::Missing;
        }

        if let Some(entry) = self.entries.iter().find(|entry| entry.slug == slug) {
            return SlugMatch::Exact(entry.name.clone());
        }

        if self.disambiguated {
            let claimants: Vec<String> = self
                .entries
                .iter()
                .filter(|entry| entry.base == slug)
                .map(|entry| entry.name.clone())
                .collect();
            if claimants.len() > 1 {
                return SlugMatch::Ambiguous(claimants);
            }
        }

        if mode == MatchMode::Lenient {
            let matches: Vec<&SlugEntry> = self
                .entries
                .iter()
                .filter(|entry| lenient_matches(&entry.display, slug))
                .collect();

            match matches.as_slice() {
                [] => {}
                [only] => {
                    warn!(slug, name = %only.name, "Slug resolved by lenient display-name match");
                    return SlugMatch::Lenient(only.name.clone());
                }
                many => {
                    return SlugMatch::Ambiguous(many.iter().map(|e| e.name.clone()).collect());
                }
            }
        }

        SlugMatch::Missing
    }
}
