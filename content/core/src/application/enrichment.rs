// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Composite Fetch Orchestrator
//!
//! Loads a parent page record and enriches its child table of link items
//! with data from related entity kinds.
//!
//! # Flow
//!
//! 1. Fetch the parent record (failure is surfaced)
//! 2. Target merge: fetch each link item's target record and add selected
//!    fields under a prefix; a failed target leaves its item untouched
//! 3. Cross reference: fetch the whole related collection and attach, to
//!    every link item, each record whose back-reference table names it.
//!    A full cross join with an equality filter. A failed collection fetch
//!    means no enrichment
//! 4. Replace the parent in its cache with the enriched record
//!
//! Cancellation is propagated from every step, never degraded.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::context::ContentContext;
use crate::domain::attachment::normalize_url;
use crate::domain::entity::EntityKind;
use crate::domain::errors::ContentError;
use crate::domain::record::CmsRecord;
use crate::domain::slug::SlugIndex;

/// Field on link items (and back-reference rows) naming the target record
pub const DEFAULT_KEY_FIELD: &str = "name1";

#[derive(Debug, Clone, PartialEq)]
pub struct TargetMerge {
    pub kind: EntityKind,
    /// Target fields to copy; empty copies every field
    pub fields: Vec<String>,
    pub prefix: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrossReference {
    pub kind: EntityKind,
    /// Child table on the related records that points back at link items
    pub back_reference_field: String,
    pub key_field: String,
    /// Link-item field receiving the matches
    pub attach_as: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentPlan {
    pub parent: EntityKind,
    pub link_field: String,
    pub key_field: String,
    pub target: Option<TargetMerge>,
    pub cross_reference: Option<CrossReference>,
}

impl EnrichmentPlan {
    pub fn new(parent: EntityKind, link_field: impl Into<String>) -> Self {
        Self {
            parent,
            link_field: link_field.into(),
            key_field: DEFAULT_KEY_FIELD.to_string(),
            target: None,
            cross_reference: None,
        }
    }

    pub fn merge_target<S: Into<String>>(
        mut self,
        kind: EntityKind,
        fields: impl IntoIterator<Item = S>,
        prefix: impl Into<String>,
    ) -> Self {
        self.target = Some(TargetMerge {
            kind,
            fields: fields.into_iter().map(Into::into).collect(),
            prefix: prefix.into(),
        });
        self
    }

    pub fn cross_reference(
        mut self,
        kind: EntityKind,
        back_reference_field: impl Into<String>,
        attach_as: impl Into<String>,
    ) -> Self {
        self.cross_reference = Some(CrossReference {
            kind,
            back_reference_field: back_reference_field.into(),
            key_field: DEFAULT_KEY_FIELD.to_string(),
            attach_as: attach_as.into(),
        });
        self
    }

    /// Design page: services (L3) merged in, case studies attached by service
    pub fn design_page() -> Self {
        Self::new(EntityKind::DesignPageL2, "services")
            .merge_target(
                EntityKind::ServicePageL3,
                ["title", "short_description", "icon"],
                "service_",
            )
            .cross_reference(EntityKind::CaseStudy, "services", "case_studies")
    }

    /// Service category (L1) with its L2 pages
    pub fn service_category() -> Self {
        Self::new(EntityKind::ServicePageL1, "services")
            .merge_target(
                EntityKind::ServicePageL2,
                ["title", "short_description", "cover_image"],
                "service_",
            )
            .cross_reference(EntityKind::CaseStudy, "services", "case_studies")
    }

    /// Industry (L1) with its L2 sectors and matching case studies
    pub fn industry_page() -> Self {
        Self::new(EntityKind::IndustryL1, "industries")
            .merge_target(
                EntityKind::IndustryL2,
                ["industry_name", "description", "cover_image"],
                "industry_",
            )
            .cross_reference(EntityKind::CaseStudy, "industries", "case_studies")
    }

    /// Pilot programme with its sub-pilots
    pub fn pilot_programme() -> Self {
        Self::new(EntityKind::Pilot, "sub_pilots").merge_target(
            EntityKind::SubPilot,
            Vec::<String>::new(),
            "sub_pilot_",
        )
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "design-page" | "design_page" => Some(Self::design_page()),
            "service-category" | "service_category" => Some(Self::service_category()),
            "industry-page" | "industry_page" => Some(Self::industry_page()),
            "pilot-programme" | "pilot_programme" | "pilot" => Some(Self::pilot_programme()),
            _ => None,
        }
    }

    pub const PRESETS: [&'static str; 4] = [
        "design-page",
        "service-category",
        "industry-page",
        "pilot-programme",
    ];
}

pub struct ContentOrchestrator {
    ctx: Arc<ContentContext>,
}

impl ContentOrchestrator {
    pub fn new(ctx: Arc<ContentContext>) -> Self {
        Self { ctx }
    }

    /// Fetch `name` of the plan's parent kind, enrich it and replace it in
    /// its cache.
    pub async fn load_enriched(
        &self,
        plan: &EnrichmentPlan,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<CmsRecord, ContentError> {
        let parent_cache = self.ctx.cache(plan.parent);
        let mut parent = parent_cache.fetch_one(name, cancel).await?;

        if !parent.get(&plan.link_field).is_some_and(Value::is_array) {
            debug!(kind = %plan.parent, name, field = %plan.link_field, "Parent has no link items");
            return Ok(parent);
        }

        let mut items: Vec<Map<String, Value>> = parent
            .array_field(&plan.link_field)
            .into_iter()
            .cloned()
            .collect();

        if let Some(target) = &plan.target {
            self.merge_targets(target, &plan.key_field, &mut items, cancel)
                .await?;
        }

        if let Some(cross_reference) = &plan.cross_reference {
            self.attach_cross_references(cross_reference, &plan.key_field, &mut items, cancel)
                .await?;
        }

        parent.insert(
            plan.link_field.clone(),
            Value::Array(items.into_iter().map(Value::Object).collect()),
        );
        parent_cache.store(parent.clone())?;

        info!(kind = %plan.parent, name, "Enriched page loaded");
        Ok(parent)
    }

    async fn merge_targets(
        &self,
        target: &TargetMerge,
        key_field: &str,
        items: &mut [Map<String, Value>],
        cancel: &CancellationToken,
    ) -> Result<(), ContentError> {
        let mut keys: Vec<String> = Vec::new();
        for key in items.iter().filter_map(|item| link_key(item, key_field)) {
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }

        let fetched: HashMap<String, Result<CmsRecord, ContentError>> = self
            .ctx
            .cache(target.kind)
            .fetch_settled(keys, cancel)
            .await
            .into_iter()
            .collect();

        if cancel.is_cancelled() {
            return Err(ContentError::Cancelled);
        }

        for item in items.iter_mut() {
            let Some(key) = link_key(item, key_field).map(str::to_string) else {
                continue;
            };

            match fetched.get(&key) {
                Some(Ok(record)) => merge_fields(item, record, target),
                Some(Err(e)) => {
                    warn!(kind = %target.kind, name = %key, error = %e, "Target fetch failed; link item left as is");
                }
                None => {}
            }
        }

        Ok(())
    }

    async fn attach_cross_references(
        &self,
        cross_reference: &CrossReference,
        key_field: &str,
        items: &mut [Map<String, Value>],
        cancel: &CancellationToken,
    ) -> Result<(), ContentError> {
        let collection = match self
            .ctx
            .cache(cross_reference.kind)
            .fetch_all_quietly(cancel)
            .await
        {
            Ok(records) => records,
            Err(ContentError::Cancelled) => return Err(ContentError::Cancelled),
            Err(e) => {
                warn!(
                    kind = %cross_reference.kind,
                    error = %e,
                    "Related collection unavailable; skipping cross-reference enrichment"
                );
                return Ok(());
            }
        };

        let slugs = SlugIndex::build(
            collection.iter().filter_map(|record| {
                let name = record.name()?;
                let display = record.display_name(cross_reference.kind).unwrap_or(name);
                Some((name.to_string(), display.to_string()))
            }),
            self.ctx.disambiguate_slugs(),
        );

        for item in items.iter_mut() {
            let Some(id) = link_key(item, key_field).map(str::to_string) else {
                continue;
            };

            let matches: Vec<Value> = collection
                .iter()
                .filter(|record| back_references(record, cross_reference, &id))
                .map(|record| self.summary(record, cross_reference.kind, &slugs))
                .collect();

            debug!(item = %id, matches = matches.len(), "Cross-referenced link item");
            item.insert(cross_reference.attach_as.clone(), Value::Array(matches));
        }

        Ok(())
    }

    fn summary(&self, record: &CmsRecord, kind: EntityKind, slugs: &SlugIndex) -> Value {
        let name = record.name().unwrap_or_default();
        let cover = record
            .str_field("cover_image")
            .map(|path| normalize_url(path, self.ctx.content_host()))
            .filter(|url| !url.is_empty())
            .or_else(|| {
                record
                    .attachment_urls(self.ctx.content_host())
                    .into_iter()
                    .next()
            });

        json!({
            "name": name,
            "title": record.display_name(kind),
            "slug": slugs.slug_for(name),
            "cover": cover,
        })
    }
}

fn link_key<'a>(item: &'a Map<String, Value>, key_field: &str) -> Option<&'a str> {
    item.get(key_field)
        .and_then(Value::as_str)
        .filter(|key| !key.trim().is_empty())
}

fn back_references(record: &CmsRecord, cross_reference: &CrossReference, id: &str) -> bool {
    record
        .array_field(&cross_reference.back_reference_field)
        .into_iter()
        .any(|row| row.get(&cross_reference.key_field).and_then(Value::as_str) == Some(id))
}

/// Shallow merge; existing link-item keys win.
fn merge_fields(item: &mut Map<String, Value>, record: &CmsRecord, target: &TargetMerge) {
    let selected: Vec<(&String, &Value)> = if target.fields.is_empty() {
        record.fields().iter().collect()
    } else {
        record
            .fields()
            .iter()
            .filter(|(field, _)| target.fields.contains(*field))
            .collect()
    };

    for (field, value) in selected {
        item.entry(format!("{}{}", target.prefix, field))
            .or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(value: Value) -> CmsRecord {
        CmsRecord::from_value(value).unwrap()
    }

    #[test]
    fn test_merge_fields_never_overwrites() {
        let mut item = Map::new();
        item.insert("name1".into(), json!("Design"));
        item.insert("service_title".into(), json!("Kept"));

        let target = TargetMerge {
            kind: EntityKind::ServicePageL3,
            fields: vec!["title".into(), "icon".into()],
            prefix: "service_".into(),
        };
        merge_fields(
            &mut item,
            &record(json!({"name": "Design", "title": "Replaced", "icon": "/files/i.svg", "body": "x"})),
            &target,
        );

        assert_eq!(item["service_title"], "Kept");
        assert_eq!(item["service_icon"], "/files/i.svg");
        assert!(!item.contains_key("service_body"));
        assert_eq!(item["name1"], "Design");
    }

    #[test]
    fn test_back_references_scans_every_row() {
        let cross_reference = CrossReference {
            kind: EntityKind::CaseStudy,
            back_reference_field: "services".into(),
            key_field: "name1".into(),
            attach_as: "case_studies".into(),
        };
        let study = record(json!({
            "name": "CaseStudy-0003",
            "services": [{"name1": "Branding"}, {"name1": "Design"}]
        }));

        assert!(back_references(&study, &cross_reference, "Design"));
        assert!(!back_references(&study, &cross_reference, "Motion"));
    }

    #[test]
    fn test_presets_by_name() {
        for name in EnrichmentPlan::PRESETS {
            assert!(EnrichmentPlan::preset(name).is_some(), "{name}");
        }
        assert!(EnrichmentPlan::preset("nope").is_none());

        let plan = EnrichmentPlan::pilot_programme();
        assert!(plan.cross_reference.is_none());
        assert!(plan.target.as_ref().unwrap().fields.is_empty());
    }
}
