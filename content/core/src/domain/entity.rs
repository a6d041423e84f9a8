// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Entity kinds
//!
//! Every CMS record belongs to exactly one doctype. The website reads a fixed
//! set of them; each gets its own cache in the application context.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CMS doctypes consumed by the website.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    CaseStudy,
    Pilot,
    SubPilot,
    ServicePageL1,
    ServicePageL2,
    ServicePageL3,
    ServicePageL4,
    DesignPageL2,
    IndustryL1,
    IndustryL2,
    BrandClient,
    Insight,
}

impl EntityKind {
    pub const ALL: [EntityKind; 12] = [
        EntityKind::CaseStudy,
        EntityKind::Pilot,
        EntityKind::SubPilot,
        EntityKind::ServicePageL1,
        EntityKind::ServicePageL2,
        EntityKind::ServicePageL3,
        EntityKind::ServicePageL4,
        EntityKind::DesignPageL2,
        EntityKind::IndustryL1,
        EntityKind::IndustryL2,
        EntityKind::BrandClient,
        EntityKind::Insight,
    ];

    /// Resource name under `/api/resource/`.
    pub fn doctype(&self) -> &'static str {
        match self {
            EntityKind::CaseStudy => "Case Study",
            EntityKind::Pilot => "Pilot",
            EntityKind::SubPilot => "Sub Pilot",
            EntityKind::ServicePageL1 => "Service Page L1",
            EntityKind::ServicePageL2 => "Service Page L2",
            EntityKind::ServicePageL3 => "Service Page L3",
            EntityKind::ServicePageL4 => "Service Page L4",
            EntityKind::DesignPageL2 => "Design Page L2",
            EntityKind::IndustryL1 => "Industry L1",
            EntityKind::IndustryL2 => "Industry L2",
            EntityKind::BrandClient => "Brand Client",
            EntityKind::Insight => "Insights",
        }
    }

    /// Field carrying the human-readable title that slugs are derived from.
    pub fn title_field(&self) -> &'static str {
        match self {
            EntityKind::CaseStudy => "full_title",
            EntityKind::Pilot => "pilot_name",
            EntityKind::SubPilot => "sub_pilot_name",
            EntityKind::IndustryL1 | EntityKind::IndustryL2 => "industry_name",
            EntityKind::BrandClient => "client_name",
            _ => "title",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.doctype())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown entity kind: '{0}'")]
pub struct UnknownEntityKind(pub String);

impl FromStr for EntityKind {
    type Err = UnknownEntityKind;

    /// Accepts the doctype ("Case Study"), the variant name ("CaseStudy") or a
    /// kebab/snake alias ("case-study"), ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        let kind = match folded.as_str() {
            "casestudy" | "casestudies" => EntityKind::CaseStudy,
            "pilot" | "pilots" => EntityKind::Pilot,
            "subpilot" | "subpilots" => EntityKind::SubPilot,
            "servicepagel1" => EntityKind::ServicePageL1,
            "servicepagel2" => EntityKind::ServicePageL2,
            "servicepagel3" => EntityKind::ServicePageL3,
            "servicepagel4" => EntityKind::ServicePageL4,
            "designpagel2" => EntityKind::DesignPageL2,
            "industryl1" => EntityKind::IndustryL1,
            "industryl2" => EntityKind::IndustryL2,
            "brandclient" | "brandclients" => EntityKind::BrandClient,
            "insight" | "insights" => EntityKind::Insight,
            _ => return Err(UnknownEntityKind(s.to_string())),
        };
        Ok(kind)
    }
}
