// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Lead-capture forms
//!
//! Visitors submit enquiries that land in the CMS as new records of a form
//! doctype. Validation here only catches what the CMS would reject anyway,
//! so a visitor gets feedback without a round trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::domain::errors::ContentError;

/// Doctype that receives a form submission
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormKind(String);

impl FormKind {
    pub const CONTACT: &'static str = "Contact Us";
    pub const PILOT_APPLICATION: &'static str = "Pilot Application";
    pub const JOB_APPLICANT: &'static str = "Job Applicant";

    pub fn new(doctype: impl Into<String>) -> Self {
        Self(doctype.into())
    }

    pub fn contact() -> Self {
        Self::new(Self::CONTACT)
    }

    pub fn pilot_application() -> Self {
        Self::new(Self::PILOT_APPLICATION)
    }

    pub fn job_applicant() -> Self {
        Self::new(Self::JOB_APPLICANT)
    }

    pub fn doctype(&self) -> &str {
        &self.0
    }

    pub fn required_fields(&self) -> &'static [&'static str] {
        match self.0.as_str() {
            Self::CONTACT => &["full_name", "email", "message"],
            Self::PILOT_APPLICATION => &["full_name", "email", "pilot"],
            Self::JOB_APPLICANT => &["applicant_name", "email_id"],
            _ => &[],
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const EMAIL_FIELDS: [&str; 2] = ["email", "email_id"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadForm {
    pub kind: FormKind,
    pub fields: Map<String, Value>,
}

impl LeadForm {
    pub fn new(kind: FormKind) -> Self {
        Self {
            kind,
            fields: Map::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn validate(&self) -> Result<(), ContentError> {
        let missing: Vec<&str> = self
            .kind
            .required_fields()
            .iter()
            .copied()
            .filter(|field| match self.fields.get(*field) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .collect();

        if !missing.is_empty() {
            return Err(ContentError::Validation(format!(
                "{} is missing required fields: {}",
                self.kind,
                missing.join(", ")
            )));
        }

        for field in EMAIL_FIELDS {
            if let Some(value) = self.fields.get(field).and_then(Value::as_str) {
                if !looks_like_email(value) {
                    return Err(ContentError::Validation(format!(
                        "'{}' is not a valid e-mail address",
                        value
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn to_body(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && domain.contains('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_form_requires_fields() {
        let form = LeadForm::new(FormKind::contact()).field("full_name", "Ada");
        let err = form.validate().unwrap_err();
        assert_eq!(
            err,
            ContentError::Validation(
                "Contact Us is missing required fields: email, message".to_string()
            )
        );
    }

    #[test]
    fn test_email_shape_is_checked() {
        let form = LeadForm::new(FormKind::contact())
            .field("full_name", "Ada")
            .field("email", "ada@invalid")
            .field("message", "Hello");
        assert!(matches!(form.validate(), Err(ContentError::Validation(_))));

        let form = form.field("email", "ada@alpheric.com");
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_custom_form_kinds_have_no_required_fields() {
        let form = LeadForm::new(FormKind::new("Newsletter Signup")).field("email", "a@b.co");
        assert!(form.validate().is_ok());
        assert_eq!(form.to_body()["email"], "a@b.co");
    }
}
