// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Remote Resource Contract
//!
//! Domain interface for the CMS REST API. Caches and orchestrators talk to
//! this trait only; `infrastructure::cms_client` provides the HTTP adapter
//! and `infrastructure::in_memory_client` an offline one.
//!
//! # Wire conventions
//!
//! - `GET /api/resource/<Doctype>` lists records as `{"data": [{"name": ..}]}`
//! - `GET /api/resource/<Doctype>/<name>` returns `{"data": {..}}`
//! - `POST /api/resource/<Doctype>` creates a record (form submissions)
//! - `POST /api/method/uploadfile` accepts multipart uploads and answers
//!   `{"message": {"file_url": .., "file_name": ..}}`
//! - every call carries `Authorization: token <key:secret>`

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tokio_util::sync::CancellationToken;

use crate::domain::attachment::normalize_url;
use crate::domain::entity::EntityKind;
use crate::domain::errors::ContentError;

pub const UPLOAD_METHOD: &str = "uploadfile";

/// Path of a CMS resource relative to the API base URL.
///
/// Segments are kept unencoded; adapters percent-encode them when building
/// the request URL. `Display` renders the unencoded path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl ResourcePath {
    /// `/api/resource/<Doctype>`
    pub fn list(kind: EntityKind) -> Self {
        Self::resource(kind.doctype())
    }

    /// `/api/resource/<Doctype>/<name>`
    pub fn detail(kind: EntityKind, name: &str) -> Self {
        Self {
            segments: vec![
                "api".to_string(),
                "resource".to_string(),
                kind.doctype().to_string(),
                name.to_string(),
            ],
            query: Vec::new(),
        }
    }

    /// `/api/resource/<doctype>` for doctypes outside [`EntityKind`] (forms).
    pub fn resource(doctype: &str) -> Self {
        Self {
            segments: vec!["api".to_string(), "resource".to_string(), doctype.to_string()],
            query: Vec::new(),
        }
    }

    /// `/api/method/<method>`
    pub fn method(method: &str) -> Self {
        Self {
            segments: vec!["api".to_string(), "method".to_string(), method.to_string()],
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

/// API credential sent as `Authorization: token <value>`.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> String {
        format!("token {}", self.0)
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

/// A file to attach to a form submission
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content: Bytes,
    pub content_type: Option<String>,
    pub is_private: bool,
    /// CMS folder, e.g. `Home/Attachments`
    pub folder: String,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content: content.into(),
            content_type: None,
            is_private: false,
            folder: "Home/Attachments".to_string(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    pub fn in_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_url: String,
    pub file_name: String,
}

impl UploadedFile {
    pub fn absolute_url(&self, host: &str) -> String {
        normalize_url(&self.file_url, host)
    }
}

/// Authenticated access to the CMS REST API.
///
/// Implementations unwrap the `{"data": ..}` envelope and map failures onto
/// [`ContentError`]: `Network` when no response arrived, `Http` otherwise.
/// A cancelled token aborts the request with `ContentError::Cancelled`.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(
        &self,
        path: &ResourcePath,
        token: &ApiToken,
        cancel: &CancellationToken,
    ) -> Result<Value, ContentError>;

    async fn post(
        &self,
        path: &ResourcePath,
        token: &ApiToken,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ContentError>;

    async fn upload(
        &self,
        file: &FileUpload,
        token: &ApiToken,
        cancel: &CancellationToken,
    ) -> Result<UploadedFile, ContentError>;
}
