// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

//! In-Memory Resource Client
//!
//! Serves canned CMS responses without a network, for development and tests.
//! Responses are keyed by the unencoded resource path (query ignored); every
//! call is recorded so callers can assert on fan-out and de-duplication.
//!
//! # Usage
//!
//! ```ignore
//! let client = InMemoryResourceClient::new();
//! client.insert_record(EntityKind::CaseStudy, json!({"name": "CaseStudy-0001"}));
//! client.fail(&ResourcePath::detail(EntityKind::CaseStudy, "CaseStudy-0002"),
//!             ContentError::Http { status: 500, message: "boom".into() });
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::domain::entity::EntityKind;
use crate::domain::errors::ContentError;
use crate::domain::resource::{ApiToken, FileUpload, ResourceClient, ResourcePath, UploadedFile};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct InMemoryResourceClient {
    responses: Mutex<HashMap<String, Result<Value, ContentError>>>,
    latencies: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<RecordedCall>>,
    cancelled: Mutex<Vec<String>>,
    default_latency: Option<Duration>,
}

impl InMemoryResourceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, so concurrent callers overlap
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            default_latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn respond(&self, path: &ResourcePath, body: Value) {
        self.responses.lock().insert(path.to_string(), Ok(body));
    }

    pub fn fail(&self, path: &ResourcePath, error: ContentError) {
        self.responses.lock().insert(path.to_string(), Err(error));
    }

    pub fn delay(&self, path: &ResourcePath, latency: Duration) {
        self.latencies.lock().insert(path.to_string(), latency);
    }

    /// Register a detail record and append its name to the kind's listing
    pub fn insert_record(&self, kind: EntityKind, record: Value) {
        let name = record
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut responses = self.responses.lock();
        responses.insert(ResourcePath::detail(kind, &name).to_string(), Ok(record));

        let listing = responses
            .entry(ResourcePath::list(kind).to_string())
            .or_insert_with(|| Ok(Value::Array(Vec::new())));
        if let Ok(Value::Array(stubs)) = listing {
            stubs.push(json!({ "name": name }));
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, path: &ResourcePath) -> usize {
        let key = path.to_string();
        self.calls.lock().iter().filter(|call| call.path == key).count()
    }

    /// Paths whose in-progress request was cancelled
    pub fn cancelled_calls(&self) -> Vec<String> {
        self.cancelled.lock().clone()
    }

    async fn serve(
        &self,
        method: &'static str,
        path: &ResourcePath,
        body: Option<Value>,
        cancel: &CancellationToken,
    ) -> Result<Option<Value>, ContentError> {
        let key = path.to_string();
        self.calls.lock().push(RecordedCall {
            method,
            path: key.clone(),
            body,
        });

        let latency = self.latencies.lock().get(&key).copied().or(self.default_latency);
        if let Some(latency) = latency {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.cancelled.lock().push(key);
                    return Err(ContentError::Cancelled);
                }
                _ = tokio::time::sleep(latency) => {}
            }
        }
        if cancel.is_cancelled() {
            self.cancelled.lock().push(key);
            return Err(ContentError::Cancelled);
        }

        self.responses.lock().get(&key).cloned().transpose()
    }
}

#[async_trait]
impl ResourceClient for InMemoryResourceClient {
    async fn get(
        &self,
        path: &ResourcePath,
        _token: &ApiToken,
        cancel: &CancellationToken,
    ) -> Result<Value, ContentError> {
        self.serve("GET", path, None, cancel)
            .await?
            .ok_or_else(|| ContentError::Http {
                status: 404,
                message: format!("{} not found", path),
            })
    }

    async fn post(
        &self,
        path: &ResourcePath,
        _token: &ApiToken,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ContentError> {
        let canned = self.serve("POST", path, Some(body.clone()), cancel).await?;
        Ok(canned.unwrap_or_else(|| {
            // Echo the submission back the way the CMS does, with a name
            let mut created = body.clone();
            if let Value::Object(fields) = &mut created {
                let count = self.calls.lock().iter().filter(|c| c.method == "POST").count();
                fields
                    .entry("name")
                    .or_insert_with(|| json!(format!("SUB-{:04}", count)));
            }
            created
        }))
    }

    async fn upload(
        &self,
        file: &FileUpload,
        _token: &ApiToken,
        cancel: &CancellationToken,
    ) -> Result<UploadedFile, ContentError> {
        let path = ResourcePath::method(crate::domain::resource::UPLOAD_METHOD);
        let body = json!({
            "file_name": file.file_name,
            "is_private": file.is_private,
            "folder": file.folder,
            "size": file.content.len(),
        });

        match self.serve("UPLOAD", &path, Some(body), cancel).await? {
            Some(canned) => serde_json::from_value(canned).map_err(ContentError::from),
            None => Ok(UploadedFile {
                file_url: format!("/files/{}", file.file_name),
                file_name: file.file_name.clone(),
            }),
        }
    }
}
