// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

// CMS REST Adapter
//
// Anti-Corruption Layer for the CMS REST API. Translates ResourcePath into
// HTTP requests, unwraps the response envelopes and maps failures onto
// ContentError. Every request races its CancellationToken.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::domain::errors::ContentError;
use crate::domain::resource::{
    ApiToken, FileUpload, ResourceClient, ResourcePath, UploadedFile, UPLOAD_METHOD,
};
use crate::domain::site_config::CmsConfig;

pub struct CmsClient {
    client: Client,
    base_url: Url,
}

impl CmsClient {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ContentError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ContentError::Decode(format!("Invalid CMS base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ContentError::Decode(format!(
                "CMS base URL '{}' cannot carry a path",
                base_url
            )));
        }

        let mut builder = Client::builder().user_agent(concat!("alpheric-content/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ContentError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &CmsConfig) -> Result<Self, ContentError> {
        Self::new(&config.base_url, Some(Duration::from_secs(config.timeout_seconds)))
    }

    /// Absolute, percent-encoded URL for a resource path
    pub fn url_for(&self, path: &ResourcePath) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in path.segments() {
                segments.push(segment);
            }
        }
        if !path.query().is_empty() {
            url.query_pairs_mut().extend_pairs(path.query());
        }
        url
    }

    async fn send(
        &self,
        request: RequestBuilder,
        envelope: &str,
        cancel: &CancellationToken,
    ) -> Result<Value, ContentError> {
        let exchange = async {
            let response = request
                .send()
                .await
                .map_err(|e| ContentError::Network(e.to_string()))?;
            read_body(response, envelope).await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ContentError::Cancelled),
            result = exchange => result,
        }
    }
}

async fn read_body(response: Response, envelope: &str) -> Result<Value, ContentError> {
    let status = response.status();

    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        return Err(ContentError::Http {
            status: status.as_u16(),
            message,
        });
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| ContentError::Decode(format!("Failed to parse response: {}", e)))?;

    Ok(unwrap_envelope(body, envelope))
}

/// `{"<key>": T}` becomes `T`; anything else is returned as-is
fn unwrap_envelope(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

#[async_trait]
impl ResourceClient for CmsClient {
    async fn get(
        &self,
        path: &ResourcePath,
        token: &ApiToken,
        cancel: &CancellationToken,
    ) -> Result<Value, ContentError> {
        let url = self.url_for(path);
        debug!(%url, "GET");

        let request = self
            .client
            .get(url)
            .header(AUTHORIZATION, token.header_value());
        self.send(request, "data", cancel).await
    }

    async fn post(
        &self,
        path: &ResourcePath,
        token: &ApiToken,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, ContentError> {
        let url = self.url_for(path);
        debug!(%url, "POST");

        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, token.header_value())
            .json(body);
        self.send(request, "data", cancel).await
    }

    async fn upload(
        &self,
        file: &FileUpload,
        token: &ApiToken,
        cancel: &CancellationToken,
    ) -> Result<UploadedFile, ContentError> {
        let url = self.url_for(&ResourcePath::method(UPLOAD_METHOD));
        debug!(%url, file_name = %file.file_name, size = file.content.len(), "UPLOAD");

        let mut part = Part::bytes(file.content.to_vec()).file_name(file.file_name.clone());
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                ContentError::Validation(format!("Invalid content type '{}': {}", content_type, e))
            })?;
        }

        let form = Form::new()
            .part("file", part)
            .text("is_private", if file.is_private { "1" } else { "0" })
            .text("folder", file.folder.clone());

        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, token.header_value())
            .multipart(form);

        let body = self.send(request, "message", cancel).await?;
        serde_json::from_value(body)
            .map_err(|e| ContentError::Decode(format!("Unexpected upload response: {}", e)))
    }
}
