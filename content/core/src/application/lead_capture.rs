// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0
//! Lead Capture Service
//!
//! Submits visitor forms (contact, pilot applications, job applications) as
//! new CMS records, optionally with an uploaded attachment.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::context::ContentContext;
use crate::domain::errors::ContentError;
use crate::domain::forms::LeadForm;
use crate::domain::record::CmsRecord;
use crate::domain::resource::{ApiToken, FileUpload, ResourcePath, UploadedFile};

pub struct LeadCaptureService {
    ctx: Arc<ContentContext>,
}

impl LeadCaptureService {
    pub fn new(ctx: Arc<ContentContext>) -> Self {
        Self { ctx }
    }

    /// Validate locally, then create the record. Returns the created record.
    pub async fn submit(
        &self,
        form: &LeadForm,
        cancel: &CancellationToken,
    ) -> Result<CmsRecord, ContentError> {
        form.validate()?;
        let token = self.token()?;

        let path = ResourcePath::resource(form.kind.doctype());
        let created = self
            .ctx
            .client()
            .post(&path, &token, &form.to_body(), cancel)
            .await?;
        let record = CmsRecord::from_value(created)?;

        info!(form = %form.kind, name = record.name().unwrap_or_default(), "Form submitted");
        Ok(record)
    }

    /// Upload a file; the returned URL is absolute.
    pub async fn upload_attachment(
        &self,
        file: &FileUpload,
        cancel: &CancellationToken,
    ) -> Result<UploadedFile, ContentError> {
        if file.file_name.trim().is_empty() {
            return Err(ContentError::Validation("Attachment has no file name".to_string()));
        }
        let token = self.token()?;

        let mut uploaded = self.ctx.client().upload(file, &token, cancel).await?;
        uploaded.file_url = uploaded.absolute_url(self.ctx.content_host());

        info!(file_name = %uploaded.file_name, url = %uploaded.file_url, "Attachment uploaded");
        Ok(uploaded)
    }

    /// Upload `file`, store its URL in `field`, then submit.
    pub async fn submit_with_attachment(
        &self,
        form: &LeadForm,
        field: &str,
        file: &FileUpload,
        cancel: &CancellationToken,
    ) -> Result<CmsRecord, ContentError> {
        // Reject a bad form before spending an upload on it
        let mut pending = form.clone();
        pending.set(field, "pending-upload");
        pending.validate()?;

        let uploaded = self.upload_attachment(file, cancel).await?;
        let mut form = form.clone();
        form.set(field, uploaded.file_url);
        self.submit(&form, cancel).await
    }

    fn token(&self) -> Result<ApiToken, ContentError> {
        self.ctx.token().ok_or_else(ContentError::missing_token)
    }
}
