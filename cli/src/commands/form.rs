// Copyright (c) 2026 Alpheric Digital
// SPDX-License-Identifier: AGPL-3.0

//! Lead-capture commands
//!
//! Commands: submit, upload

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use alpheric_content_core::application::LeadCaptureService;
use alpheric_content_core::domain::forms::{FormKind, LeadForm};
use alpheric_content_core::domain::resource::FileUpload;

use crate::session::{Session, SessionOptions};

#[derive(Subcommand)]
pub enum FormCommand {
    /// Submit a form as a new CMS record
    Submit {
        /// Form doctype or alias (contact, pilot-application, job-applicant)
        #[arg(value_name = "FORM")]
        form: String,

        /// Field value as KEY=VALUE (repeatable; VALUE may be JSON)
        #[arg(short, long = "field", value_name = "KEY=VALUE")]
        fields: Vec<String>,

        /// File to upload and attach to the submission
        #[arg(long, value_name = "FILE")]
        attach: Option<PathBuf>,

        /// Field receiving the uploaded file's URL
        #[arg(long, default_value = "attachment", requires = "attach")]
        attach_field: String,
    },

    /// Upload a file and print its absolute URL
    Upload {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Store the file as private
        #[arg(long)]
        private: bool,
    },
}

pub async fn handle_command(command: FormCommand, options: SessionOptions) -> Result<()> {
    match command {
        FormCommand::Submit {
            form,
            fields,
            attach,
            attach_field,
        } => submit(options, &form, &fields, attach.as_deref(), &attach_field).await,
        FormCommand::Upload { file, private } => upload(options, &file, private).await,
    }
}

async fn submit(
    options: SessionOptions,
    form: &str,
    fields: &[String],
    attach: Option<&Path>,
    attach_field: &str,
) -> Result<()> {
    let form = build_form(parse_form_kind(form), fields)?;
    let session = Session::open(options)?;
    let cancel = session.cancel_on_interrupt();
    let service = LeadCaptureService::new(Arc::clone(&session.ctx));

    let record = match attach {
        Some(path) => {
            let file = read_upload(path, false)?;
            service
                .submit_with_attachment(&form, attach_field, &file, &cancel)
                .await
        }
        None => service.submit(&form, &cancel).await,
    }
    .map_err(|e| anyhow::anyhow!(e.user_message()))
    .with_context(|| format!("Failed to submit {}", form.kind))?;

    println!(
        "{}",
        format!(
            "✓ {} submitted: {}",
            form.kind,
            record.name().unwrap_or("(unnamed)")
        )
        .green()
    );
    Ok(())
}

async fn upload(options: SessionOptions, path: &Path, private: bool) -> Result<()> {
    let file = read_upload(path, private)?;
    let session = Session::open(options)?;
    let cancel = session.cancel_on_interrupt();

    let uploaded = LeadCaptureService::new(Arc::clone(&session.ctx))
        .upload_attachment(&file, &cancel)
        .await
        .with_context(|| format!("Failed to upload {}", path.display()))?;

    println!("{}", uploaded.file_url);
    Ok(())
}

pub fn parse_form_kind(form: &str) -> FormKind {
    match form.to_lowercase().replace(['_', ' '], "-").as_str() {
        "contact" | "contact-us" => FormKind::contact(),
        "pilot" | "pilot-application" => FormKind::pilot_application(),
        "job" | "job-applicant" | "careers" => FormKind::job_applicant(),
        _ => FormKind::new(form),
    }
}

/// Build a form from `KEY=VALUE` pairs; values that parse as JSON keep their type.
pub fn build_form(kind: FormKind, fields: &[String]) -> Result<LeadForm> {
    let mut form = LeadForm::new(kind);
    for pair in fields {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("Expected KEY=VALUE, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("Field name missing in '{}'", pair);
        }
        let value = serde_json::from_str::<Value>(raw)
            .ok()
            .filter(|v| !v.is_string())
            .unwrap_or_else(|| Value::String(raw.to_string()));
        form.set(key, value);
    }
    Ok(form)
}

fn read_upload(path: &Path, private: bool) -> Result<FileUpload> {
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;

    let mut upload = FileUpload::new(file_name, content).private(private);
    if let Some(content_type) = guess_content_type(path) {
        upload = upload.with_content_type(content_type);
    }
    Ok(upload)
}

fn guess_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        _ => return None,
    };
    Some(content_type)
}
