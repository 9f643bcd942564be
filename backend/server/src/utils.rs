use std::collections::HashMap;

use axum::{
    Json,
    extract::{
        Multipart,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
};
use uuid::Uuid;

use crate::{
    error::AppError,
    uploads::{ImagePolicy, UploadedFile},
};

/// Multipart form with at most one validated image in it.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl UploadForm {
    /// Non-empty text value of a field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

fn malformed(e: MultipartError) -> AppError {
    AppError::MalformedPayload(e.body_text())
}

pub fn json_payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(payload)| payload)
        .map_err(|e| AppError::MalformedPayload(e.body_text()))
}

/// Unknown and unparsable ids are the same thing to a caller.
pub fn parse_id(raw: &str, not_found: &'static str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::not_found(not_found))
}

/// Reads every field of the form. The part named `file_field` is treated as the upload when it
/// carries a file name, and is size-checked while streaming so oversized files never get buffered
/// past the limit.
pub async fn read_upload_form(
    multipart: Result<Multipart, MultipartRejection>,
    file_field: &str,
    policy: &ImagePolicy,
) -> Result<UploadForm, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::MalformedPayload(e.body_text()))?;
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        let Some(file_name) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(malformed)?;
            form.fields.insert(name, value);
            continue;
        };

        // Browsers send an empty file name when no file was picked.
        if name != file_field || file_name.is_empty() {
            continue;
        }

        if form.file.is_some() {
            return Err(AppError::validation(format!(
                "Only one file may be uploaded in field {file_field}"
            )));
        }

        let extension = policy.check_type(&file_name, field.content_type())?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(malformed)? {
            policy.check_size(bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        #[cfg(feature = "verbose")]
        tracing::info!(%file_name, bytes = bytes.len(), "Received upload");

        form.file = Some(UploadedFile {
            extension,
            bytes: bytes.into(),
        });
    }

    Ok(form)
}

/// Positive integer coercion for numeric form fields.
pub fn positive_dimension(form: &UploadForm, name: &str) -> Result<Option<u32>, AppError> {
    form.text(name)
        .map(|raw| match raw.trim().parse::<u32>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(AppError::validation(format!(
                "{name} must be a positive integer"
            ))),
        })
        .transpose()
}
