use crate::errors::ServiceError;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use bytes::Bytes;
use std::collections::HashMap;

/// The file part of a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Bytes,
}

/// A multipart body read into memory: text fields by name plus the `file` part.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    file: Option<UploadedFile>,
}

impl MultipartForm {
    /// Trimmed text field; blank values read as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn require_text(&self, name: &str) -> Result<&str, ServiceError> {
        self.text(name)
            .ok_or_else(|| ServiceError::ValidationError(format!("{} is required", name)))
    }

    pub fn take_file(&mut self) -> Result<UploadedFile, ServiceError> {
        self.file
            .take()
            .ok_or_else(|| ServiceError::ValidationError("file is required".to_string()))
    }
}

fn multipart_error(e: MultipartError) -> ServiceError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServiceError::PayloadTooLarge(e.body_text())
    } else {
        ServiceError::ValidationError(format!("invalid multipart body: {}", e.body_text()))
    }
}

/// Reads every part of `multipart`. The part named `file` is kept as bytes,
/// everything else as text.
pub async fn read_multipart(mut multipart: Multipart) -> Result<MultipartForm, ServiceError> {
    let mut form = MultipartForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let file_name = field
                .file_name()
                .map(str::to_string)
                .unwrap_or_else(|| "upload".to_string());
            let content = field.bytes().await.map_err(multipart_error)?;
            form.file = Some(UploadedFile { file_name, content });
        } else if !name.is_empty() {
            let value = field.text().await.map_err(multipart_error)?;
            form.fields.insert(name, value);
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_read_as_absent() {
        let mut form = MultipartForm::default();
        form.fields.insert("paid_on".into(), "  ".into());
        form.fields.insert("month".into(), " 2025-01 ".into());

        assert_eq!(form.text("paid_on"), None);
        assert_eq!(form.text("month"), Some("2025-01"));
        assert!(matches!(
            form.require_text("paid_on"),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(form.take_file().is_err());
    }
}
