// multipart/form-data bodies of the upload routes

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
};

use crate::error::{ApiError, ApiResult};

/// Per-file ceiling.
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn content_type_or_default(&self) -> &str {
        self.content_type.as_deref().unwrap_or("application/octet-stream")
    }
}

/// A fully buffered form: text fields by name, file parts by name.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl UploadForm {
    pub async fn read(multipart: Multipart) -> ApiResult<Self> {
        Self::read_with_limit(multipart, MAX_FILE_SIZE).await
    }

    pub async fn read_with_limit(mut multipart: Multipart, max_file_size: usize) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await.map_err(multipart_error)?;
                form.fields.insert(name, value);
                continue;
            };

            let content_type = field.content_type().map(str::to_string);
            let mut buffer = Vec::new();
            while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
                if buffer.len() + chunk.len() > max_file_size {
                    return Err(ApiError::PayloadTooLarge(format!(
                        "File '{}' exceeds {} bytes",
                        name, max_file_size
                    )));
                }
                buffer.extend_from_slice(&chunk);
            }

            // Browsers send an empty part when no file was picked
            if buffer.is_empty() {
                continue;
            }

            form.files.insert(name, UploadedFile {
                file_name: Some(file_name).filter(|n| !n.is_empty()),
                content_type,
                bytes: Bytes::from(buffer),
            });
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn require_text(&self, name: &str) -> ApiResult<String> {
        self.text(name)
            .filter(|value| !value.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::validation(format!("Field '{}' is required", name)))
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Request body is too large".to_string())
    } else {
        ApiError::validation(format!("Invalid multipart body: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{header::CONTENT_TYPE, Request},
    };

    const BOUNDARY: &str = "lingo-boundary";

    fn part(name: &str, file_name: Option<&str>, content: &str) -> String {
        match file_name {
            Some(file_name) => format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: audio/wav\r\n\r\n{content}\r\n"
            ),
            None => format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{content}\r\n"
            ),
        }
    }

    async fn multipart(parts: &[String]) -> Multipart {
        let body = format!("{}--{BOUNDARY}--\r\n", parts.concat());
        let request = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap();

        Multipart::from_request(request, &()).await.unwrap()
    }

    #[tokio::test]
    async fn test_reads_fields_and_files() {
        let body = multipart(&[
            part("title", None, "Greetings"),
            part("file", Some("hello.wav"), "RIFFdata"),
        ])
        .await;

        let mut form = UploadForm::read(body).await.unwrap();

        assert_eq!(form.text("title"), Some("Greetings"));
        let file = form.take_file("file").unwrap();
        assert_eq!(file.file_name.as_deref(), Some("hello.wav"));
        assert_eq!(file.content_type_or_default(), "audio/wav");
        assert_eq!(&file.bytes[..], b"RIFFdata");
        assert!(form.take_file("file").is_none());
    }

    #[tokio::test]
    async fn test_empty_file_part_counts_as_missing() {
        let body = multipart(&[part("file", Some(""), "")]).await;

        let mut form = UploadForm::read(body).await.unwrap();
        assert!(form.take_file("file").is_none());
    }

    #[tokio::test]
    async fn test_oversized_file_is_rejected() {
        let body = multipart(&[part("file", Some("big.wav"), "0123456789")]).await;

        let err = UploadForm::read_with_limit(body, 8).await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_require_text() {
        let body = multipart(&[part("name", None, "  ")]).await;
        let form = UploadForm::read(body).await.unwrap();

        assert!(matches!(form.require_text("name"), Err(ApiError::Validation(_))));
        assert!(form.require_text("email").is_err());
    }
}
