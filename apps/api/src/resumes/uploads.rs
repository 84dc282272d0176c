//! Multipart upload intake: extension checks and size limits.
//!
//! Files are validated by extension only; content is not sniffed.

use axum::extract::Multipart;
use bytes::Bytes;

use crate::errors::AppError;

pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Resume,
    Photo,
    Video,
}

impl UploadKind {
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Resume => &["pdf", "docx", "doc", "txt"],
            UploadKind::Photo => &["jpg", "jpeg", "png", "gif", "webp"],
            UploadKind::Video => &["webm"],
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            UploadKind::Resume => MAX_RESUME_BYTES,
            UploadKind::Photo => MAX_PHOTO_BYTES,
            UploadKind::Video => MAX_VIDEO_BYTES,
        }
    }

    pub fn storage_prefix(&self) -> &'static str {
        match self {
            UploadKind::Resume => "resumes",
            UploadKind::Photo => "photos",
            UploadKind::Video => "videos",
        }
    }
}

/// Lower-cased extension of `filename` if it is allowed for `kind`.
pub fn validate_extension(kind: UploadKind, filename: &str) -> Result<String, AppError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if kind.allowed_extensions().contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::Validation(format!(
            "Unsupported file type. Allowed: {}",
            kind.allowed_extensions()
                .iter()
                .map(|e| format!(".{e}"))
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }
}

pub fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

/// A validated file plus any plain text fields sent alongside it.
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub extension: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    pub fields: Vec<(String, String)>,
}

impl UploadForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn require_file(self) -> Result<(UploadedFile, Vec<(String, String)>), AppError> {
        match self.file {
            Some(file) => Ok((file, self.fields)),
            None => Err(AppError::Validation("No file uploaded".into())),
        }
    }
}

/// Reads a multipart body; the part named `file_field` is validated against `kind`.
pub async fn read_upload(
    mut multipart: Multipart,
    file_field: &str,
    kind: UploadKind,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let filename = field
                .file_name()
                .map(str::to_string)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| AppError::Validation("No file selected".into()))?;
            let extension = validate_extension(kind, &filename)?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            if bytes.is_empty() {
                return Err(AppError::Validation("Uploaded file is empty".into()));
            }
            if bytes.len() > kind.max_bytes() {
                return Err(AppError::Validation(format!(
                    "File too large. Maximum size is {} MB",
                    kind.max_bytes() / (1024 * 1024)
                )));
            }
            form.file = Some(UploadedFile {
                filename,
                extension,
                bytes,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("Invalid form field {name}: {e}")))?;
            form.fields.push((name, value));
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_extensions() {
        assert_eq!(validate_extension(UploadKind::Resume, "CV.PDF").unwrap(), "pdf");
        assert_eq!(validate_extension(UploadKind::Resume, "cv.final.docx").unwrap(), "docx");
        assert!(validate_extension(UploadKind::Resume, "cv.exe").is_err());
        assert!(validate_extension(UploadKind::Resume, "resume").is_err());
    }

    #[test]
    fn test_photo_and_video_extensions() {
        assert!(validate_extension(UploadKind::Photo, "me.webp").is_ok());
        assert!(validate_extension(UploadKind::Photo, "me.pdf").is_err());
        assert!(validate_extension(UploadKind::Video, "answer.webm").is_ok());
        assert!(validate_extension(UploadKind::Video, "answer.mp4").is_err());
    }

    #[test]
    fn test_error_lists_allowed_types() {
        match validate_extension(UploadKind::Resume, "x.rtf") {
            Err(AppError::Validation(msg)) => assert!(msg.contains(".pdf, .docx, .doc, .txt")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_form_field_lookup_ignores_blanks() {
        let form = UploadForm {
            file: None,
            fields: vec![("org".into(), "techcorp".into()), ("ref".into(), " ".into())],
        };
        assert_eq!(form.field("org"), Some("techcorp"));
        assert_eq!(form.field("ref"), None);
        assert!(form.require_file().is_err());
    }
}
