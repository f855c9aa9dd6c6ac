//! Uploaded document handling: extension checks, safe file names and text
//! extraction.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt", "png", "jpg", "jpeg"];

pub const IMAGE_PLACEHOLDER_TEXT: &str =
    "Text extracted from the image would appear here. OCR is not available on this server.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Text,
    Image,
}

impl DocumentKind {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "txt" => Some(DocumentKind::Text),
            "png" | "jpg" | "jpeg" => Some(DocumentKind::Image),
            _ => None,
        }
    }

    pub fn from_filename(filename: &str) -> Option<Self> {
        file_extension(filename).and_then(Self::from_extension)
    }
}

/// Extension after the last dot, if the name has one.
pub fn file_extension(filename: &str) -> Option<&str> {
    let (_, extension) = filename.rsplit_once('.')?;
    (!extension.is_empty()).then_some(extension)
}

/// File name without its final extension.
pub fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

pub fn is_allowed_file(filename: &str, allowed_extensions: &[String]) -> bool {
    file_extension(filename)
        .map(|ext| allowed_extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// Reduce a client supplied name to a safe single path component.
///
/// Path separators and anything outside `[A-Za-z0-9._-]` are dropped,
/// whitespace becomes `_`, and leading dots or underscores are stripped so
/// the result can never be hidden or climb out of the upload directory.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let cleaned: String = base
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' => Some(c),
            c if c.is_whitespace() => Some('_'),
            _ => None,
        })
        .collect();

    let trimmed = cleaned.trim_start_matches(['.', '_']).to_string();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Best-effort text extraction. PDF failures are logged and give empty text.
pub fn extract_text(kind: DocumentKind, bytes: &[u8]) -> String {
    match kind {
        DocumentKind::Pdf => extract_pdf_text(bytes),
        DocumentKind::Text => String::from_utf8_lossy(bytes).into_owned(),
        DocumentKind::Image => IMAGE_PLACEHOLDER_TEXT.to_string(),
    }
}

fn extract_pdf_text(bytes: &[u8]) -> String {
    // pdf-extract panics on some malformed documents
    let extracted = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes));

    match extracted {
        Ok(Ok(text)) => {
            debug!(text_length = text.len(), "Extracted text from PDF");
            text
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Failed to extract text from PDF");
            String::new()
        }
        Err(_) => {
            warn!("PDF extractor panicked on malformed document");
            String::new()
        }
    }
}

/// Persist the raw upload under its sanitised name.
pub async fn save_upload(upload_dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(upload_dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", upload_dir.display()))?;

    let path = upload_dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write upload {}", path.display()))?;

    debug!(path = %path.display(), size = bytes.len(), "Saved uploaded file");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> Vec<String> {
        DEFAULT_ALLOWED_EXTENSIONS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_document_kind_from_filename() {
        assert_eq!(DocumentKind::from_filename("notes.pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_filename("NOTES.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_filename("a.b.txt"), Some(DocumentKind::Text));
        assert_eq!(DocumentKind::from_filename("scan.JPeG"), Some(DocumentKind::Image));
        assert_eq!(DocumentKind::from_filename("archive.zip"), None);
        assert_eq!(DocumentKind::from_filename("README"), None);
        assert_eq!(DocumentKind::from_filename("trailing."), None);
    }

    #[test]
    fn test_allowed_files() {
        assert!(is_allowed_file("lecture.pdf", &allowed()));
        assert!(is_allowed_file("lecture.TXT", &allowed()));
        assert!(!is_allowed_file("lecture.docx", &allowed()));
        assert!(!is_allowed_file("lecture", &allowed()));
        assert!(!is_allowed_file("photo.png", &["pdf".to_string()]));
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("biology notes.pdf"), "biology notes");
        assert_eq!(file_stem("archive.tar.gz"), "archive.tar");
        assert_eq!(file_stem("README"), "README");
        assert_eq!(file_stem(".env"), ".env");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Notes.pdf").as_deref(), Some("My_Notes.pdf"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\Users\\me\\cours.txt").as_deref(), Some("cours.txt"));
        assert_eq!(sanitize_filename("..hidden.txt").as_deref(), Some("hidden.txt"));
        assert_eq!(sanitize_filename("résumé.pdf").as_deref(), Some("rsum.pdf"));
        assert_eq!(sanitize_filename("***"), None);
        assert_eq!(sanitize_filename(""), None);
    }

    #[test]
    fn test_extract_text_passthrough_and_placeholder() {
        assert_eq!(extract_text(DocumentKind::Text, "Hello world.".as_bytes()), "Hello world.");
        assert_eq!(extract_text(DocumentKind::Image, b"\x89PNG"), IMAGE_PLACEHOLDER_TEXT);
    }

    #[test]
    fn test_invalid_pdf_yields_empty_text() {
        assert_eq!(extract_text(DocumentKind::Pdf, b"definitely not a pdf"), "");
    }

    #[tokio::test]
    async fn test_save_upload_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads");
        let path = save_upload(&nested, "notes.txt", b"content").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"content");
    }
}
