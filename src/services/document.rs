// Document Extraction Service
// PDF / DOCX / plain text to normalized raw text, run on the blocking pool

use async_trait::async_trait;
use regex::Regex;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::services::text_processor::normalize_extracted_text;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to read document: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported document type: {0}")]
    UnsupportedFormat(String),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("DOCX extraction failed: {0}")]
    Docx(String),
    #[error("No text could be extracted from {0}")]
    Empty(PathBuf),
    #[error("Extraction task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError>;
}

/// Extracts by file extension: `.pdf`, `.docx`, `.txt`, `.md`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileExtractor;

#[async_trait]
impl DocumentExtractor for FileExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || extract_document_text(&owned))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))??;

        let normalized = normalize_extracted_text(&text);
        if normalized.is_empty() {
            return Err(ExtractionError::Empty(path.to_path_buf()));
        }
        info!(
            "[EXTRACT] {} chars={}",
            path.display(),
            normalized.chars().count()
        );
        Ok(normalized)
    }
}

/// Blocking extraction. Callers on the runtime should go through `FileExtractor`.
pub fn extract_document_text(path: &Path) -> Result<String, ExtractionError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "pdf" => {
            let bytes = fs::read(path)?;
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractionError::Pdf(e.to_string()))
        }
        "docx" => {
            let bytes = fs::read(path)?;
            extract_docx_text(&bytes)
        }
        "txt" | "text" | "md" | "markdown" => Ok(fs::read_to_string(path)?),
        other => Err(ExtractionError::UnsupportedFormat(if other.is_empty() {
            "(no extension)".to_string()
        } else {
            other.to_string()
        })),
    }
}

fn extract_docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    match docx_paragraphs(bytes) {
        Ok(text) if !text.trim().is_empty() => Ok(text),
        Ok(_) => docx_xml_fallback(bytes),
        Err(e) => {
            warn!("[EXTRACT] docx-rs failed ({}), reading word/document.xml directly", e);
            docx_xml_fallback(bytes)
        }
    }
}

fn docx_paragraphs(bytes: &[u8]) -> Result<String, ExtractionError> {
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx(e.to_string()))?;
    let mut lines = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for p_child in &paragraph.children {
                if let ParagraphChild::Run(run) = p_child {
                    for r_child in &run.children {
                        match r_child {
                            RunChild::Text(t) => line.push_str(&t.text),
                            RunChild::Tab(_) => line.push('\t'),
                            _ => {}
                        }
                    }
                }
            }
            lines.push(line);
        }
    }
    Ok(lines.join("\n"))
}

fn docx_text_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|</w:p>").expect("docx xml regex"))
}

fn docx_xml_fallback(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("not a zip archive: {}", e)))?;
    let mut document = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(format!("missing word/document.xml: {}", e)))?;

    let mut xml = String::new();
    document.read_to_string(&mut xml)?;

    let mut output = String::new();
    for caps in docx_text_re().captures_iter(&xml) {
        match caps.get(1) {
            Some(text) => output.push_str(&unescape_xml(text.as_str())),
            None => output.push('\n'),
        }
    }
    Ok(output)
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_extract_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.txt");
        fs::write(&path, "Abstract\r\nA \u{201c}robust\u{201d} method.\n").unwrap();

        let text = FileExtractor.extract(&path).await.unwrap();
        assert_eq!(text, "Abstract\nA \"robust\" method.");
    }

    #[tokio::test]
    async fn test_empty_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.md");
        fs::write(&path, "  \n\n ").unwrap();

        let err = FileExtractor.extract(&path).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Empty(_)));
    }

    #[tokio::test]
    async fn test_missing_and_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = FileExtractor.extract(&dir.path().join("nope.pdf")).await;
        assert!(matches!(missing, Err(ExtractionError::Io(_))));

        let odd = dir.path().join("paper.odt");
        fs::write(&odd, "x").unwrap();
        let unsupported = FileExtractor.extract(&odd).await;
        assert!(matches!(unsupported, Err(ExtractionError::UnsupportedFormat(ext)) if ext == "odt"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        fs::write(&path, b"this is not a pdf").unwrap();
        assert!(FileExtractor.extract(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_docx_raw_xml_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.docx");
        {
            let file = fs::File::create(&path).unwrap();
            let mut zip = zip::ZipWriter::new(file);
            zip.start_file("word/document.xml", zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(
                br#"<w:document><w:body><w:p><w:r><w:t>Abstract</w:t></w:r></w:p><w:p><w:r><w:t xml:space="preserve">Fish &amp; chips </w:t></w:r><w:r><w:t>work.</w:t></w:r></w:p></w:body></w:document>"#,
            )
            .unwrap();
            zip.finish().unwrap();
        }

        let text = FileExtractor.extract(&path).await.unwrap();
        assert_eq!(text, "Abstract\nFish & chips work.");
    }
}
