//! Reference documents on disk.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;

use crate::error::{RetrievalError, StorageError};
use crate::processor::xml::push_reference;
use crate::sanitize::{extension, safe_filename, truncate_chars};

/// Extensions accepted for upload.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "docx"];

const PREVIEW_CHARS: usize = 200;

/// A reference document ready for indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Stable id; re-ingesting the same id replaces its chunks.
    pub id: String,
    pub source_file: String,
    pub text: String,
}

impl Document {
    pub fn new(source_file: &str, text: &str) -> Self {
        Self {
            id: source_file.to_string(),
            source_file: source_file.to_string(),
            text: text.to_string(),
        }
    }
}

/// Listing entry for a stored document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    /// Preview of the first characters, for plain-text documents only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

pub fn is_supported_document(name: &str) -> bool {
    extension(name).is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

fn is_plain_text(ext: &str) -> bool {
    matches!(ext, "txt" | "md")
}

/// Writes an uploaded document into `directory`, replacing a same-named one.
pub async fn save_document(
    directory: &Path,
    name: &str,
    bytes: &[u8],
) -> Result<PathBuf, StorageError> {
    tokio::fs::create_dir_all(directory)
        .await
        .map_err(|e| StorageError::CreateDirectory {
            path: directory.to_path_buf(),
            source: e,
        })?;

    let path = directory.join(safe_filename(name));
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
    Ok(path)
}

async fn file_entries(directory: &Path) -> Result<Vec<PathBuf>, RetrievalError> {
    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(RetrievalError::ReadDocument {
                path: directory.to_path_buf(),
                source: e,
            })
        }
    };

    let mut files = Vec::new();
    loop {
        let entry = entries
            .next_entry()
            .await
            .map_err(|e| RetrievalError::ReadDocument {
                path: directory.to_path_buf(),
                source: e,
            })?;
        let Some(entry) = entry else { break };
        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if is_file {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Reads every indexable document in `directory`.
///
/// Plain text and DOCX are read; PDFs are skipped with a warning. A missing
/// directory yields no documents.
pub async fn load_directory(directory: &Path) -> Result<Vec<Document>, RetrievalError> {
    let mut documents = Vec::new();

    for path in file_entries(directory).await? {
        let name = file_name(&path);
        let Some(ext) = extension(&name) else {
            continue;
        };

        let text = match ext.as_str() {
            "txt" | "md" => tokio::fs::read_to_string(&path).await.map_err(|e| {
                RetrievalError::ReadDocument {
                    path: path.clone(),
                    source: e,
                }
            })?,
            "docx" => {
                let bytes =
                    tokio::fs::read(&path)
                        .await
                        .map_err(|e| RetrievalError::ReadDocument {
                            path: path.clone(),
                            source: e,
                        })?;
                match tokio::task::spawn_blocking(move || extract_docx_text(&bytes)).await {
                    Ok(Ok(text)) => text,
                    Ok(Err(e)) => {
                        log::warn!("Skipping {}: {}", name, e);
                        continue;
                    }
                    Err(e) => return Err(RetrievalError::Docx(e.to_string())),
                }
            }
            "pdf" => {
                log::warn!("Skipping {}: PDF text extraction is not available", name);
                continue;
            }
            _ => continue,
        };

        if text.trim().is_empty() {
            log::debug!("Skipping empty document {}", name);
            continue;
        }
        documents.push(Document::new(&name, &text));
    }

    Ok(documents)
}

/// Lists stored documents with a short preview of plain-text ones.
pub async fn list_documents(directory: &Path) -> Result<Vec<DocumentInfo>, RetrievalError> {
    let mut infos = Vec::new();

    for path in file_entries(directory).await? {
        let name = file_name(&path);
        if !is_supported_document(&name) {
            continue;
        }

        let metadata =
            tokio::fs::metadata(&path)
                .await
                .map_err(|e| RetrievalError::ReadDocument {
                    path: path.clone(),
                    source: e,
                })?;
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        let content = match extension(&name) {
            Some(ext) if is_plain_text(&ext) => tokio::fs::read_to_string(&path)
                .await
                .ok()
                .map(|text| truncate_chars(&text, PREVIEW_CHARS)),
            _ => None,
        };

        infos.push(DocumentInfo {
            filename: name,
            content,
            size: metadata.len(),
            modified,
        });
    }

    Ok(infos)
}

/// Extracts paragraph text from a DOCX package.
pub fn extract_docx_text(bytes: &[u8]) -> Result<String, RetrievalError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RetrievalError::Docx(format!("Failed to open DOCX: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| RetrievalError::Docx(format!("Failed to find document.xml: {}", e)))?
        .read_to_string(&mut xml)
        .map_err(|e| RetrievalError::Docx(format!("Failed to read document.xml: {}", e)))?;

    parse_docx_xml(&xml)
}

fn parse_docx_xml(xml: &str) -> Result<String, RetrievalError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"t" => {
                in_text_element = true;
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text_element => {
                let chunk = e.decode().map_err(|e| xml_failure(e.into()))?;
                text.push_str(&chunk);
            }
            Ok(Event::GeneralRef(e)) if in_text_element => {
                push_reference(&mut text, &e).map_err(xml_failure)?;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_failure(e)),
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}

fn xml_failure(e: quick_xml::Error) -> RetrievalError {
    RetrievalError::Docx(format!("XML parsing error: {}", e))
}
