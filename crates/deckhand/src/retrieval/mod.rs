//! Retrieval over reference documents.

pub mod chunker;
pub mod documents;

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::RetrievalError;
use crate::sanitize::truncate_chars;

pub use documents::{load_directory, Document, DocumentInfo};

const PREVIEW_CHARS: usize = 300;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Documents that produced at least one chunk.
    pub ingested_count: usize,
    pub total_files: usize,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Chunk preview, truncated to 300 characters.
    pub text: String,
    pub similarity: f64,
    pub source_file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub chunk_count: usize,
    pub total_words: usize,
}

#[async_trait]
pub trait RetrievalIndex: Send + Sync {
    /// Adds documents, replacing the chunks of any id already present.
    async fn ingest(&self, documents: Vec<Document>) -> Result<IngestReport, RetrievalError>;

    /// Returns the best matching chunks, most similar first.
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchHit>, RetrievalError>;

    async fn stats(&self) -> IndexStats;
}

struct Chunk {
    position: usize,
    source_file: String,
    text: String,
    terms: HashSet<String>,
    word_count: usize,
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect()
}

/// Size of the intersection over size of the union.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// In-memory index scored by term overlap.
pub struct KeywordIndex {
    chunk_size_words: usize,
    documents: RwLock<HashMap<String, Vec<Chunk>>>,
}

impl KeywordIndex {
    pub fn new(chunk_size_words: usize) -> Self {
        Self {
            chunk_size_words: chunk_size_words.max(1),
            documents: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RetrievalIndex for KeywordIndex {
    async fn ingest(&self, documents: Vec<Document>) -> Result<IngestReport, RetrievalError> {
        let mut report = IngestReport {
            total_files: documents.len(),
            ..IngestReport::default()
        };

        let mut prepared = Vec::with_capacity(documents.len());
        for document in documents {
            let chunks: Vec<Chunk> = chunker::chunk_text(&document.text, self.chunk_size_words)
                .into_iter()
                .enumerate()
                .map(|(position, text)| Chunk {
                    position,
                    source_file: document.source_file.clone(),
                    terms: terms(&text),
                    word_count: text.split_whitespace().count(),
                    text,
                })
                .collect();

            if chunks.is_empty() {
                log::debug!("No text to index in {}", document.source_file);
                continue;
            }
            report.ingested_count += 1;
            report.chunk_count += chunks.len();
            prepared.push((document.id, chunks));
        }

        let mut index = self.documents.write().await;
        for (id, chunks) in prepared {
            index.insert(id, chunks);
        }

        log::info!(
            "Indexed {} of {} documents ({} chunks)",
            report.ingested_count,
            report.total_files,
            report.chunk_count
        );
        Ok(report)
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        let query_terms = terms(query);
        if query_terms.is_empty() || max_results == 0 {
            return Ok(Vec::new());
        }

        let index = self.documents.read().await;
        let mut scored: Vec<(f64, &Chunk)> = index
            .values()
            .flatten()
            .map(|chunk| (jaccard(&query_terms, &chunk.terms), chunk))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        scored.sort_by(|(a_score, a), (b_score, b)| {
            b_score
                .partial_cmp(a_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.source_file.cmp(&b.source_file))
                .then_with(|| a.position.cmp(&b.position))
        });

        Ok(scored
            .into_iter()
            .take(max_results)
            .map(|(similarity, chunk)| SearchHit {
                text: truncate_chars(&chunk.text, PREVIEW_CHARS),
                similarity,
                source_file: chunk.source_file.clone(),
            })
            .collect())
    }

    async fn stats(&self) -> IndexStats {
        let index = self.documents.read().await;
        let chunks = index.values().flatten();
        IndexStats {
            document_count: index.len(),
            chunk_count: index.values().map(Vec::len).sum(),
            total_words: chunks.map(|chunk| chunk.word_count).sum(),
        }
    }
}
