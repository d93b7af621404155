//! Fixtures and scripted collaborators.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, Notify};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use deckhand::processor::{Presentation, PresentationConverter, PptxConverter};
use deckhand::retrieval::{Document, IndexStats, IngestReport, RetrievalIndex, SearchHit};
use deckhand::{Job, JobUpdate, ProcessError, RetrievalError};

pub const TITLE_SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:txBody><a:p><a:r><a:t>Quarterly Revenue Growth</a:t></a:r></a:p></p:txBody></p:sp><p:pic><p:nvPicPr><p:cNvPr id="3" name="Picture 2"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr></p:pic></p:spTree></p:cSld></p:sld>"#;

pub const PLAN_SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="TextBox 1"/></p:nvSpPr><p:txBody><a:p><a:r><a:t>Market strategy and action plan</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#;

/// A two-slide `.pptx` package.
pub fn sample_pptx() -> Vec<u8> {
    pptx_with_slides(&[TITLE_SLIDE, PLAN_SLIDE])
}

pub fn pptx_with_slides(slides: &[&str]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer.start_file("ppt/presentation.xml", options).unwrap();
    writer.write_all(b"<p:presentation/>").unwrap();
    for (i, xml) in slides.iter().enumerate() {
        writer
            .start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
    }

    writer.finish().unwrap().into_inner()
}

/// Index whose ingestion always fails with `message`.
pub struct FailingIndex {
    pub message: String,
}

impl FailingIndex {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl RetrievalIndex for FailingIndex {
    async fn ingest(&self, _documents: Vec<Document>) -> Result<IngestReport, RetrievalError> {
        Err(RetrievalError::Backend(self.message.clone()))
    }

    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        Err(RetrievalError::Backend(self.message.clone()))
    }

    async fn stats(&self) -> IndexStats {
        IndexStats::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hold {
    Convert,
    Rebuild,
}

/// Converter that holds one of its operations until the gate is opened.
pub struct GatedConverter {
    inner: PptxConverter,
    hold: Hold,
    pub gate: Arc<Notify>,
}

impl GatedConverter {
    pub fn new() -> Self {
        Self::holding(Hold::Convert)
    }

    pub fn holding(hold: Hold) -> Self {
        Self {
            inner: PptxConverter::new(),
            hold,
            gate: Arc::new(Notify::new()),
        }
    }
}

#[async_trait]
impl PresentationConverter for GatedConverter {
    async fn convert(&self, bytes: Vec<u8>, filename: &str) -> Result<Presentation, ProcessError> {
        if self.hold == Hold::Convert {
            self.gate.notified().await;
        }
        self.inner.convert(bytes, filename).await
    }

    async fn rebuild(
        &self,
        source: Vec<u8>,
        presentation: &Presentation,
    ) -> Result<Vec<u8>, ProcessError> {
        if self.hold == Hold::Rebuild {
            self.gate.notified().await;
        }
        self.inner.rebuild(source, presentation).await
    }
}

/// Converter whose rebuild always fails.
pub struct BrokenRebuildConverter {
    inner: PptxConverter,
}

impl BrokenRebuildConverter {
    pub fn new() -> Self {
        Self {
            inner: PptxConverter::new(),
        }
    }
}

#[async_trait]
impl PresentationConverter for BrokenRebuildConverter {
    async fn convert(&self, bytes: Vec<u8>, filename: &str) -> Result<Presentation, ProcessError> {
        self.inner.convert(bytes, filename).await
    }

    async fn rebuild(
        &self,
        _source: Vec<u8>,
        _presentation: &Presentation,
    ) -> Result<Vec<u8>, ProcessError> {
        Err(ProcessError::ParseError("package is read-only".to_string()))
    }
}

/// File names currently in `dir`; a missing directory counts as empty.
pub fn file_names(dir: &std::path::Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Receives snapshots until one for `job_id` is terminal, returning every
/// snapshot seen for that job.
pub async fn collect_until_terminal(
    rx: &mut broadcast::Receiver<JobUpdate>,
    job_id: &str,
) -> Vec<Job> {
    let collect = async {
        let mut seen = Vec::new();
        loop {
            let job = rx.recv().await.unwrap().into_job();
            if job.job_id != job_id {
                continue;
            }
            let finished = job.is_finished();
            seen.push(job);
            if finished {
                return seen;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), collect)
        .await
        .expect("job did not finish in time")
}

/// Receives snapshots until `predicate` matches one for `job_id`.
pub async fn wait_for(
    rx: &mut broadcast::Receiver<JobUpdate>,
    job_id: &str,
    predicate: impl Fn(&Job) -> bool,
) -> Job {
    let wait = async {
        loop {
            let job = rx.recv().await.unwrap().into_job();
            if job.job_id == job_id && predicate(&job) {
                return job;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(10), wait)
        .await
        .expect("expected snapshot never arrived")
}
