use crate::processor::Presentation;
use crate::retrieval::IngestReport;
use crate::worker::job::Job;

use super::config::ProcessingOptions;

pub struct PipelineContext {
    // Input
    pub job: Job,
    pub options: ProcessingOptions,

    // Step 1 results, guaranteed Some after the convert step
    pub source: Option<Vec<u8>>,
    pub presentation: Option<Presentation>,

    // Step 2 result, Some only when retrieval ran
    pub ingest: Option<IngestReport>,

    // Step 4 result
    pub result_refs: Vec<String>,
}

impl PipelineContext {
    pub fn new(job: Job, options: ProcessingOptions) -> Self {
        Self {
            job,
            options,
            source: None,
            presentation: None,
            ingest: None,
            result_refs: Vec::new(),
        }
    }
}
