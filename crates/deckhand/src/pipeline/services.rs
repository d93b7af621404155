use std::sync::Arc;

use crate::config::Config;
use crate::error::ConfigError;
use crate::processor::{
    HeuristicNamer, HybridNamer, LlmNamer, NamingStrategy, PptxConverter, PresentationConverter,
    ShapeNamer,
};
use crate::retrieval::{KeywordIndex, RetrievalIndex};
use crate::storage::{ArtifactStore, LocalArtifactStore};

/// One namer per strategy.
#[derive(Clone)]
pub struct Namers {
    heuristic: Arc<dyn ShapeNamer>,
    llm: Arc<dyn ShapeNamer>,
    hybrid: Arc<dyn ShapeNamer>,
}

impl Namers {
    pub fn new(
        heuristic: Arc<dyn ShapeNamer>,
        llm: Arc<dyn ShapeNamer>,
        hybrid: Arc<dyn ShapeNamer>,
    ) -> Self {
        Self {
            heuristic,
            llm,
            hybrid,
        }
    }

    /// Builds the standard set around an LLM namer: hybrid falls back from
    /// it to the heuristic.
    pub fn around(llm: Arc<dyn ShapeNamer>) -> Self {
        Self {
            heuristic: Arc::new(HeuristicNamer),
            hybrid: Arc::new(HybridNamer::new(Arc::clone(&llm))),
            llm,
        }
    }

    pub fn select(&self, strategy: NamingStrategy) -> &Arc<dyn ShapeNamer> {
        match strategy {
            NamingStrategy::Heuristic => &self.heuristic,
            NamingStrategy::Llm => &self.llm,
            NamingStrategy::Hybrid => &self.hybrid,
        }
    }
}

/// Collaborators the pipeline calls out to.
#[derive(Clone)]
pub struct PipelineServices {
    pub artifacts: Arc<dyn ArtifactStore>,
    pub converter: Arc<dyn PresentationConverter>,
    pub index: Arc<dyn RetrievalIndex>,
    pub namers: Namers,
}

impl PipelineServices {
    /// Production services: local directories, the `.pptx` converter, the
    /// keyword index and the configured naming endpoint.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let llm = LlmNamer::from_config(&config.naming)?;
        if !llm.is_configured() {
            log::info!("No naming endpoint configured, hybrid naming will use heuristics");
        }

        Ok(Self {
            artifacts: Arc::new(LocalArtifactStore::new(
                &config.upload_directory,
                &config.output_directory,
            )),
            converter: Arc::new(PptxConverter::new()),
            index: Arc::new(KeywordIndex::new(config.retrieval.chunk_size_words)),
            namers: Namers::around(Arc::new(llm)),
        })
    }
}
