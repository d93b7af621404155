use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::Config;

pub use crate::processor::naming::NamingStrategy;

pub struct PipelineConfig {
    pub documents_directory: PathBuf,
    /// Retrieval hits attached to each shape.
    pub context_results: usize,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            documents_directory: PathBuf::from(&config.documents_directory),
            context_results: config.retrieval.context_results,
        }
    }
}

/// Per-run options chosen by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingOptions {
    #[serde(default)]
    pub include_analysis: bool,
    #[serde(default)]
    pub naming_strategy: NamingStrategy,
    #[serde(default = "default_use_rag")]
    pub use_rag: bool,
}

fn default_use_rag() -> bool {
    true
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            include_analysis: false,
            naming_strategy: NamingStrategy::default(),
            use_rag: default_use_rag(),
        }
    }
}
