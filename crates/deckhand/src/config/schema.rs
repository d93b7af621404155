use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_upload_directory")]
    pub upload_directory: String,
    #[serde(default = "default_output_directory")]
    pub output_directory: String,
    /// Reference documents fed to the retrieval index.
    #[serde(default = "default_documents_directory")]
    pub documents_directory: String,
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,
    #[serde(default = "default_notifier_capacity")]
    pub notifier_capacity: usize,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_bind() -> String {
    "0.0.0.0:8001".to_string()
}

fn default_upload_directory() -> String {
    "uploads".to_string()
}

fn default_output_directory() -> String {
    "outputs".to_string()
}

fn default_documents_directory() -> String {
    "documents".to_string()
}

fn default_max_concurrent_jobs() -> usize {
    num_cpus::get()
}

fn default_notifier_capacity() -> usize {
    256
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            bind: default_bind(),
            upload_directory: default_upload_directory(),
            output_directory: default_output_directory(),
            documents_directory: default_documents_directory(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            notifier_capacity: default_notifier_capacity(),
            max_upload_bytes: default_max_upload_bytes(),
            naming: NamingConfig::default(),
            retrieval: RetrievalConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Settings for the LLM shape naming service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Base URL of an OpenAI-compatible API, e.g. `http://localhost:11434/v1`.
    /// LLM naming is unavailable without it.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_naming_timeout")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_naming_timeout() -> u64 {
    30
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: default_model(),
            api_key_env: None,
            timeout_secs: default_naming_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Target chunk length in words.
    #[serde(default = "default_chunk_size_words")]
    pub chunk_size_words: usize,
    /// Hits attached to each shape as naming context.
    #[serde(default = "default_context_results")]
    pub context_results: usize,
}

fn default_chunk_size_words() -> usize {
    200
}

fn default_context_results() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunk_size_words: default_chunk_size_words(),
            context_results: default_context_results(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
