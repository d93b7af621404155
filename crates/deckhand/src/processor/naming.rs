//! Shape naming strategies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::schema::NamingConfig;
use crate::error::{ConfigError, ProcessError};
use crate::processor::{NamingContext, Shape, ShapeKind, ShapeNamer, ShapeNaming};
use crate::sanitize::snake_case;

/// Words kept when deriving a name.
const MAX_NAME_WORDS: usize = 3;
const MAX_SEMANTIC_TAGS: usize = 5;
const LLM_TEMPERATURE: f32 = 0.3;

const BUSINESS_KEYWORDS: &[&str] = &[
    "revenue",
    "sales",
    "profit",
    "growth",
    "market",
    "strategy",
    "goals",
    "objectives",
    "results",
    "performance",
    "analysis",
    "data",
    "metrics",
    "overview",
    "summary",
    "conclusion",
    "recommendation",
    "action",
    "plan",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingStrategy {
    Heuristic,
    Llm,
    #[default]
    Hybrid,
}

impl std::fmt::Display for NamingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamingStrategy::Heuristic => write!(f, "heuristic"),
            NamingStrategy::Llm => write!(f, "llm"),
            NamingStrategy::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// Business keywords found in `text`, in keyword order, at most five.
pub fn semantic_tags(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    BUSINESS_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .take(MAX_SEMANTIC_TAGS)
        .map(|keyword| keyword.to_string())
        .collect()
}

fn kind_label(kind: ShapeKind) -> &'static str {
    match kind {
        ShapeKind::Shape => "shape",
        ShapeKind::Picture => "picture",
        ShapeKind::GraphicFrame => "graphic_frame",
        ShapeKind::Connector => "connector",
    }
}

fn leading_words(text: &str, count: usize) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .take(count)
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Names a shape after its text, else its current name, else its kind and id.
pub fn heuristic_name(shape: &Shape) -> String {
    let from_text = leading_words(&shape.text, MAX_NAME_WORDS);
    if !from_text.is_empty() {
        return from_text;
    }

    let from_name = snake_case(&shape.name);
    if !from_name.is_empty() {
        return from_name;
    }

    format!("{}_{}", kind_label(shape.kind), shape.id)
}

pub struct HeuristicNamer;

#[async_trait]
impl ShapeNamer for HeuristicNamer {
    async fn name(
        &self,
        shape: &Shape,
        _context: &NamingContext,
    ) -> Result<ShapeNaming, ProcessError> {
        Ok(ShapeNaming {
            descriptive_name: heuristic_name(shape),
            strategy: NamingStrategy::Heuristic,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Names shapes through an OpenAI-compatible chat completion endpoint.
pub struct LlmNamer {
    client: reqwest::Client,
    endpoint: Option<String>,
    model: String,
    api_key: Option<String>,
}

impl LlmNamer {
    pub fn from_config(config: &NamingConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let api_key = config
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok());

        Ok(Self {
            client,
            endpoint: config
                .endpoint
                .as_ref()
                .map(|endpoint| endpoint.trim_end_matches('/').to_string()),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }

    fn prompt(shape: &Shape, context: &NamingContext) -> String {
        let mut prompt = format!(
            "Generate a descriptive name for this PowerPoint shape.\n\
             Shape type: {}\n\
             Current name: {}\n\
             Slide: {}\n\
             Text content: {}\n",
            kind_label(shape.kind),
            shape.name,
            context.slide_index,
            if shape.text.is_empty() {
                "(none)"
            } else {
                shape.text.as_str()
            },
        );
        if !context.related.is_empty() {
            prompt.push_str("Related reference material:\n");
            for passage in &context.related {
                prompt.push_str("- ");
                prompt.push_str(passage);
                prompt.push('\n');
            }
        }
        prompt.push_str(
            "Reply with only the name in snake_case, at most three words, no explanation.",
        );
        prompt
    }
}

/// Reduces a model reply to `[a-z0-9_]`.
pub fn clean_model_reply(reply: &str) -> String {
    let cleaned: String = reply
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '-' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    cleaned.trim_matches('_').to_string()
}

#[async_trait]
impl ShapeNamer for LlmNamer {
    async fn name(
        &self,
        shape: &Shape,
        context: &NamingContext,
    ) -> Result<ShapeNaming, ProcessError> {
        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            ProcessError::NamingServiceUnavailable("no naming endpoint configured".to_string())
        })?;

        let body = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You name presentation shapes for automation scripts."
                },
                { "role": "user", "content": Self::prompt(shape, context) }
            ],
            "temperature": LLM_TEMPERATURE,
            "max_tokens": 20,
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", endpoint))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProcessError::NamingServiceUnavailable(e.to_string()))?;

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProcessError::NamingServiceUnavailable(e.to_string()))?;

        let content = reply
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or_default();

        let mut descriptive_name = clean_model_reply(content);
        if descriptive_name.is_empty() {
            descriptive_name = snake_case(&shape.name);
        }

        Ok(ShapeNaming {
            descriptive_name,
            strategy: NamingStrategy::Llm,
        })
    }
}

/// Tries the LLM and falls back to the heuristic on any failure.
pub struct HybridNamer {
    primary: Arc<dyn ShapeNamer>,
    fallback: HeuristicNamer,
}

impl HybridNamer {
    pub fn new(primary: Arc<dyn ShapeNamer>) -> Self {
        Self {
            primary,
            fallback: HeuristicNamer,
        }
    }
}

#[async_trait]
impl ShapeNamer for HybridNamer {
    async fn name(
        &self,
        shape: &Shape,
        context: &NamingContext,
    ) -> Result<ShapeNaming, ProcessError> {
        match self.primary.name(shape, context).await {
            Ok(naming) if !naming.descriptive_name.is_empty() => Ok(naming),
            Ok(_) => self.fallback.name(shape, context).await,
            Err(e) => {
                log::debug!("Falling back to heuristic name for shape {}: {}", shape.id, e);
                self.fallback.name(shape, context).await
            }
        }
    }
}
