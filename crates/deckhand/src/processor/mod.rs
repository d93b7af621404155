pub mod naming;
pub mod pptx;
pub(crate) mod xml;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

pub use naming::{HeuristicNamer, HybridNamer, LlmNamer, NamingStrategy};
pub use pptx::PptxConverter;

/// Structured view of a presentation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Presentation {
    pub file: String,
    pub slides: Vec<Slide>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<PresentationAnalysis>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_references: Vec<DocumentReference>,
}

impl Presentation {
    pub fn shape_count(&self) -> usize {
        self.slides.iter().map(|slide| slide.shapes.len()).sum()
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Shape> {
        self.slides.iter().flat_map(|slide| slide.shapes.iter())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slide {
    /// 1-based slide number.
    pub index: u32,
    /// Package part the slide was read from, e.g. `ppt/slides/slide1.xml`.
    pub path: String,
    pub shapes: Vec<Shape>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Shape,
    Picture,
    GraphicFrame,
    Connector,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shape {
    pub id: u32,
    pub name: String,
    pub kind: ShapeKind,
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptive_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub semantic_tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_analysis: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_references: Vec<DocumentReference>,
}

impl Shape {
    pub fn new(id: u32, name: &str, kind: ShapeKind, text: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind,
            text: text.to_string(),
            descriptive_name: None,
            semantic_tags: Vec::new(),
            context_analysis: None,
            document_references: Vec::new(),
        }
    }
}

/// A retrieval hit that informed a shape's naming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentReference {
    pub source_file: String,
    pub similarity: f64,
}

/// Presentation-level summary produced when analysis is requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PresentationAnalysis {
    pub total_slides: usize,
    pub total_shapes: usize,
    pub shapes_with_text: usize,
    /// Most frequent semantic tags, most common first.
    pub top_tags: Vec<String>,
    pub summary: String,
}

const TOP_TAGS: usize = 5;

impl PresentationAnalysis {
    /// Summarizes a presentation whose shapes already carry semantic tags.
    pub fn from_presentation(presentation: &Presentation) -> Self {
        let total_shapes = presentation.shape_count();
        let shapes_with_text = presentation
            .shapes()
            .filter(|shape| !shape.text.is_empty())
            .count();

        let mut tag_counts: HashMap<&str, usize> = HashMap::new();
        for tag in presentation.shapes().flat_map(|shape| shape.semantic_tags.iter()) {
            *tag_counts.entry(tag.as_str()).or_default() += 1;
        }
        let mut ranked: Vec<(&str, usize)> = tag_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let top_tags: Vec<String> = ranked
            .into_iter()
            .take(TOP_TAGS)
            .map(|(tag, _)| tag.to_string())
            .collect();

        let mut summary = format!(
            "{} slides with {} shapes, {} containing text",
            presentation.slides.len(),
            total_shapes,
            shapes_with_text
        );
        if !top_tags.is_empty() {
            summary.push_str(&format!(". Key themes: {}", top_tags.join(", ")));
        }

        Self {
            total_slides: presentation.slides.len(),
            total_shapes,
            shapes_with_text,
            top_tags,
            summary,
        }
    }
}

/// Extra information handed to a namer.
#[derive(Debug, Clone, Default)]
pub struct NamingContext {
    pub slide_index: u32,
    /// Related passages from the reference documents.
    pub related: Vec<String>,
}

/// A generated name and which strategy produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeNaming {
    pub descriptive_name: String,
    pub strategy: NamingStrategy,
}

/// Turns an uploaded file into a [`Presentation`] and back.
#[async_trait]
pub trait PresentationConverter: Send + Sync {
    async fn convert(&self, bytes: Vec<u8>, filename: &str) -> Result<Presentation, ProcessError>;

    /// Produces a copy of `source` carrying the descriptive names of
    /// `presentation`. `source` itself is left untouched.
    async fn rebuild(
        &self,
        source: Vec<u8>,
        presentation: &Presentation,
    ) -> Result<Vec<u8>, ProcessError>;
}

#[async_trait]
pub trait ShapeNamer: Send + Sync {
    async fn name(&self, shape: &Shape, context: &NamingContext)
        -> Result<ShapeNaming, ProcessError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn presentation() -> Presentation {
        Presentation {
            file: "deck.pptx".to_string(),
            slides: vec![
                Slide {
                    index: 1,
                    path: "ppt/slides/slide1.xml".to_string(),
                    shapes: vec![
                        Shape::new(2, "Title 1", ShapeKind::Shape, "Quarterly Revenue"),
                        Shape::new(3, "Picture 2", ShapeKind::Picture, ""),
                    ],
                },
                Slide {
                    index: 2,
                    path: "ppt/slides/slide2.xml".to_string(),
                    shapes: vec![Shape::new(2, "Title 1", ShapeKind::Shape, "Plan")],
                },
            ],
            analysis: None,
            document_references: Vec::new(),
        }
    }

    #[test]
    fn test_shape_count() {
        let presentation = presentation();
        assert_eq!(presentation.shape_count(), 3);
        assert_eq!(presentation.shapes().filter(|s| !s.text.is_empty()).count(), 2);
    }

    #[test]
    fn test_analysis_ranks_tags() {
        let mut presentation = presentation();
        presentation.slides[0].shapes[0].semantic_tags =
            vec!["revenue".to_string(), "growth".to_string()];
        presentation.slides[1].shapes[0].semantic_tags =
            vec!["plan".to_string(), "revenue".to_string()];

        let analysis = PresentationAnalysis::from_presentation(&presentation);
        assert_eq!(analysis.total_slides, 2);
        assert_eq!(analysis.total_shapes, 3);
        assert_eq!(analysis.shapes_with_text, 2);
        assert_eq!(analysis.top_tags, vec!["revenue", "growth", "plan"]);
        assert!(analysis.summary.contains("Key themes: revenue, growth, plan"));
    }

    #[test]
    fn test_presentation_json_shape() {
        let value = serde_json::to_value(presentation()).unwrap();
        let shape = &value["slides"][0]["shapes"][1];
        assert_eq!(shape["kind"], "picture");
        assert!(shape.get("descriptive_name").is_none());
        assert!(value.get("analysis").is_none());

        let parsed: Presentation = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, presentation());
    }
}
