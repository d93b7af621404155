//! `.pptx` reader and writer.
//!
//! Only the parts needed for naming are read: slide parts, and per shape its
//! `cNvPr` id and name plus any `a:t` text. Rebuilding copies every package
//! entry and rewrites `cNvPr` names on the slides that have new names.

use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::ProcessError;
use crate::processor::xml::push_reference;
use crate::processor::{Presentation, PresentationConverter, Shape, ShapeKind, Slide};
use crate::sanitize::extension;

const SLIDE_PREFIX: &str = "ppt/slides/slide";
const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Shape id to new name, keyed by slide part.
type SlideNames = HashMap<String, HashMap<u32, String>>;

pub struct PptxConverter;

impl PptxConverter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PptxConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresentationConverter for PptxConverter {
    async fn convert(&self, bytes: Vec<u8>, filename: &str) -> Result<Presentation, ProcessError> {
        match extension(filename).as_deref() {
            Some("pptx") => {}
            Some("ppt") => {
                return Err(ProcessError::UnsupportedFormat(
                    "legacy .ppt files must be saved as .pptx first".to_string(),
                ))
            }
            other => {
                return Err(ProcessError::UnsupportedFormat(format!(
                    "unexpected file type: {}",
                    other.unwrap_or("none")
                )))
            }
        }

        let filename = filename.to_string();
        tokio::task::spawn_blocking(move || parse_package(&bytes, &filename))
            .await
            .map_err(|e| ProcessError::ParseError(format!("parser task failed: {}", e)))?
    }

    async fn rebuild(
        &self,
        source: Vec<u8>,
        presentation: &Presentation,
    ) -> Result<Vec<u8>, ProcessError> {
        let names = descriptive_names(presentation);
        tokio::task::spawn_blocking(move || rewrite_package(&source, &names))
            .await
            .map_err(|e| ProcessError::ParseError(format!("writer task failed: {}", e)))?
    }
}

fn invalid_package(e: zip::result::ZipError) -> ProcessError {
    ProcessError::ParseError(format!("not a valid .pptx package: {}", e))
}

fn xml_error(part: &str, e: impl std::fmt::Display) -> ProcessError {
    ProcessError::ParseError(format!("malformed XML in {}: {}", part, e))
}

/// Returns N for `ppt/slides/slideN.xml`.
fn slide_number(part: &str) -> Option<u32> {
    part.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

fn parse_package(bytes: &[u8], filename: &str) -> Result<Presentation, ProcessError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(invalid_package)?;

    if !archive.file_names().any(|name| name == PRESENTATION_PART) {
        return Err(ProcessError::ParseError(format!(
            "missing {}",
            PRESENTATION_PART
        )));
    }

    let mut parts: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    parts.sort_by_key(|(n, _)| *n);

    let mut slides = Vec::with_capacity(parts.len());
    for (position, (_, part)) in parts.into_iter().enumerate() {
        let mut xml = String::new();
        archive
            .by_name(&part)
            .map_err(invalid_package)?
            .read_to_string(&mut xml)
            .map_err(|e| xml_error(&part, e))?;

        let shapes = parse_slide(&xml, &part)?;
        slides.push(Slide {
            index: position as u32 + 1,
            path: part,
            shapes,
        });
    }

    log::debug!("Parsed {} slides from {}", slides.len(), filename);

    Ok(Presentation {
        file: filename.to_string(),
        slides,
        analysis: None,
        document_references: Vec::new(),
    })
}

fn shape_kind(local_name: &[u8]) -> Option<ShapeKind> {
    match local_name {
        b"sp" => Some(ShapeKind::Shape),
        b"pic" => Some(ShapeKind::Picture),
        b"graphicFrame" => Some(ShapeKind::GraphicFrame),
        b"cxnSp" => Some(ShapeKind::Connector),
        _ => None,
    }
}

struct OpenShape {
    kind: ShapeKind,
    depth: usize,
    identity: Option<(u32, String)>,
    text: String,
}

fn parse_slide(xml: &str, part: &str) -> Result<Vec<Shape>, ProcessError> {
    let mut reader = Reader::from_str(xml);

    let mut shapes = Vec::new();
    let mut current: Option<OpenShape> = None;
    let mut depth = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| xml_error(part, e))? {
            Event::Start(e) => {
                let local_name = e.local_name();
                if let Some(shape) = current.as_mut() {
                    match local_name.as_ref() {
                        b"cNvPr" if shape.identity.is_none() => {
                            shape.identity = Some(shape_identity(&e, part)?);
                        }
                        b"t" => in_text = true,
                        _ => {}
                    }
                } else if let Some(kind) = shape_kind(local_name.as_ref()) {
                    current = Some(OpenShape {
                        kind,
                        depth,
                        identity: None,
                        text: String::new(),
                    });
                }
                depth += 1;
            }
            Event::Empty(e) => {
                if let Some(shape) = current.as_mut() {
                    if e.local_name().as_ref() == b"cNvPr" && shape.identity.is_none() {
                        shape.identity = Some(shape_identity(&e, part)?);
                    }
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let local_name = e.local_name();
                match local_name.as_ref() {
                    b"t" => in_text = false,
                    b"p" => {
                        if let Some(shape) = current.as_mut() {
                            shape.text.push('\n');
                        }
                    }
                    _ => {}
                }

                let closes_shape = current.as_ref().is_some_and(|shape| shape.depth == depth);
                if closes_shape {
                    if let Some(shape) = current.take() {
                        let (id, name) = shape.identity.unwrap_or_default();
                        shapes.push(Shape::new(id, &name, shape.kind, shape.text.trim()));
                    }
                }
            }
            Event::Text(e) => {
                if in_text {
                    if let Some(shape) = current.as_mut() {
                        shape.text.push_str(&e.decode().map_err(|e| xml_error(part, e))?);
                    }
                }
            }
            Event::GeneralRef(e) => {
                if in_text {
                    if let Some(shape) = current.as_mut() {
                        push_reference(&mut shape.text, &e).map_err(|e| xml_error(part, e))?;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(shapes)
}

fn shape_identity(e: &BytesStart<'_>, part: &str) -> Result<(u32, String), ProcessError> {
    let mut id = 0;
    let mut name = String::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| xml_error(part, e))?;
        let value = attr.unescape_value().map_err(|e| xml_error(part, e))?;
        match attr.key.local_name().as_ref() {
            b"id" => id = value.parse().unwrap_or(0),
            b"name" => name = value.into_owned(),
            _ => {}
        }
    }
    Ok((id, name))
}

fn descriptive_names(presentation: &Presentation) -> SlideNames {
    presentation
        .slides
        .iter()
        .map(|slide| {
            let names = slide
                .shapes
                .iter()
                .filter_map(|shape| {
                    shape
                        .descriptive_name
                        .as_ref()
                        .map(|name| (shape.id, name.clone()))
                })
                .collect();
            (slide.path.clone(), names)
        })
        .collect()
}

fn write_error(e: impl std::fmt::Display) -> ProcessError {
    ProcessError::ParseError(format!("failed to write .pptx package: {}", e))
}

fn rewrite_package(source: &[u8], names: &SlideNames) -> Result<Vec<u8>, ProcessError> {
    let mut archive = ZipArchive::new(Cursor::new(source)).map_err(invalid_package)?;
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(invalid_package)?;
        let name = entry.name().to_string();

        if entry.is_dir() {
            writer.add_directory(name, options).map_err(write_error)?;
            continue;
        }

        let mut contents = Vec::new();
        entry
            .read_to_end(&mut contents)
            .map_err(|e| xml_error(&name, e))?;

        let contents = match names.get(&name) {
            Some(slide_names) if !slide_names.is_empty() => {
                let xml = String::from_utf8(contents).map_err(|e| xml_error(&name, e))?;
                rewrite_slide(&xml, slide_names, &name)?
            }
            _ => contents,
        };

        writer.start_file(name, options).map_err(write_error)?;
        writer.write_all(&contents).map_err(write_error)?;
    }

    let cursor = writer.finish().map_err(write_error)?;
    Ok(cursor.into_inner())
}

fn rewrite_slide(
    xml: &str,
    names: &HashMap<u32, String>,
    part: &str,
) -> Result<Vec<u8>, ProcessError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    loop {
        let event = match reader.read_event().map_err(|e| xml_error(part, e))? {
            Event::Eof => break,
            Event::Start(e) if e.local_name().as_ref() == b"cNvPr" => {
                Event::Start(renamed(&e, names, part)?)
            }
            Event::Empty(e) if e.local_name().as_ref() == b"cNvPr" => {
                Event::Empty(renamed(&e, names, part)?)
            }
            other => other,
        };
        writer.write_event(event).map_err(write_error)?;
    }

    Ok(writer.into_inner())
}

fn renamed(
    e: &BytesStart<'_>,
    names: &HashMap<u32, String>,
    part: &str,
) -> Result<BytesStart<'static>, ProcessError> {
    let (id, _) = shape_identity(e, part)?;
    let replacement = names.get(&id);

    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = BytesStart::new(tag);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| xml_error(part, e))?;
        match replacement {
            Some(new_name) if attr.key.local_name().as_ref() == b"name" => {
                element.push_attribute(("name", new_name.as_str()));
            }
            _ => element.push_attribute(attr),
        }
    }
    Ok(element)
}
