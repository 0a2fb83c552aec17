//! Partitioner elements and their markdown rendering.
//!
//! The partitioner emits a JSON array of elements in the `unstructured`
//! layout: `{"type": "NarrativeText", "text": "...", "metadata": {...}}`.
//! Images carry their bytes in `metadata.image_base64`.

use serde::Deserialize;

use crate::error::ExtractionError;
use crate::types::{sniff_image_media_type, FragmentKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Title,
    Text,
    ListItem,
    Table,
    Caption,
    Image,
    Other(String),
}

impl ElementKind {
    pub fn from_category(category: &str) -> Self {
        match category {
            "Title" => ElementKind::Title,
            "NarrativeText" | "UncategorizedText" | "CompositeElement" | "Text" | "Address" | "EmailAddress" => {
                ElementKind::Text
            }
            "ListItem" => ElementKind::ListItem,
            "Table" | "TableChunk" => ElementKind::Table,
            "FigureCaption" => ElementKind::Caption,
            "Image" | "Picture" => ElementKind::Image,
            other => ElementKind::Other(other.to_string()),
        }
    }

    pub fn modality(&self) -> FragmentKind {
        match self {
            ElementKind::Table => FragmentKind::Table,
            ElementKind::Image => FragmentKind::Image,
            ElementKind::Title
            | ElementKind::Text
            | ElementKind::ListItem
            | ElementKind::Caption
            | ElementKind::Other(_) => FragmentKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub kind: ElementKind,
    pub text: String,
    pub image_base64: Option<String>,
    pub image_mime_type: Option<String>,
}

impl Element {
    pub fn new(kind: ElementKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into(), image_base64: None, image_mime_type: None }
    }
}

#[derive(Deserialize)]
struct RawElement {
    #[serde(rename = "type", default)]
    category: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    metadata: RawMetadata,
}

#[derive(Deserialize, Default)]
struct RawMetadata {
    image_base64: Option<String>,
    image_mime_type: Option<String>,
}

/// Parse the partitioner's JSON element list.
pub fn parse_elements(document: &[u8]) -> Result<Vec<Element>, ExtractionError> {
    let text = std::str::from_utf8(document).map_err(|e| ExtractionError(format!("document is not UTF-8: {e}")))?;
    let raw: Vec<RawElement> =
        serde_json::from_str(text).map_err(|e| ExtractionError(format!("invalid element list: {e}")))?;
    Ok(raw
        .into_iter()
        .map(|r| Element {
            kind: ElementKind::from_category(&r.category),
            text: r.text,
            image_base64: r.metadata.image_base64.filter(|b| !b.trim().is_empty()),
            image_mime_type: r.metadata.image_mime_type,
        })
        .collect())
}

pub fn element_to_markdown(element: &Element) -> String {
    let text = element.text.trim();
    match &element.kind {
        ElementKind::Title => format!("# {text}\n"),
        ElementKind::Text => format!("{text}\n"),
        ElementKind::ListItem => format!("- {text}\n"),
        ElementKind::Table => format!("```\n{text}\n```\n"),
        ElementKind::Caption => format!("**Figure:** {text}\n"),
        ElementKind::Image => match &element.image_base64 {
            Some(data) => {
                let mime = element
                    .image_mime_type
                    .as_deref()
                    .or_else(|| sniff_image_media_type(data))
                    .unwrap_or("image/jpeg");
                format!("![Image](data:{mime};base64,{data})\n")
            }
            None => format!("![Image]({text})\n"),
        },
        ElementKind::Other(_) => format!("{text}\n"),
    }
}

pub fn render_markdown(elements: &[Element]) -> String {
    elements.iter().map(element_to_markdown).collect()
}
