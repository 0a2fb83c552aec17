//! Domain types shared by the extractor, the index and the question pipeline.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::RetrievalGapError;

/// Opaque key linking summaries to the fragment they describe.
///
/// Minted once per fragment when the fragment enters the index; never derived
/// from fragment content, so two identical fragments still get distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identifier(Uuid);

impl Identifier {
    pub fn mint() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

/// Modality of an extracted fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    Text,
    Table,
    Image,
}

impl FragmentKind {
    /// Text and tables travel in the instruction block; images travel as image parts.
    pub fn is_text_like(self) -> bool {
        matches!(self, FragmentKind::Text | FragmentKind::Table)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FragmentKind::Text => "text",
            FragmentKind::Table => "table",
            FragmentKind::Image => "image",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of extracted document content.
///
/// - `payload`: raw text for text/table fragments, base64 image bytes for images
/// - `origin_order`: position in the source document
/// - `media_type`: declared image media type, when the extractor knew it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub payload: String,
    pub origin_order: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl Fragment {
    pub fn text(payload: impl Into<String>, origin_order: usize) -> Self {
        Self { kind: FragmentKind::Text, payload: payload.into(), origin_order, media_type: None }
    }

    pub fn table(payload: impl Into<String>, origin_order: usize) -> Self {
        Self { kind: FragmentKind::Table, payload: payload.into(), origin_order, media_type: None }
    }

    pub fn image(payload: impl Into<String>, media_type: Option<String>, origin_order: usize) -> Self {
        Self { kind: FragmentKind::Image, payload: payload.into(), origin_order, media_type }
    }

    pub fn is_empty(&self) -> bool {
        self.payload.trim().is_empty()
    }

    /// Media type to declare for an image payload: the extractor's value, else
    /// sniffed from the decoded header, else JPEG.
    pub fn image_media_type(&self) -> String {
        self.media_type
            .clone()
            .or_else(|| sniff_image_media_type(&self.payload).map(str::to_string))
            .unwrap_or_else(|| "image/jpeg".to_string())
    }
}

/// Detect a raster image type from the first bytes of a base64 payload.
pub fn sniff_image_media_type(b64: &str) -> Option<&'static str> {
    let head: String = b64.chars().filter(|c| !c.is_whitespace()).take(16).collect();
    if head.len() < 16 {
        return None;
    }
    let bytes = base64::engine::general_purpose::STANDARD.decode(head).ok()?;
    let signatures: [(&[u8], &'static str); 4] = [
        (b"\xFF\xD8\xFF".as_slice(), "image/jpeg"),
        (b"\x89PNG\r\n\x1a\n".as_slice(), "image/png"),
        (b"GIF8".as_slice(), "image/gif"),
        (b"RIFF".as_slice(), "image/webp"),
    ];
    for (sig, mime) in signatures {
        if bytes.starts_with(sig) {
            if mime == "image/webp" && bytes.get(8..12) != Some(b"WEBP".as_slice()) {
                continue;
            }
            return Some(mime);
        }
    }
    None
}

/// Short text surrogate of exactly one fragment. Built inside the index when
/// the fragment's identifier is minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub text: String,
    pub source_id: Identifier,
}

/// A fragment together with the summary texts produced for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummarizedFragment {
    pub fragment: Fragment,
    pub summaries: Vec<String>,
}

impl SummarizedFragment {
    pub fn new(fragment: Fragment, summary: impl Into<String>) -> Self {
        Self { fragment, summaries: vec![summary.into()] }
    }
}

/// A fragment resolved from the content store for a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    pub id: Identifier,
    pub fragment: Fragment,
}

/// Original fragments for one question, grouped by modality.
///
/// Both groups keep nearest-first order. `gaps` lists identifiers that the
/// summary store returned but the content store could not resolve.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub texts: Vec<Retrieved>,
    pub images: Vec<Retrieved>,
    pub gaps: Vec<RetrievalGapError>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.images.is_empty()
    }

    pub fn len(&self) -> usize {
        self.texts.len() + self.images.len()
    }
}

/// One part of a multi-part model prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromptPart {
    Text { text: String },
    Image { media_type: String, data: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub parts: Vec<PromptPart>,
}

impl Prompt {
    pub fn text(text: impl Into<String>) -> Self {
        Self { parts: vec![PromptPart::Text { text: text.into() }] }
    }

    pub fn with_image(mut self, media_type: impl Into<String>, data: impl Into<String>) -> Self {
        self.parts.push(PromptPart::Image { media_type: media_type.into(), data: data.into() });
        self
    }

    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            PromptPart::Text { text } => Some(text.as_str()),
            PromptPart::Image { .. } => None,
        })
    }

    pub fn image_count(&self) -> usize {
        self.parts.iter().filter(|p| matches!(p, PromptPart::Image { .. })).count()
    }
}
