use tracing::debug;

use crate::config::ChunkingConfig;
use crate::elements::{parse_elements, Element, ElementKind};
use crate::error::ExtractionError;
use crate::traits::FragmentExtractor;
use crate::types::{Fragment, FragmentKind};

/// Extractor over a pre-partitioned element list (JSON), chunked by title.
#[derive(Debug, Clone, Default)]
pub struct JsonElementExtractor {
    chunking: ChunkingConfig,
}

impl JsonElementExtractor {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    /// Group elements into fragments.
    ///
    /// Tables and images stand alone. Text-like elements accumulate into a
    /// section; a title opens a new section once the current one holds at
    /// least `combine_text_under_n_chars`, and a section is closed when it
    /// reaches `new_after_n_chars`. No text fragment exceeds `max_characters`.
    pub fn chunk(&self, elements: &[Element]) -> Vec<Fragment> {
        let cfg = &self.chunking;
        let mut fragments = Vec::new();
        let mut section = String::new();
        for element in elements {
            match element.kind.modality() {
                FragmentKind::Table => {
                    self.flush(&mut section, &mut fragments);
                    let text = element.text.trim();
                    if text.is_empty() {
                        debug!("dropping empty table element");
                        continue;
                    }
                    let order = fragments.len();
                    fragments.push(Fragment::table(text, order));
                }
                FragmentKind::Image => {
                    self.flush(&mut section, &mut fragments);
                    let Some(data) = element.image_base64.as_deref() else {
                        debug!(text = %element.text, "dropping image element without image payload");
                        continue;
                    };
                    let order = fragments.len();
                    fragments.push(Fragment::image(data.trim(), element.image_mime_type.clone(), order));
                }
                FragmentKind::Text => {
                    let text = element.text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    let current = char_len(&section);
                    if element.kind == ElementKind::Title && current >= cfg.combine_text_under_n_chars {
                        self.flush(&mut section, &mut fragments);
                    } else if current > 0 && current + 2 + char_len(text) > cfg.max_characters {
                        self.flush(&mut section, &mut fragments);
                    }
                    if !section.is_empty() {
                        section.push_str("\n\n");
                    }
                    section.push_str(text);
                    if char_len(&section) >= cfg.new_after_n_chars {
                        self.flush(&mut section, &mut fragments);
                    }
                }
            }
        }
        self.flush(&mut section, &mut fragments);
        fragments
    }

    fn flush(&self, section: &mut String, fragments: &mut Vec<Fragment>) {
        if section.trim().is_empty() {
            section.clear();
            return;
        }
        for piece in split_to_max(section, self.chunking.max_characters) {
            let order = fragments.len();
            fragments.push(Fragment::text(piece, order));
        }
        section.clear();
    }
}

impl FragmentExtractor for JsonElementExtractor {
    fn extract(&self, document: &[u8]) -> Result<Vec<Fragment>, ExtractionError> {
        let elements = parse_elements(document)?;
        let fragments = self.chunk(&elements);
        debug!(elements = elements.len(), fragments = fragments.len(), "chunked document");
        Ok(fragments)
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split at whitespace into pieces of at most `max` characters; a single word
/// longer than `max` is cut on character boundaries. Pieces are slices of
/// `text`, so separators inside a piece are kept as written.
fn split_to_max(text: &str, max: usize) -> Vec<String> {
    let max = max.max(1);
    if char_len(text) <= max {
        return vec![text.to_string()];
    }
    let mut pieces = Vec::new();
    // (byte start, char start) of the open piece and byte end of its last word.
    let mut open: Option<(usize, usize, usize)> = None;
    for word in words(text) {
        if word.chars > max {
            if let Some((start, _, end)) = open.take() {
                pieces.push(text[start..end].to_string());
            }
            let slice = &text[word.start..word.end];
            let cuts: Vec<usize> = slice.char_indices().map(|(i, _)| i).step_by(max).chain([slice.len()]).collect();
            pieces.extend(cuts.windows(2).map(|w| slice[w[0]..w[1]].to_string()));
            continue;
        }
        open = match open {
            Some((start, start_char, _)) if word.char_end - start_char <= max => Some((start, start_char, word.end)),
            Some((start, _, end)) => {
                pieces.push(text[start..end].to_string());
                Some((word.start, word.char_start, word.end))
            }
            None => Some((word.start, word.char_start, word.end)),
        };
    }
    if let Some((start, _, end)) = open {
        pieces.push(text[start..end].to_string());
    }
    pieces
}

struct Word {
    start: usize,
    end: usize,
    char_start: usize,
    char_end: usize,
    chars: usize,
}

/// Whitespace-separated words with byte and character offsets into `text`.
fn words(text: &str) -> Vec<Word> {
    let mut words = Vec::new();
    let mut current: Option<(usize, usize)> = None;
    let mut char_pos = 0;
    for (byte, c) in text.char_indices() {
        match (c.is_whitespace(), current) {
            (true, Some((start, char_start))) => {
                words.push(Word { start, end: byte, char_start, char_end: char_pos, chars: char_pos - char_start });
                current = None;
            }
            (false, None) => current = Some((byte, char_pos)),
            _ => {}
        }
        char_pos += 1;
    }
    if let Some((start, char_start)) = current {
        words.push(Word { start, end: text.len(), char_start, char_end: char_pos, chars: char_pos - char_start });
    }
    words
}
