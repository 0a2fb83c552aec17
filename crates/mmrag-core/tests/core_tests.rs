use std::time::Duration;

use figment::providers::{Format, Toml};
use figment::Figment;

use mmrag_core::config::{ChunkingConfig, Config, IndexBackend};
use mmrag_core::elements::{element_to_markdown, parse_elements, render_markdown, Element, ElementKind};
use mmrag_core::types::sniff_image_media_type;
use mmrag_core::{with_timeout, CallError, FragmentExtractor, FragmentKind, JsonElementExtractor};

const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk";
const JPEG_B64: &str = "/9j/4AAQSkZJRgABAQEASABIAAD/2wBDAAMCAgMCAgMDAwMEAwMEBQgFBQQE";

fn small_chunking() -> JsonElementExtractor {
    JsonElementExtractor::new(ChunkingConfig { max_characters: 50, new_after_n_chars: 40, combine_text_under_n_chars: 20 })
}

fn image(data: Option<&str>) -> Element {
    Element {
        kind: ElementKind::Image,
        text: "figure".to_string(),
        image_base64: data.map(str::to_string),
        image_mime_type: None,
    }
}

#[test]
fn title_opens_new_section_once_current_is_large_enough() {
    let elements = vec![
        Element::new(ElementKind::Title, "Intro"),
        Element::new(ElementKind::Text, "The sky is blue."),
        Element::new(ElementKind::Title, "Finance"),
        Element::new(ElementKind::Text, "Numbers follow."),
    ];
    let fragments = small_chunking().chunk(&elements);

    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].payload, "Intro\n\nThe sky is blue.");
    assert_eq!(fragments[1].payload, "Finance\n\nNumbers follow.");
    assert!(fragments.iter().all(|f| f.kind == FragmentKind::Text));
    assert_eq!(fragments.iter().map(|f| f.origin_order).collect::<Vec<_>>(), vec![0, 1]);
}

#[test]
fn small_sections_are_combined_across_titles() {
    let elements = vec![
        Element::new(ElementKind::Title, "A"),
        Element::new(ElementKind::Text, "short"),
        Element::new(ElementKind::Title, "B"),
        Element::new(ElementKind::ListItem, "tiny"),
    ];
    let fragments = small_chunking().chunk(&elements);
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].payload, "A\n\nshort\n\nB\n\ntiny");
}

#[test]
fn tables_and_images_stand_alone_and_payloadless_images_are_dropped() {
    let elements = vec![
        Element::new(ElementKind::Text, "before"),
        Element::new(ElementKind::Table, "Revenue | 2023 | 100"),
        image(None),
        image(Some(PNG_B64)),
        Element::new(ElementKind::Text, "   "),
        Element::new(ElementKind::Text, "after"),
    ];
    let fragments = small_chunking().chunk(&elements);

    let kinds: Vec<FragmentKind> = fragments.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FragmentKind::Text, FragmentKind::Table, FragmentKind::Image, FragmentKind::Text]);
    assert_eq!(fragments[1].payload, "Revenue | 2023 | 100");
    assert_eq!(fragments[2].image_media_type(), "image/png");
    assert_eq!(fragments[3].payload, "after");
    for (i, f) in fragments.iter().enumerate() {
        assert_eq!(f.origin_order, i);
    }
}

#[test]
fn oversized_text_is_split_at_whitespace() {
    let long = vec!["abcd"; 30].join(" ");
    let fragments = small_chunking().chunk(&[Element::new(ElementKind::Text, long)]);

    assert_eq!(fragments.len(), 3);
    for f in &fragments {
        assert!(f.payload.chars().count() <= 50, "piece too long: {}", f.payload.len());
        assert_eq!(f.payload.split_whitespace().count(), 10);
    }
}

#[test]
fn oversized_text_keeps_paragraph_breaks() {
    let first = vec!["abcd"; 8].join(" ");
    let second = vec!["efgh"; 8].join(" ");
    let fragments = small_chunking().chunk(&[Element::new(ElementKind::Text, format!("{first}\n\n{second}"))]);

    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].payload, format!("{first}\n\nefgh efgh"));
    assert_eq!(fragments[1].payload, vec!["efgh"; 6].join(" "));
    assert!(fragments.iter().all(|f| f.payload.chars().count() <= 50));
}

#[test]
fn zero_max_characters_still_chunks() {
    let extractor = JsonElementExtractor::new(ChunkingConfig {
        max_characters: 0,
        new_after_n_chars: 40,
        combine_text_under_n_chars: 20,
    });
    let fragments = extractor.chunk(&[Element::new(ElementKind::Text, "héé ok")]);

    let pieces: Vec<&str> = fragments.iter().map(|f| f.payload.as_str()).collect();
    assert_eq!(pieces, vec!["h", "é", "é", "o", "k"]);
}

#[test]
fn extract_parses_partitioner_json() {
    let json = format!(
        r#"[
            {{"type": "Title", "element_id": "a1", "text": "Weather"}},
            {{"type": "NarrativeText", "text": "The sky is blue."}},
            {{"type": "Table", "text": "Revenue | 2023 | 100", "metadata": {{"text_as_html": "<table/>"}}}},
            {{"type": "Image", "text": "", "metadata": {{"image_base64": "{JPEG_B64}", "image_mime_type": "image/jpeg"}}}}
        ]"#
    );
    let fragments = JsonElementExtractor::default().extract(json.as_bytes()).expect("extract");

    assert_eq!(fragments.len(), 3);
    assert_eq!(fragments[0].payload, "Weather\n\nThe sky is blue.");
    assert_eq!(fragments[1].kind, FragmentKind::Table);
    assert_eq!(fragments[2].kind, FragmentKind::Image);
    assert_eq!(fragments[2].media_type.as_deref(), Some("image/jpeg"));
}

#[test]
fn extract_rejects_malformed_documents() {
    let extractor = JsonElementExtractor::default();
    assert!(extractor.extract(b"%PDF-1.7 not json").is_err());
    assert!(extractor.extract(&[0xff, 0xfe, 0x00]).is_err());
}

#[test]
fn extract_of_empty_element_list_yields_no_fragments() {
    let fragments = JsonElementExtractor::default().extract(b"[]").expect("extract");
    assert!(fragments.is_empty());
}

#[test]
fn markdown_rendering_covers_every_element_kind() {
    assert_eq!(element_to_markdown(&Element::new(ElementKind::Title, " Results ")), "# Results\n");
    assert_eq!(element_to_markdown(&Element::new(ElementKind::Text, "Body")), "Body\n");
    assert_eq!(element_to_markdown(&Element::new(ElementKind::ListItem, "point")), "- point\n");
    assert_eq!(element_to_markdown(&Element::new(ElementKind::Table, "a | b")), "```\na | b\n```\n");
    assert_eq!(element_to_markdown(&Element::new(ElementKind::Caption, "Fig 1")), "**Figure:** Fig 1\n");
    assert_eq!(element_to_markdown(&image(None)), "![Image](figure)\n");
    assert!(element_to_markdown(&image(Some(PNG_B64))).starts_with("![Image](data:image/png;base64,iVBOR"));
    assert_eq!(element_to_markdown(&Element::new(ElementKind::Other("Footer".into()), "p. 3")), "p. 3\n");

    let elements = parse_elements(br#"[{"type":"Title","text":"T"},{"type":"Header","text":"h"}]"#).expect("parse");
    assert_eq!(elements[1].kind, ElementKind::Other("Header".to_string()));
    assert_eq!(render_markdown(&elements), "# T\nh\n");
}

#[test]
fn image_media_type_is_sniffed_from_payload() {
    assert_eq!(sniff_image_media_type(PNG_B64), Some("image/png"));
    assert_eq!(sniff_image_media_type(JPEG_B64), Some("image/jpeg"));
    assert_eq!(sniff_image_media_type("not an image at all!"), None);
    assert_eq!(sniff_image_media_type("abc"), None);
}

#[test]
fn settings_merge_over_defaults() {
    let figment = Figment::from(Toml::string("[retrieval]\nk = 2\n\n[index]\nbackend = \"lance\"\n"));
    let settings = Config::from_figment(figment).expect("config").settings().expect("settings");

    assert_eq!(settings.retrieval.k, 2);
    assert_eq!(settings.index.backend, IndexBackend::Lance);
    assert_eq!(settings.chunking, ChunkingConfig::default());
    assert_eq!(settings.summarize.concurrency, 1);
}

#[test]
fn zero_k_is_rejected() {
    let figment = Figment::from(Toml::string("[retrieval]\nk = 0\n"));
    assert!(Config::from_figment(figment).is_err());
}

#[tokio::test]
async fn with_timeout_maps_expiry_to_retryable_error() {
    let limit = Duration::from_millis(10);
    let err = with_timeout(limit, async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok::<_, CallError>(())
    })
    .await
    .unwrap_err();

    assert_eq!(err, CallError::Timeout(limit));
    assert!(err.is_retryable());
    assert!(!CallError::failed("boom").is_retryable());
}
