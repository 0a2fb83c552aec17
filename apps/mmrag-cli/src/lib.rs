//! Shared wiring for the `mmrag` binaries: logging, configuration, provider
//! selection and output formatting.

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use mmrag_core::config::EmbeddingProvider;
use mmrag_core::{Config, Embedder, FragmentKind, JsonElementExtractor, RetrievalResult, Retrieved, Settings};
use mmrag_gemini::GeminiClient;
use mmrag_rag::{LoadReport, Session};

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

/// Load `.env`, then the layered configuration.
pub fn load_settings() -> anyhow::Result<Settings> {
    dotenvy::dotenv().ok();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    Ok(config.settings()?)
}

pub fn build_embedder(settings: &Settings, gemini: &GeminiClient) -> anyhow::Result<Arc<dyn Embedder>> {
    match settings.embedding.provider {
        EmbeddingProvider::Gemini => Ok(Arc::new(gemini.embedder(&settings.embedding))),
        _ => Ok(mmrag_embed::local_embedder(&settings.embedding)?),
    }
}

/// Session wired to Gemini for summaries and answers.
pub fn build_session(settings: &Settings) -> anyhow::Result<Session> {
    let gemini = GeminiClient::from_env().context("Gemini is required for summarization and answers")?;
    let embedder = build_embedder(settings, &gemini)?;
    let extractor = Arc::new(JsonElementExtractor::new(settings.chunking.clone()));
    let summary_model = Arc::new(gemini.summary_model(&settings.generation));
    let answer_model = Arc::new(gemini.model(&settings.generation));
    Ok(Session::new(settings, extractor, summary_model, answer_model, embedder))
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(message.to_string());
    pb
}

/// Read the element file and load it into the session behind a spinner.
pub async fn load_document(session: &mut Session, path: &Path) -> anyhow::Result<LoadReport> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let pb = spinner(&format!("Summarizing and indexing {}", path.display()));
    let result = session.load(&bytes).await;
    pb.finish_and_clear();
    let report = result?;
    println!(
        "📄 {} fragments, {} indexed ({} summarization failures, {} skipped)",
        report.fragments,
        report.indexed,
        report.summarization_failures.len(),
        report.skipped
    );
    Ok(report)
}

fn preview(r: &Retrieved) -> String {
    match r.fragment.kind {
        FragmentKind::Image => format!("<image {}, {} base64 chars>", r.fragment.image_media_type(), r.fragment.payload.len()),
        FragmentKind::Text | FragmentKind::Table => {
            let text: String = r.fragment.payload.chars().take(300).collect();
            if text.len() < r.fragment.payload.len() {
                format!("{text}…")
            } else {
                text
            }
        }
    }
}

pub fn print_retrieval(result: &RetrievalResult) {
    if result.is_empty() {
        println!("(no fragments retrieved)");
    }
    for (i, r) in result.texts.iter().chain(result.images.iter()).enumerate() {
        println!("{}. [{} #{}] {}", i + 1, r.fragment.kind, r.fragment.origin_order, preview(r));
    }
    if !result.gaps.is_empty() {
        println!("⚠️  {} retrieved identifiers had no content", result.gaps.len());
    }
}
