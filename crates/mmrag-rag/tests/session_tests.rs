mod common;

use std::sync::Arc;

use mmrag_core::{FragmentKind, LoadError, QueryError, Settings};
use mmrag_index::SummaryBackend;

use common::{chart_document, session, sky_document, ScriptedModel};

#[tokio::test]
async fn query_before_load_is_not_ready_and_never_generates() {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new());
    let s = session(&Settings::default(), &summary, &answer);

    assert!(!s.is_ready());
    assert!(matches!(s.query("What color is the sky?").await, Err(QueryError::NotReady(_))));
    assert_eq!(answer.calls(), 0);
    assert_eq!(summary.calls(), 0);
}

#[tokio::test]
async fn sky_question_retrieves_the_text_fragment() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new());
    let mut s = session(&Settings::default(), &summary, &answer);

    let report = s.load(&sky_document()).await?;
    assert_eq!(report.fragments, 2);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.digest.len(), 64);

    let out = s.query_with_k("What color is the sky?", 1).await?;
    assert_eq!(out.retrieved.texts.len(), 1);
    assert_eq!(out.retrieved.texts[0].fragment.payload, "The sky is blue.");
    assert!(out.retrieved.texts.iter().all(|r| r.fragment.kind != FragmentKind::Table));
    assert!(out.retrieved.images.is_empty());
    assert!(out.answer.contains("blue"));
    assert_eq!(answer.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn reloading_replaces_rather_than_duplicates() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new());
    let mut s = session(&Settings::default(), &summary, &answer);

    s.load(&sky_document()).await?;
    let first = s.index().map(|i| i.len());
    s.load(&sky_document()).await?;
    let second = s.index().map(|i| i.len());

    assert_eq!(first, Some(2));
    assert_eq!(first, second);
    assert_eq!(s.index().map(|i| i.summary_count()), Some(2));
    Ok(())
}

#[tokio::test]
async fn document_without_fragments_is_ready_and_answers_from_empty_context() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new());
    let mut s = session(&Settings::default(), &summary, &answer);

    let report = s.load(b"[]").await?;
    assert!(s.is_ready());
    assert_eq!(report.indexed, 0);

    let out = s.query("What color is the sky?").await?;
    assert!(out.retrieved.is_empty());
    assert_eq!(answer.calls(), 1);
    let prompts = answer.prompts();
    assert_eq!(prompts[0].parts.len(), 1);
    assert_eq!(prompts[0].image_count(), 0);
    assert!(!out.answer.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_load_leaves_session_not_ready() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new());
    let mut s = session(&Settings::default(), &summary, &answer);

    s.load(&sky_document()).await?;
    assert!(s.is_ready());

    assert!(matches!(s.load(b"not json").await, Err(LoadError::Extraction(_))));
    assert!(!s.is_ready());
    assert!(matches!(s.query("anything").await, Err(QueryError::NotReady(_))));
    Ok(())
}

#[tokio::test]
async fn summarization_failures_are_skipped_not_fatal() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new().failing_on("Revenue"));
    let answer = Arc::new(ScriptedModel::new());
    let mut s = session(&Settings::default(), &summary, &answer);

    let report = s.load(&sky_document()).await?;
    assert_eq!(report.indexed, 1);
    assert_eq!(report.summarization_failures.len(), 1);
    assert_eq!(report.summarization_failures[0].origin_order(), 1);
    assert!(report.index_failures.is_empty());
    Ok(())
}

#[tokio::test]
async fn image_fragments_are_returned_as_image_parts() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new());
    let mut s = session(&Settings::default(), &summary, &answer);

    s.load(&chart_document()).await?;
    // text summary + image transcription + transcript summary
    assert_eq!(summary.calls(), 3);
    assert!(summary.prompts().iter().any(|p| p.image_count() == 1));

    let out = s.query_with_k("bar chart of revenue by year", 2).await?;
    assert_eq!(out.retrieved.images.len(), 1);
    assert!(out.retrieved.images.iter().all(|r| r.fragment.kind == FragmentKind::Image));
    assert!(out.retrieved.texts.iter().all(|r| r.fragment.kind.is_text_like()));

    let prompt = answer.prompts().pop().expect("answer prompt");
    assert_eq!(prompt.image_count(), 1);
    assert!(prompt.parts.iter().any(|p| matches!(
        p,
        mmrag_core::PromptPart::Image { media_type, .. } if media_type == "image/png"
    )));
    Ok(())
}

#[tokio::test]
async fn generation_failure_carries_the_question() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new().failing_on("User-provided question"));
    let mut s = session(&Settings::default(), &summary, &answer);
    s.load(&sky_document()).await?;

    match s.query("What color is the sky?").await {
        Err(QueryError::Generation(e)) => {
            assert_eq!(e.question, "What color is the sky?");
            assert!(!e.retryable);
        }
        other => panic!("expected generation error, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn empty_answers_are_errors() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new().answering("   "));
    let mut s = session(&Settings::default(), &summary, &answer);
    s.load(&sky_document()).await?;

    assert!(matches!(s.query("What color is the sky?").await, Err(QueryError::Generation(_))));
    assert!(matches!(s.query("  ").await, Err(QueryError::EmptyQuestion)));
    Ok(())
}

#[tokio::test]
async fn reset_discards_the_document() -> anyhow::Result<()> {
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new());
    let mut s = session(&Settings::default(), &summary, &answer);
    s.load(&sky_document()).await?;
    s.reset();
    assert!(s.report().is_none());
    assert!(matches!(s.retrieve("sky", 1).await, Err(QueryError::NotReady(_))));
    Ok(())
}

#[tokio::test]
async fn lance_backend_answers_like_memory() -> anyhow::Result<()> {
    let root = tempfile::tempdir()?;
    let summary = Arc::new(ScriptedModel::new());
    let answer = Arc::new(ScriptedModel::new());
    let mut s = session(&Settings::default(), &summary, &answer)
        .with_backend(SummaryBackend::Lance { root: root.path().to_path_buf() });

    s.load(&sky_document()).await?;
    let retrieved = s.retrieve("What color is the sky?", 1).await?;
    assert_eq!(retrieved.texts[0].fragment.payload, "The sky is blue.");
    assert_eq!(answer.calls(), 0);

    s.reset();
    assert_eq!(std::fs::read_dir(root.path())?.count(), 0);
    Ok(())
}
