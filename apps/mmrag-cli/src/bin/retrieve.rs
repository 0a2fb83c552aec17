use clap::Parser;
use std::path::PathBuf;

use mmrag_cli::{build_session, init_tracing, load_document, load_settings, print_retrieval};

/// Show which fragments a question retrieves, without generating an answer.
#[derive(Parser)]
#[command(name = "mmrag-retrieve", version)]
struct Args {
    elements: PathBuf,
    question: String,
    #[arg(short)]
    k: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();
    let settings = load_settings()?;
    let k = args.k.unwrap_or(settings.retrieval.k);

    let mut session = build_session(&settings)?;
    load_document(&mut session, &args.elements).await?;
    let result = session.retrieve(&args.question, k).await?;
    print_retrieval(&result);
    Ok(())
}
