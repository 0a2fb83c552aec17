use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;

use mmrag_core::elements::{parse_elements, render_markdown};
use mmrag_core::QueryError;
use mmrag_cli::{build_session, init_tracing, load_document, load_settings, print_retrieval, spinner};

#[derive(Parser)]
#[command(name = "mmrag", about = "Ask questions about a document of text, tables and figures", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a partitioned document and answer questions about it
    Ask {
        /// Element list (JSON) produced by the partitioner
        elements: PathBuf,
        /// Question to answer; reads one question per line from stdin when absent
        #[arg(long, short)]
        question: Option<String>,
        /// Number of fragments to retrieve
        #[arg(short)]
        k: Option<usize>,
    },

    /// Render the element list as markdown
    Render {
        elements: PathBuf,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Ask { elements, question, k } => {
            let settings = load_settings()?;
            let k = k.unwrap_or(settings.retrieval.k);
            let mut session = build_session(&settings)?;
            load_document(&mut session, &elements).await?;

            match question {
                Some(q) => answer(&session, &q, k).await?,
                None => {
                    println!("Ask a question (Ctrl-D to quit):");
                    for line in std::io::stdin().lock().lines() {
                        let line = line?;
                        if line.trim().is_empty() {
                            continue;
                        }
                        // Generation failures are reported and the loop goes on.
                        if let Err(e) = answer(&session, line.trim(), k).await {
                            eprintln!("❌ {e}");
                        }
                    }
                }
            }
        }
        Command::Render { elements, out } => {
            let bytes = std::fs::read(&elements)?;
            let markdown = render_markdown(&parse_elements(&bytes)?);
            match out {
                Some(path) => {
                    std::fs::write(&path, markdown)?;
                    println!("✅ Wrote {}", path.display());
                }
                None => print!("{markdown}"),
            }
        }
    }
    Ok(())
}

async fn answer(session: &mmrag_rag::Session, question: &str, k: usize) -> Result<(), QueryError> {
    let pb = spinner("Thinking");
    let result = session.query_with_k(question, k).await;
    pb.finish_and_clear();
    let out = result?;
    println!("\n🔎 Retrieved:");
    print_retrieval(&out.retrieved);
    println!("\n💬 {}\n", out.answer.trim());
    Ok(())
}
