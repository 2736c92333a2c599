//! docqa: ask questions about a single text document.
//!
//! ```bash
//! docqa chunk notes.txt
//! docqa search notes.txt "fire starting" --mode lexical -k 5
//! docqa ask notes.txt "How do I start a fire?" --prompt
//! docqa repl notes.txt
//! ```
//!
//! Settings come from `config.toml` and `APP_*` variables; set
//! `APP_USE_FAKE_EMBEDDINGS=1` to run without model files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use docqa_core::chunker::Chunker;
use docqa_core::config::{Config, Settings};
use docqa_core::types::{Document, RankedHit};
use docqa_embed::default_embedder;
use docqa_hybrid::{Passage, PromptTemplate, RetrievalPipeline, Session};

#[derive(Parser, Debug)]
#[command(name = "docqa", version, about = "Hybrid lexical + semantic retrieval over one document")]
struct Cli {
    /// Override retrieval.chunk_size
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    /// Override retrieval.chunk_overlap
    #[arg(long, global = true)]
    chunk_overlap: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the chunks of a document with their byte offsets
    Chunk { file: PathBuf },

    /// Rank chunks for a query with one retrieval source or both
    Search {
        file: PathBuf,
        query: String,
        #[arg(long, value_enum, default_value_t = Mode::Hybrid)]
        mode: Mode,
        /// Number of results (defaults to the configured top-k for the mode)
        #[arg(short)]
        k: Option<usize>,
    },

    /// Print the passages that answer a question
    Ask {
        file: PathBuf,
        question: String,
        #[arg(short)]
        k: Option<usize>,
        /// Also print the rendered answer prompt
        #[arg(long)]
        prompt: bool,
    },

    /// Load a document once and answer questions read from stdin
    Repl {
        file: PathBuf,
        #[arg(short)]
        k: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Lexical,
    Vector,
    Hybrid,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e:#}");
        e
    })?;
    let mut settings = config.settings()?;
    if let Some(size) = cli.chunk_size {
        settings.retrieval.chunk_size = size;
    }
    if let Some(overlap) = cli.chunk_overlap {
        settings.retrieval.chunk_overlap = overlap;
    }
    settings.retrieval.validate()?;
    tracing::debug!(?settings, "effective settings");

    match cli.command {
        Command::Chunk { file } => chunk(&settings, &file).await,
        Command::Search { file, query, mode, k } => search(&settings, &file, &query, mode, k).await,
        Command::Ask { file, question, k, prompt } => ask(&settings, &file, &question, k, prompt).await,
        Command::Repl { file, k } => repl(&settings, &file, k).await,
    }
}

async fn chunk(settings: &Settings, file: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(file).await.with_context(|| format!("reading {}", file.display()))?;
    let chunker = Chunker::new(settings.retrieval.chunk_size, settings.retrieval.chunk_overlap)?;
    let document = Document::new(display_name(file), file.display().to_string(), text);
    let chunks = chunker.split(&document);
    println!("📄 {} chunks (size {}, overlap {})", chunks.len(), chunker.chunk_size(), chunker.overlap());
    for c in &chunks {
        println!("\n  #{} [{}..{}) {} chars", c.seq, c.start, c.end, c.char_len());
        println!("     {:?}", c.text);
    }
    Ok(())
}

async fn search(settings: &Settings, file: &Path, query: &str, mode: Mode, k: Option<usize>) -> Result<()> {
    let (_session, pipeline) = load(settings, file).await?;
    println!("\n🔍 {query:?} ({mode:?})");
    match mode {
        Mode::Lexical => {
            let hits = pipeline.lexical().search(query, k.unwrap_or(settings.retrieval.top_k_lexical))?;
            print_hits(&pipeline, &hits);
        }
        Mode::Vector => {
            let hits = pipeline.vector().search(query, k.unwrap_or(settings.retrieval.top_k_vector))?;
            print_hits(&pipeline, &hits);
        }
        Mode::Hybrid => {
            let passages = pipeline.answerable_passages(query, k.unwrap_or(settings.retrieval.top_k_fused)).await?;
            print_passages(&passages);
        }
    }
    Ok(())
}

async fn ask(settings: &Settings, file: &Path, question: &str, k: Option<usize>, show_prompt: bool) -> Result<()> {
    let (session, _pipeline) = load(settings, file).await?;
    let passages = session.answerable_passages(question, k.unwrap_or(settings.retrieval.top_k_fused)).await?;
    print_passages(&passages);
    if show_prompt {
        println!("\n📘 Prompt\n{}", PromptTemplate::default().render(question, &passages));
    }
    session.close().await?;
    Ok(())
}

async fn repl(settings: &Settings, file: &Path, k: Option<usize>) -> Result<()> {
    let (session, _pipeline) = load(settings, file).await?;
    let k = k.unwrap_or(settings.retrieval.top_k_fused);
    println!("Ask a question (Ctrl-D to quit)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        match session.answerable_passages(question, k).await {
            Ok(passages) => print_passages(&passages),
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    session.close().await?;
    Ok(())
}

async fn load(settings: &Settings, file: &Path) -> Result<(Session, Arc<RetrievalPipeline>)> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    spinner.set_message("Loading document...");
    let bytes = tokio::fs::read(file).await.with_context(|| format!("reading {}", file.display()))?;

    spinner.set_message("Loading embedding model...");
    let embedding = settings.embedding.clone();
    let embedder = tokio::task::spawn_blocking(move || default_embedder(&embedding)).await??;
    let session = Session::from_settings(settings, embedder)?;

    spinner.set_message("Splitting text and building indexes...");
    let pipeline = match session.upload(&display_name(file), &bytes).await {
        Ok(pipeline) => pipeline,
        Err(e) => {
            spinner.abandon_with_message("❌ Failed to process document");
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!("✅ {} processed ({} chunks)", pipeline.document().id, pipeline.chunks().len()));
    Ok((session, pipeline))
}

fn display_name(file: &Path) -> String {
    file.file_name().map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn print_hits(pipeline: &RetrievalPipeline, hits: &[RankedHit]) {
    println!("Found {} results", hits.len());
    for (i, hit) in hits.iter().enumerate() {
        if let Some(chunk) = pipeline.chunks().get(hit.chunk) {
            println!("\n  {}. score={:.4}  chunk={}  [{}..{})", i + 1, hit.score, chunk.seq, chunk.start, chunk.end);
            println!("     📝 {}", chunk.text.trim());
        }
    }
}

fn print_passages(passages: &[Passage]) {
    println!("Found {} passages", passages.len());
    for (i, p) in passages.iter().enumerate() {
        let part = |v: Option<f32>| v.map_or_else(|| "-".to_string(), |s| format!("{s:.4}"));
        println!(
            "\n  {}. score={:.4}  lexical={}  vector={}  chunk={}",
            i + 1,
            p.score,
            part(p.lexical),
            part(p.vector),
            p.chunk.seq
        );
        println!("     📝 {}", p.chunk.text.trim());
    }
}
