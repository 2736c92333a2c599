use std::env;
use std::sync::Arc;

use docqa_core::config::{RetrievalConfig, SessionConfig};
use docqa_embed::HashingEmbedder;
use docqa_hybrid::Session;

// Load a text file and print the fused passages for a question.
// Usage:
//   cargo run -p docqa-hybrid --example passages -- <file> "<question>" [k]

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("Usage: cargo run -p docqa-hybrid --example passages -- <file> <question> [k]");
        std::process::exit(1);
    }
    let k = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(4);

    let session = Session::new(RetrievalConfig::default(), &SessionConfig::default(), Arc::new(HashingEmbedder::new(384)))?;
    let bytes = std::fs::read(&args[0])?;
    let pipeline = session.upload(&args[0], &bytes).await?;
    println!("{} chunks", pipeline.chunks().len());

    for p in session.answerable_passages(&args[1], k).await? {
        println!("[{:.4}] #{} {}", p.score, p.chunk.seq, p.chunk.text.trim());
    }
    session.close().await?;
    Ok(())
}
