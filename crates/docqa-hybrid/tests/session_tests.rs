use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use docqa_core::config::{RetrievalConfig, SessionConfig};
use docqa_core::traits::Embedder;
use docqa_core::Error;
use docqa_embed::HashingEmbedder;
use docqa_hybrid::{ask, AnswerSynthesizer, PromptTemplate, Session};
use tempfile::TempDir;

/// Hashing embedder that can be switched off to simulate an outage.
struct FlakyEmbedder {
    inner: HashingEmbedder,
    down: AtomicBool,
}

impl FlakyEmbedder {
    fn new() -> Self {
        Self { inner: HashingEmbedder::new(256), down: AtomicBool::new(false) }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }
}

impl Embedder for FlakyEmbedder {
    fn id(&self) -> &str {
        "flaky"
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.down.load(Ordering::SeqCst) {
            anyhow::bail!("model server unreachable");
        }
        self.inner.embed_batch(texts)
    }
}

struct EchoSynthesizer;

impl AnswerSynthesizer for EchoSynthesizer {
    fn synthesize(&self, prompt: &str) -> anyhow::Result<String> {
        Ok(prompt.to_string())
    }
}

fn config() -> RetrievalConfig {
    RetrievalConfig { chunk_size: 20, chunk_overlap: 5, ..RetrievalConfig::default() }
}

fn session_in(root: &TempDir, embedder: Arc<dyn Embedder>) -> Session {
    let staging = SessionConfig { staging_dir: Some(root.path().display().to_string()) };
    Session::new(config(), &staging, embedder).expect("session")
}

fn entries(root: &TempDir) -> usize {
    std::fs::read_dir(root.path()).expect("read staging root").count()
}

#[tokio::test]
async fn query_before_upload_fails() {
    let root = TempDir::new().expect("tempdir");
    let session = session_in(&root, Arc::new(HashingEmbedder::new(256)));
    assert!(!session.is_loaded().await);
    let err = session.answerable_passages("cat", 4).await.expect_err("nothing loaded");
    assert!(matches!(err, Error::NoDocumentLoaded));
}

#[tokio::test]
async fn upload_stages_file_and_answers() {
    let root = TempDir::new().expect("tempdir");
    let session = session_in(&root, Arc::new(HashingEmbedder::new(256)));
    session.upload("notes/cats.txt", b"A cat sat. A dog ran. Cats are mammals.").await.expect("upload");

    let staging = session.staging_path().await.expect("staging dir");
    assert!(staging.starts_with(root.path()));
    assert!(staging.join("cats.txt").is_file());

    let passages = session.answerable_passages("cat", 4).await.expect("query");
    assert_eq!(passages[0].chunk.text, "A cat sat. ");
    assert_eq!(passages[0].chunk.doc_id, "cats.txt");
}

#[tokio::test]
async fn reupload_swaps_document_and_removes_old_staging() {
    let root = TempDir::new().expect("tempdir");
    let session = session_in(&root, Arc::new(HashingEmbedder::new(256)));
    let first = session.upload("a.txt", b"Otters hold hands while sleeping.").await.expect("upload a");
    let first_dir = session.staging_path().await.expect("staging a");

    session.upload("b.txt", b"Volcanoes erupt molten rock.").await.expect("upload b");
    let second_dir = session.staging_path().await.expect("staging b");

    assert!(!first_dir.exists());
    assert!(second_dir.exists());
    assert_eq!(entries(&root), 1);

    // A snapshot taken before the swap keeps answering from the old document.
    let old = first.answerable_passages("otters", 2).await.expect("old snapshot");
    assert_eq!(old[0].chunk.doc_id, "a.txt");
    let new = session.answerable_passages("volcanoes", 2).await.expect("query");
    assert_eq!(new[0].chunk.doc_id, "b.txt");
    assert!(session.answerable_passages("otters", 4).await.expect("query").iter().all(|p| p.chunk.doc_id == "b.txt"));
}

#[tokio::test]
async fn failed_upload_cleans_up_and_keeps_previous_document() {
    let root = TempDir::new().expect("tempdir");
    let embedder = Arc::new(FlakyEmbedder::new());
    let session = session_in(&root, embedder.clone());
    session.upload("good.txt", b"Bees make honey.").await.expect("upload");

    embedder.set_down(true);
    let err = session.upload("bad.txt", b"Wasps do not.").await.err().expect("embedder down");
    assert!(matches!(err, Error::EmbeddingUnavailable(msg) if msg.contains("unreachable")));
    assert_eq!(entries(&root), 1);

    embedder.set_down(false);
    let passages = session.answerable_passages("honey", 1).await.expect("query");
    assert_eq!(passages[0].chunk.doc_id, "good.txt");
}

#[tokio::test]
async fn query_fails_when_one_source_fails() {
    let root = TempDir::new().expect("tempdir");
    let embedder = Arc::new(FlakyEmbedder::new());
    let session = session_in(&root, embedder.clone());
    session.upload("bees.txt", b"Bees make honey.").await.expect("upload");

    embedder.set_down(true);
    let err = session.answerable_passages("honey", 2).await.expect_err("vector source down");
    assert!(matches!(err, Error::EmbeddingUnavailable(_)));
}

#[tokio::test]
async fn close_unloads_and_deletes_staging() {
    let root = TempDir::new().expect("tempdir");
    let session = session_in(&root, Arc::new(HashingEmbedder::new(256)));
    session.upload("a.txt", b"Some text.").await.expect("upload");
    let dir = session.staging_path().await.expect("staging");

    session.close().await.expect("close");
    assert!(!dir.exists());
    assert!(matches!(session.answerable_passages("text", 1).await, Err(Error::NoDocumentLoaded)));
    session.close().await.expect("second close is a no-op");
}

#[tokio::test]
async fn dropping_session_deletes_staging() {
    let root = TempDir::new().expect("tempdir");
    let session = session_in(&root, Arc::new(HashingEmbedder::new(256)));
    session.upload("a.txt", b"Some text.").await.expect("upload");
    drop(session);
    assert_eq!(entries(&root), 0);
}

#[tokio::test]
async fn invalid_utf8_is_decoded_lossily() {
    let root = TempDir::new().expect("tempdir");
    let session = session_in(&root, Arc::new(HashingEmbedder::new(256)));
    let pipeline = session.upload("latin1.txt", b"caf\xe9 au lait").await.expect("upload");
    assert_eq!(pipeline.document().text, "caf\u{fffd} au lait");
}

#[tokio::test]
async fn invalid_configuration_is_rejected_up_front() {
    let bad = RetrievalConfig { top_k_fused: 0, ..config() };
    let err = Session::new(bad, &SessionConfig::default(), Arc::new(HashingEmbedder::new(8))).err().expect("invalid");
    assert!(matches!(err, Error::InvalidConfiguration(_)));
}

#[tokio::test]
async fn ask_renders_passages_into_prompt() {
    let root = TempDir::new().expect("tempdir");
    let session = session_in(&root, Arc::new(HashingEmbedder::new(256)));
    session.upload("cats.txt", b"A cat sat. A dog ran. Cats are mammals.").await.expect("upload");

    let answer = ask(&session, &PromptTemplate::default(), &EchoSynthesizer, "Where did the cat sit?", 4)
        .await
        .expect("ask");
    assert!(answer.text.contains("<context>\nA cat sat. "));
    assert!(answer.text.contains("# Question: Where did the cat sit?"));
    assert!(answer.text.contains("two follow-up queries"));
    assert!(!answer.passages.is_empty());
}
