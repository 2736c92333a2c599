use docqa_core::config::{EmbeddingConfig, EmbeddingProvider};
use docqa_core::traits::Embedder;
use docqa_embed::{default_embedder, HashingEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hashing_embedder_shapes_and_determinism() {
    let embedder = HashingEmbedder::new(128);
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 128);
    assert_eq!(embedder.dim(), 128);
    assert_eq!(embedder.id(), "hashing:d128");

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn shared_words_are_more_similar() {
    let embedder = HashingEmbedder::new(384);
    let q = embedder.embed_text("cat");
    let near = embedder.embed_text("A cat sat.");
    let far = embedder.embed_text("A dog ran.");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn text_without_tokens_embeds_to_zero() {
    let embedder = HashingEmbedder::new(16);
    assert!(embedder.embed_text("  ?! ").iter().all(|x| *x == 0.0));
}

#[test]
fn default_embedder_honours_provider() {
    let config = EmbeddingConfig { provider: EmbeddingProvider::Hashing, dim: 32, ..EmbeddingConfig::default() };
    let embedder = default_embedder(&config).expect("embedder");
    assert_eq!(embedder.dim(), 32);
}

#[test]
fn default_embedder_reports_missing_model() {
    let env_override = ["APP_USE_FAKE_EMBEDDINGS", "APP_MODEL_DIR", "MODEL_DIR"].iter().any(|k| std::env::var(k).is_ok());
    let local_model = ["models/all-MiniLM-L6-v2", "../models/all-MiniLM-L6-v2"].iter().any(|p| std::path::Path::new(p).exists());
    if env_override || local_model {
        return;
    }
    let config = EmbeddingConfig { model_dir: Some("/nonexistent/model/dir".into()), ..EmbeddingConfig::default() };
    assert!(default_embedder(&config).is_err());
}

/// Needs a local all-MiniLM-L6-v2 checkout:
/// `APP_MODEL_DIR=/path/to/all-MiniLM-L6-v2 cargo test -p docqa-embed -- --ignored`
#[ignore]
#[test]
fn sentence_embedder_from_model_dir() {
    let dir = std::env::var("APP_MODEL_DIR").expect("APP_MODEL_DIR");
    let embedder = docqa_embed::SentenceEmbedder::load(std::path::Path::new(&dir), 128, 8).expect("load");
    let embs = embedder
        .embed_batch(&["A cat sat on the mat.".to_string(), "Felines are mammals.".to_string(), "Stock prices fell.".to_string()])
        .expect("embed");
    assert_eq!(embs.len(), 3);
    assert_eq!(embs[0].len(), embedder.dim());
    assert!(cosine(&embs[0], &embs[1]) > cosine(&embs[0], &embs[2]));
}

#[test]
fn zero_dimension_is_reported_not_rounded_up() {
    let config = EmbeddingConfig { provider: EmbeddingProvider::Hashing, dim: 0, ..EmbeddingConfig::default() };
    let embedder = default_embedder(&config).expect("embedder");
    assert_eq!(embedder.dim(), 0);
    assert_eq!(embedder.id(), "hashing:d0");
    assert!(HashingEmbedder::new(0).embed_text("a cat").is_empty());
}
