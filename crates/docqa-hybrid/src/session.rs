//! Document lifecycle for one interactive session.
//!
//! A `Session` owns at most one loaded document: the retrieval pipeline built
//! over it and the temporary directory the uploaded file was staged in.
//! Uploading replaces both at once; queries already running keep the
//! pipeline snapshot they started with.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::RwLock;
use tracing::{info, warn};

use docqa_core::config::{RetrievalConfig, SessionConfig, Settings};
use docqa_core::traits::Embedder;
use docqa_core::types::Document;
use docqa_core::{Error, Result};

use crate::pipeline::{Passage, RetrievalPipeline};

const STAGING_PREFIX: &str = "docqa-";
const FALLBACK_FILE_NAME: &str = "document.txt";

struct Loaded {
    pipeline: Arc<RetrievalPipeline>,
    // Removed from disk when dropped.
    staging: TempDir,
}

pub struct Session {
    retrieval: RetrievalConfig,
    staging_root: PathBuf,
    embedder: Arc<dyn Embedder>,
    active: RwLock<Option<Loaded>>,
}

impl Session {
    pub fn new(retrieval: RetrievalConfig, session: &SessionConfig, embedder: Arc<dyn Embedder>) -> Result<Self> {
        retrieval.validate()?;
        Ok(Self { retrieval, staging_root: session.staging_root(), embedder, active: RwLock::new(None) })
    }

    pub fn from_settings(settings: &Settings, embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::new(settings.retrieval.clone(), &settings.session, embedder)
    }

    /// Stages `bytes` as `name` in a fresh temporary directory, indexes the
    /// text and makes it the active document. On failure the staging
    /// directory is removed and the previous document stays active.
    pub async fn upload(&self, name: &str, bytes: &[u8]) -> Result<Arc<RetrievalPipeline>> {
        tokio::fs::create_dir_all(&self.staging_root).await?;
        let staging = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir_in(&self.staging_root)?;
        let file_name = Path::new(name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_FILE_NAME)
            .to_owned();
        let path = staging.path().join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        let raw = tokio::fs::read(&path).await?;
        let text = match String::from_utf8(raw) {
            Ok(text) => text,
            Err(e) => {
                warn!(file = %file_name, "document is not valid UTF-8, replacing invalid sequences");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        let document = Document::new(file_name, path.display().to_string(), text);
        let pipeline = Arc::new(RetrievalPipeline::build(document, self.retrieval.clone(), Arc::clone(&self.embedder)).await?);

        let previous = self.active.write().await.replace(Loaded { pipeline: Arc::clone(&pipeline), staging });
        info!(
            doc_id = %pipeline.document().id,
            chunks = pipeline.chunks().len(),
            replaced = previous.is_some(),
            "document loaded"
        );
        drop(previous);
        Ok(pipeline)
    }

    /// The active pipeline, or `NoDocumentLoaded`.
    pub async fn current(&self) -> Result<Arc<RetrievalPipeline>> {
        self.active.read().await.as_ref().map(|l| Arc::clone(&l.pipeline)).ok_or(Error::NoDocumentLoaded)
    }

    pub async fn answerable_passages(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        let pipeline = self.current().await?;
        pipeline.answerable_passages(query, k).await
    }

    pub async fn is_loaded(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// Directory the active document was staged in.
    pub async fn staging_path(&self) -> Option<PathBuf> {
        self.active.read().await.as_ref().map(|l| l.staging.path().to_path_buf())
    }

    /// Unloads the active document and deletes its staging directory.
    pub async fn close(&self) -> Result<()> {
        if let Some(loaded) = self.active.write().await.take() {
            info!(doc_id = %loaded.pipeline.document().id, "session closed");
            loaded.staging.close()?;
        }
        Ok(())
    }
}
