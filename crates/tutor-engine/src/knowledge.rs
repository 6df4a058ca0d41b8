//! Exercise knowledge base: corpus chunks embedded through the `llm` crate
//! and stored in a Qdrant collection.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use llm::builder::LLMBuilder;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeleteCollectionBuilder, Distance, Filter, PointStruct,
    SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;

use tutor_core::corpus::{self, TextSplitter};
use tutor_core::{AiSettings, Document, RetrievedPassage};

use crate::engine::map_backend;
use crate::error::{EngineError, Result};
use crate::retrieval::ContextProvider;

/// Chunks embedded per request.
const EMBED_BATCH: usize = 64;

#[derive(Debug, Clone)]
struct Embedder {
    provider: String,
    model: String,
    api_key: String,
}

impl Embedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = texts.len();
        let mut builder = LLMBuilder::new()
            .backend(map_backend(&self.provider)?)
            .model(&self.model);
        if !self.api_key.is_empty() {
            builder = builder.api_key(&self.api_key);
        }
        let llm = builder
            .build()
            .map_err(|e| EngineError::Config(format!("build embedder: {e}")))?;

        let vectors = llm
            .embed(texts)
            .await
            .map_err(|e| EngineError::Embedding(e.to_string()))?;

        if vectors.len() != expected {
            return Err(EngineError::Embedding(format!(
                "got {} embeddings for {} texts",
                vectors.len(),
                expected
            )));
        }
        Ok(vectors)
    }
}

pub struct KnowledgeBase {
    qdrant: Qdrant,
    collection: String,
    embedder: Embedder,
    splitter: TextSplitter,
    exercises_dir: PathBuf,
}

impl KnowledgeBase {
    pub fn connect(settings: &AiSettings) -> Result<Self> {
        let qdrant = Qdrant::from_url(&settings.qdrant_url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| EngineError::Config(format!("qdrant at {}: {e}", settings.qdrant_url)))?;

        tracing::info!(url = %settings.qdrant_url, collection = %settings.collection, "knowledge base configured");

        Ok(Self {
            qdrant,
            collection: settings.collection.clone(),
            embedder: Embedder {
                provider: settings.embedding_provider.clone(),
                model: settings.embedding_model.clone(),
                api_key: settings.embedding_key().to_string(),
            },
            splitter: TextSplitter::new(settings.chunk_size, settings.chunk_overlap),
            exercises_dir: settings.exercises_dir.clone(),
        })
    }

    pub fn exercises_dir(&self) -> &Path {
        &self.exercises_dir
    }

    async fn collection_exists(&self) -> Result<bool> {
        self.qdrant
            .collection_exists(self.collection.as_str())
            .await
            .map_err(|e| EngineError::Retrieval(e.to_string()))
    }

    /// Create the collection if missing. The vector size comes from a probe
    /// embedding so it always matches the configured model.
    pub async fn ensure_collection(&self) -> Result<()> {
        if self.collection_exists().await? {
            return Ok(());
        }
        let probe = self.embedder.embed(vec!["dimension probe".to_string()]).await?;
        let dim = probe.first().map(Vec::len).unwrap_or(0);
        if dim == 0 {
            return Err(EngineError::Embedding("probe embedding was empty".to_string()));
        }

        tracing::info!(collection = %self.collection, dim, "creating collection");
        self.qdrant
            .create_collection(
                CreateCollectionBuilder::new(&self.collection)
                    .vectors_config(VectorParamsBuilder::new(dim as u64, Distance::Cosine)),
            )
            .await
            .map_err(|e| EngineError::Retrieval(format!("create collection: {e}")))?;
        Ok(())
    }

    /// Load, chunk and index every supported file under `dir` (the configured
    /// exercises directory when `None`). Returns the number of chunks indexed.
    pub async fn index_documents(&self, dir: Option<&Path>) -> Result<usize> {
        let dir = dir.unwrap_or(&self.exercises_dir);
        let documents = corpus::load_directory(dir, &self.splitter)?;
        if documents.is_empty() {
            tracing::warn!(dir = %dir.display(), "no exercise material found");
            return Ok(0);
        }
        let count = self.index_chunks(&documents).await?;
        tracing::info!(dir = %dir.display(), chunks = count, "indexed document chunks");
        Ok(count)
    }

    /// Split and index one text under the given source name.
    pub async fn add_document(&self, content: &str, source: &str) -> Result<usize> {
        let documents = self.splitter.split_document(content, source);
        if documents.is_empty() {
            return Ok(0);
        }
        self.index_chunks(&documents).await
    }

    async fn index_chunks(&self, documents: &[Document]) -> Result<usize> {
        self.ensure_collection().await?;

        let mut stored = 0;
        for batch in documents.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let vectors = self.embedder.embed(texts).await?;

            let points: Vec<PointStruct> = batch
                .iter()
                .zip(vectors)
                .map(|(doc, vector)| {
                    let mut payload: HashMap<String, QdrantValue> = HashMap::new();
                    payload.insert("content".to_string(), doc.content.clone().into());
                    payload.insert("source".to_string(), doc.source.clone().into());
                    payload.insert("chunk".to_string(), (doc.chunk as i64).into());
                    PointStruct::new(point_id(doc), vector, payload)
                })
                .collect();

            stored += points.len();
            self.qdrant
                .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true))
                .await
                .map_err(|e| EngineError::Retrieval(format!("upsert: {e}")))?;
            tracing::debug!(collection = %self.collection, stored, "upserted batch");
        }
        Ok(stored)
    }

    /// Drop the whole collection. Indexing again recreates it.
    pub async fn clear_index(&self) -> Result<()> {
        if !self.collection_exists().await? {
            return Ok(());
        }
        self.qdrant
            .delete_collection(DeleteCollectionBuilder::new(&self.collection))
            .await
            .map_err(|e| EngineError::Retrieval(format!("delete collection: {e}")))?;
        tracing::info!(collection = %self.collection, "index cleared");
        Ok(())
    }

    pub async fn retrieve_with_score(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        self.search(query, k, None).await
    }

    /// Top-`k` passages for `query`, optionally restricted to chunks of one
    /// source file.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        source: Option<&str>,
    ) -> Result<Vec<RetrievedPassage>> {
        if k == 0 || !self.collection_exists().await? {
            return Ok(Vec::new());
        }

        let vector = self
            .embedder
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut request =
            SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(true);
        if let Some(filter) = source_filter(source) {
            request = request.filter(filter);
        }

        let response = self
            .qdrant
            .search_points(request)
            .await
            .map_err(|e| EngineError::Retrieval(format!("search: {e}")))?;

        let passages = response
            .result
            .into_iter()
            .filter_map(|point| {
                let content = point.payload.get("content")?.as_str()?.to_string();
                let source = point
                    .payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "Unknown".to_string());
                Some(RetrievedPassage::new(content, source).with_score(point.score))
            })
            .collect::<Vec<_>>();

        tracing::debug!(k, ?source, hits = passages.len(), "retrieved passages");
        Ok(passages)
    }
}

#[async_trait]
impl ContextProvider for KnowledgeBase {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        self.retrieve_with_score(query, k).await
    }
}

fn source_filter(source: Option<&str>) -> Option<Filter> {
    source.map(|s| Filter::must([Condition::matches("source", s.to_string())]))
}

/// Stable point id for a chunk, so re-indexing a file overwrites its points.
fn point_id(doc: &Document) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    doc.source.hash(&mut hasher);
    doc.chunk.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(source: &str, chunk: usize) -> Document {
        Document {
            content: "body".to_string(),
            source: source.to_string(),
            chunk,
        }
    }

    #[test]
    fn point_id_depends_on_source_and_chunk() {
        assert_eq!(point_id(&doc("a.md", 0)), point_id(&doc("a.md", 0)));
        assert_ne!(point_id(&doc("a.md", 0)), point_id(&doc("a.md", 1)));
        assert_ne!(point_id(&doc("a.md", 0)), point_id(&doc("b.md", 0)));
    }

    #[test]
    fn source_filter_only_when_requested() {
        assert!(source_filter(None).is_none());
        let filter = source_filter(Some("loops.md")).unwrap();
        assert_eq!(filter.must.len(), 1);
        assert!(filter.should.is_empty());
    }
}
