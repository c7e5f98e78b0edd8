//! Evidence retrieval — nearest-neighbour search over the chunked CV.
//!
//! `CvRetriever` must be built before it is queried. An empty corpus is a valid
//! index and always answers with no passages.

pub mod embeddings;

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::documents::TextChunk;
use crate::errors::MatchError;

pub use embeddings::{Embedder, HashEmbedder, HttpEmbedder, HttpEmbedderConfig};

pub const DEFAULT_TOP_K: usize = 4;

/// One retrieved CV passage.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvidencePassage {
    pub text: String,
    /// Position of the source chunk in the CV.
    pub chunk_index: usize,
    /// Byte offset of the chunk in the extracted CV text.
    pub start_pos: usize,
    /// 0-based rank in this result list.
    pub rank: usize,
    pub score: f32,
}

/// Anything that can answer "which passages talk about X".
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn relevant_passages(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<EvidencePassage>, MatchError>;
}

struct IndexedChunk {
    chunk: TextChunk,
    embedding: Vec<f32>,
}

/// Flat cosine-similarity index over CV chunks.
pub struct CvRetriever {
    embedder: Arc<dyn Embedder>,
    index: Option<Vec<IndexedChunk>>,
}

impl CvRetriever {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            index: None,
        }
    }

    #[cfg(test)]
    pub fn is_ready(&self) -> bool {
        self.index.is_some()
    }

    /// Embeds every chunk and replaces any previous index.
    pub async fn build(&mut self, chunks: Vec<TextChunk>) -> Result<(), MatchError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_documents(&texts).await?
        };

        if embeddings.len() != chunks.len() {
            return Err(MatchError::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let index: Vec<IndexedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexedChunk { chunk, embedding })
            .collect();

        info!(
            chunk_count = index.len(),
            dimension = index.first().map(|c| c.embedding.len()).unwrap_or(0),
            embedder = self.embedder.name(),
            "Evidence index built"
        );

        self.index = Some(index);
        Ok(())
    }

    /// Top-`k` chunks by cosine similarity; ties go to the earlier chunk.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<EvidencePassage>, MatchError> {
        let index = self.index.as_ref().ok_or(MatchError::NotReady)?;
        if index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(text).await?;

        let mut scored: Vec<(f32, &IndexedChunk)> = index
            .iter()
            .map(|entry| {
                (
                    embeddings::cosine_similarity(&query_vector, &entry.embedding),
                    entry,
                )
            })
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.chunk.index.cmp(&b.1.chunk.index))
        });

        let passages: Vec<EvidencePassage> = scored
            .into_iter()
            .take(k)
            .enumerate()
            .map(|(rank, (score, entry))| EvidencePassage {
                text: entry.chunk.content.clone(),
                chunk_index: entry.chunk.index,
                start_pos: entry.chunk.start_pos,
                rank,
                score,
            })
            .collect();

        debug!(query = text, returned = passages.len(), "Evidence retrieved");
        Ok(passages)
    }
}

#[async_trait]
impl EvidenceSource for CvRetriever {
    async fn relevant_passages(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<EvidencePassage>, MatchError> {
        self.query(query, k).await
    }
}
