//! Text chunking module
//!
//! Splits résumé text into overlapping windows for retrieval.

use text_splitter::{ChunkConfig, TextSplitter};
use tracing::debug;

use crate::errors::MatchError;

/// Configuration for text chunking
#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between neighbouring chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

/// A text chunk with its position in the source document
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    /// The chunk content
    pub content: String,
    /// Index of this chunk in the document
    pub index: usize,
    /// Start byte offset in the original text
    pub start_pos: usize,
}

/// Split text into overlapping chunks, preferring paragraph, line, then word boundaries.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Result<Vec<TextChunk>, MatchError> {
    let chunk_config = ChunkConfig::new(config.chunk_size)
        .with_overlap(config.chunk_overlap)
        .map_err(|e| MatchError::Document {
            path: Default::default(),
            message: format!("invalid chunking config: {e}"),
        })?;
    let splitter = TextSplitter::new(chunk_config);

    let chunks: Vec<TextChunk> = splitter
        .chunk_indices(text)
        .enumerate()
        .map(|(index, (start_pos, content))| TextChunk {
            content: content.to_string(),
            index,
            start_pos,
        })
        .collect();

    debug!(
        input_len = text.len(),
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        chunk_overlap = config.chunk_overlap,
        "Text chunked"
    );

    Ok(chunks)
}
