//! Document loading — turns a CV or JD file into ordered text chunks.
//!
//! PDFs go through `pdf-extract`; `.txt` / `.md` files are read as UTF-8.
//! Whether a document is kept whole or windowed is chosen per document.

pub mod chunker;

use std::path::Path;

use clap::ValueEnum;
use tracing::debug;

use crate::errors::MatchError;

pub use chunker::{chunk_text, ChunkingConfig, TextChunk};

/// How a loaded document is turned into retrieval units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoadMode {
    /// One unit containing the whole document text.
    Whole,
    /// Overlapping fixed-size windows.
    Chunked,
}

/// Loads `path` and splits it according to `mode`.
pub fn load_document(
    path: &Path,
    mode: LoadMode,
    chunking: &ChunkingConfig,
) -> Result<Vec<TextChunk>, MatchError> {
    let text = read_text(path)?;

    let chunks = match mode {
        LoadMode::Whole => vec![TextChunk {
            content: text,
            index: 0,
            start_pos: 0,
        }],
        LoadMode::Chunked => chunk_text(&text, chunking)?,
    };

    debug!(
        path = %path.display(),
        mode = ?mode,
        chunk_count = chunks.len(),
        "Document loaded"
    );

    Ok(chunks)
}

/// Extracts the plain text of a document, dispatching on file extension.
pub fn read_text(path: &Path) -> Result<String, MatchError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let raw = match extension.as_deref() {
        Some("pdf") => {
            let bytes = std::fs::read(path).map_err(|e| MatchError::io(path, e))?;
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| MatchError::Document {
                path: path.to_path_buf(),
                message: format!("PDF text extraction failed: {e}"),
            })?
        }
        Some("txt") | Some("md") => {
            std::fs::read_to_string(path).map_err(|e| MatchError::io(path, e))?
        }
        other => {
            return Err(MatchError::Document {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported file type {:?}; expected .pdf, .txt or .md",
                    other.unwrap_or("")
                ),
            })
        }
    };

    let cleaned = clean_text(&raw);
    if cleaned.is_empty() {
        return Err(MatchError::Document {
            path: path.to_path_buf(),
            message: "no text content extracted".to_string(),
        });
    }

    Ok(cleaned)
}

/// Normalizes line endings and collapses runs of blank lines left by PDF extraction.
fn clean_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.replace("\r\n", "\n").lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        cleaned.push_str(line);
        cleaned.push('\n');
    }

    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_whole_mode_returns_single_unit() {
        let file = write_temp(".txt", "Senior Rust Engineer\n\nRequired: Docker, Kubernetes.");
        let chunks = load_document(file.path(), LoadMode::Whole, &ChunkingConfig::default()).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert!(chunks[0].content.contains("Kubernetes"));
    }

    #[test]
    fn test_chunked_mode_windows_long_text() {
        let text = "Built container pipelines with Docker and Kubernetes. ".repeat(40);
        let file = write_temp(".md", &text);
        let config = ChunkingConfig {
            chunk_size: 200,
            chunk_overlap: 40,
        };
        let chunks = load_document(file.path(), LoadMode::Chunked, &config).unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.content.chars().count() <= 200));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_text(Path::new("/definitely/not/here/cv.txt")).unwrap_err();
        assert!(matches!(err, MatchError::Io { .. }));
    }

    #[test]
    fn test_unsupported_extension_is_document_error() {
        let file = write_temp(".docx", "binary-ish");
        let err = read_text(file.path()).unwrap_err();
        assert!(matches!(err, MatchError::Document { .. }));
    }

    #[test]
    fn test_blank_document_is_document_error() {
        let file = write_temp(".txt", "   \n\n  \n");
        let err = read_text(file.path()).unwrap_err();
        assert!(matches!(err, MatchError::Document { .. }));
    }

    #[test]
    fn test_invalid_pdf_is_document_error() {
        let file = write_temp(".pdf", "this is not a pdf");
        let err = read_text(file.path()).unwrap_err();
        assert!(matches!(err, MatchError::Document { .. }));
    }

    #[test]
    fn test_clean_text_collapses_blank_runs() {
        let cleaned = clean_text("Skills\r\n\r\n\r\n\r\nRust   \nGo\n");
        assert_eq!(cleaned, "Skills\n\nRust\nGo");
    }
}
