//! Job Matcher — runs the full CV-vs-JD pipeline for one document pair.
//!
//! Flow: load CV + JD → build evidence index → extract skills → verify skills →
//!       summarize → write report.
//!
//! The report file is only written after every stage succeeds, so a fatal
//! error never leaves partial output behind.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::documents::{load_document, ChunkingConfig, LoadMode};
use crate::errors::MatchError;
use crate::llm_client::LanguageModel;
use crate::matching::aggregator::{summarize, write_report, MatchReport};
use crate::matching::skill_extractor::{extract_skills, join_chunks};
use crate::matching::skill_verifier::{verify_skills, VerifyOptions};
use crate::retrieval::{CvRetriever, Embedder};

/// Inputs and knobs for one run.
#[derive(Debug, Clone)]
pub struct MatchJob {
    pub cv_path: PathBuf,
    pub jd_path: PathBuf,
    pub out_path: PathBuf,
    pub cv_mode: LoadMode,
    pub jd_mode: LoadMode,
    pub chunking: ChunkingConfig,
    pub verify: VerifyOptions,
}

/// Runs the pipeline and writes the report to `job.out_path`.
pub async fn run_match(
    job: &MatchJob,
    llm: Arc<dyn LanguageModel>,
    embedder: Arc<dyn Embedder>,
) -> Result<MatchReport, MatchError> {
    let cv_chunks = load_document(&job.cv_path, job.cv_mode, &job.chunking)?;
    let jd_chunks = load_document(&job.jd_path, job.jd_mode, &job.chunking)?;
    info!(
        cv_chunks = cv_chunks.len(),
        jd_chunks = jd_chunks.len(),
        "Documents loaded"
    );

    let mut retriever = CvRetriever::new(embedder);
    retriever.build(cv_chunks).await?;

    let requirements = extract_skills(&join_chunks(&jd_chunks), llm.as_ref()).await?;
    if requirements.total_skills() == 0 {
        info!("Job description yielded no skills; report will be empty");
    }

    let verdicts = verify_skills(&requirements, llm, Arc::new(retriever), &job.verify).await?;

    let report = summarize(&verdicts);
    write_report(&report, &job.out_path)?;

    Ok(report)
}
