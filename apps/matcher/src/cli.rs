use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;
use crate::documents::{ChunkingConfig, LoadMode};
use crate::matching::pipeline::MatchJob;
use crate::matching::skill_verifier::VerifyOptions;
use crate::retrieval::DEFAULT_TOP_K;

/// Score how well a CV matches a job description.
#[derive(Debug, Parser)]
#[command(name = "matcher", version)]
pub struct Cli {
    /// Path to the CV (PDF, TXT or MD)
    #[arg(long, default_value = "data/cv.pdf")]
    pub cv: PathBuf,

    /// Path to the job description (PDF, TXT or MD)
    #[arg(long, default_value = "data/jd.pdf")]
    pub jd: PathBuf,

    /// Where to write the JSON report; an existing file is overwritten
    #[arg(long, default_value = "matched_skills.json")]
    pub out: PathBuf,

    /// CV passages retrieved per skill
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    pub top_k: usize,

    /// Maximum skill checks in flight
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..))]
    pub concurrency: u16,

    /// How the CV is split for retrieval
    #[arg(long, value_enum, default_value_t = LoadMode::Chunked)]
    pub cv_mode: LoadMode,

    /// How the job description is split before extraction
    #[arg(long, value_enum, default_value_t = LoadMode::Whole)]
    pub jd_mode: LoadMode,

    /// Chunk size in characters for chunked documents
    #[arg(long, default_value_t = 500)]
    pub chunk_size: usize,

    /// Overlap in characters between neighbouring chunks
    #[arg(long, default_value_t = 100)]
    pub chunk_overlap: usize,
}

impl Cli {
    pub fn into_job(self, config: &Config) -> MatchJob {
        MatchJob {
            cv_path: self.cv,
            jd_path: self.jd,
            out_path: self.out,
            cv_mode: self.cv_mode,
            jd_mode: self.jd_mode,
            chunking: ChunkingConfig {
                chunk_size: self.chunk_size,
                chunk_overlap: self.chunk_overlap,
            },
            verify: VerifyOptions {
                top_k: self.top_k,
                concurrency: usize::from(self.concurrency),
                call_timeout: config.llm_timeout(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn test_config() -> Config {
        Config::from_lookup(|key| (key == "GROQ_API_TOKEN").then(|| "gsk_test".to_string())).unwrap()
    }

    #[test]
    fn test_command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["matcher"]).unwrap();
        assert_eq!(cli.cv, PathBuf::from("data/cv.pdf"));
        assert_eq!(cli.jd, PathBuf::from("data/jd.pdf"));
        assert_eq!(cli.out, PathBuf::from("matched_skills.json"));
        assert_eq!(cli.top_k, 4);
        assert_eq!(cli.cv_mode, LoadMode::Chunked);
        assert_eq!(cli.jd_mode, LoadMode::Whole);

        let job = cli.into_job(&test_config());
        assert_eq!(job.chunking.chunk_size, 500);
        assert_eq!(job.chunking.chunk_overlap, 100);
        assert_eq!(job.verify.concurrency, 4);
        assert_eq!(job.verify.call_timeout.as_secs(), 60);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "matcher",
            "--cv",
            "in/resume.txt",
            "--jd",
            "in/job.pdf",
            "--out",
            "out/report.json",
            "--jd-mode",
            "chunked",
            "--cv-mode",
            "whole",
            "--concurrency",
            "1",
        ])
        .unwrap();
        assert_eq!(cli.jd, PathBuf::from("in/job.pdf"));
        assert_eq!(cli.jd_mode, LoadMode::Chunked);
        assert_eq!(cli.cv_mode, LoadMode::Whole);
        assert_eq!(cli.concurrency, 1);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Cli::try_parse_from(["matcher", "--concurrency", "0"]).is_err());
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(Cli::try_parse_from(["matcher", "--cv-mode", "pages"]).is_err());
    }
}
