//! Skill Verifier — checks every required skill against retrieved CV evidence.
//!
//! Each (category, skill) pair is independent, so checks run concurrently on a
//! bounded set of tasks. Results land in a pre-sized slot per skill, so output
//! order always matches requirement order.
//!
//! Failure policy: a failed or malformed model reply degrades that one skill to
//! `SkillVerdict::failed`. Only `MatchError::NotReady` aborts the batch.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::errors::MatchError;
use crate::llm_client::{call_json, LanguageModel};
use crate::matching::models::{CategoryVerdicts, SkillRequirementSet, SkillVerdict, VerdictMap};
use crate::matching::prompts::{SKILL_VERIFICATION_PROMPT_TEMPLATE, SKILL_VERIFICATION_SYSTEM};
use crate::retrieval::{EvidenceSource, DEFAULT_TOP_K};

#[derive(Debug, Clone)]
pub struct VerifyOptions {
    /// Passages retrieved per skill.
    pub top_k: usize,
    /// Maximum skill checks in flight.
    pub concurrency: usize,
    /// Deadline for one skill check, retrieval included; expiry counts as a failed call.
    pub call_timeout: Duration,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            concurrency: 4,
            call_timeout: Duration::from_secs(60),
        }
    }
}

/// Shape the model is asked to return for one skill.
#[derive(Debug, Deserialize)]
struct VerdictReply {
    #[serde(default)]
    skill: Option<String>,
    matched: bool,
    reason: String,
}

/// Verifies every skill in `requirements` and returns verdicts per category.
pub async fn verify_skills(
    requirements: &SkillRequirementSet,
    llm: Arc<dyn LanguageModel>,
    evidence: Arc<dyn EvidenceSource>,
    options: &VerifyOptions,
) -> Result<VerdictMap, MatchError> {
    // Flatten to (category slot, skill) so every check gets its own result slot
    let jobs: Vec<(usize, String)> = requirements
        .iter()
        .enumerate()
        .flat_map(|(cat_idx, (_, skills))| skills.iter().map(move |s| (cat_idx, s.clone())))
        .collect();

    info!(
        skills = jobs.len(),
        concurrency = options.concurrency,
        "Verifying skills against CV"
    );

    let mut slots: Vec<Option<SkillVerdict>> = vec![None; jobs.len()];
    let mut tasks: JoinSet<(usize, Result<SkillVerdict, MatchError>)> = JoinSet::new();
    let limit = options.concurrency.max(1);

    for (slot, (_, skill)) in jobs.iter().enumerate() {
        while tasks.len() >= limit {
            collect_next(&mut tasks, &mut slots, &jobs).await?;
        }

        let llm = Arc::clone(&llm);
        let evidence = Arc::clone(&evidence);
        let skill = skill.clone();
        let options = options.clone();
        tasks.spawn(async move {
            let outcome = check_skill(&skill, llm.as_ref(), evidence.as_ref(), &options).await;
            (slot, outcome)
        });
    }

    while !tasks.is_empty() {
        collect_next(&mut tasks, &mut slots, &jobs).await?;
    }

    let mut verdicts: VerdictMap = requirements
        .iter()
        .map(|(category, _)| CategoryVerdicts {
            category: category.as_str().to_string(),
            verdicts: Vec::new(),
        })
        .collect();

    for ((cat_idx, skill), verdict) in jobs.into_iter().zip(slots) {
        // A slot is only empty if its task panicked
        let verdict = verdict.unwrap_or_else(|| SkillVerdict::failed(&skill));
        verdicts[cat_idx].verdicts.push(verdict);
    }

    Ok(verdicts)
}

/// Waits for one finished check and stores its verdict. Aborts the batch on a
/// fatal error.
async fn collect_next(
    tasks: &mut JoinSet<(usize, Result<SkillVerdict, MatchError>)>,
    slots: &mut [Option<SkillVerdict>],
    jobs: &[(usize, String)],
) -> Result<(), MatchError> {
    let Some(joined) = tasks.join_next().await else {
        return Ok(());
    };

    match joined {
        Ok((slot, Ok(verdict))) => {
            debug!(skill = %verdict.skill, matched = verdict.matched, "Skill verdict");
            slots[slot] = Some(verdict);
        }
        Ok((_, Err(e))) if e.is_fatal_for_batch() => {
            tasks.abort_all();
            return Err(e);
        }
        Ok((slot, Err(e))) => {
            let skill = &jobs[slot].1;
            warn!("Error checking skill '{skill}': {e}");
            slots[slot] = Some(SkillVerdict::failed(skill));
        }
        Err(e) => {
            warn!("Skill check task did not complete: {e}");
        }
    }

    Ok(())
}

/// Runs one skill check under the per-skill deadline; retrieval and the model call share it.
async fn check_skill(
    skill: &str,
    llm: &dyn LanguageModel,
    evidence: &dyn EvidenceSource,
    options: &VerifyOptions,
) -> Result<SkillVerdict, MatchError> {
    tokio::time::timeout(options.call_timeout, judge_skill(skill, llm, evidence, options.top_k))
        .await
        .map_err(|_| {
            MatchError::Transport(format!(
                "skill check timed out after {}s",
                options.call_timeout.as_secs()
            ))
        })?
}

/// Retrieves evidence for one skill and asks the model for a verdict.
async fn judge_skill(
    skill: &str,
    llm: &dyn LanguageModel,
    evidence: &dyn EvidenceSource,
    top_k: usize,
) -> Result<SkillVerdict, MatchError> {
    let passages = evidence.relevant_passages(skill, top_k).await?;
    debug!(
        skill,
        passages = passages.len(),
        top_score = passages.first().map(|p| p.score).unwrap_or(0.0),
        "Evidence gathered"
    );
    let context = passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = SKILL_VERIFICATION_PROMPT_TEMPLATE
        .replace("{skill}", skill)
        .replace("{context}", &context);

    let reply: VerdictReply = call_json(llm, SKILL_VERIFICATION_SYSTEM, &prompt).await?;

    if let Some(echoed) = reply.skill.as_deref() {
        if !echoed.eq_ignore_ascii_case(skill) {
            debug!(requested = skill, echoed, "Model echoed a different skill name");
        }
    }

    Ok(SkillVerdict {
        skill: skill.to_string(),
        matched: reply.matched,
        reason: reply.reason.trim().to_string(),
    })
}
