//! Skill Extractor — turns job-description text into a categorized requirement set.
//!
//! One structured model call per job description. Any failure here is fatal:
//! without the requirement set there is nothing to score.

use tracing::{error, info};

use crate::documents::TextChunk;
use crate::errors::MatchError;
use crate::llm_client::{call_json, LanguageModel};
use crate::matching::models::SkillRequirementSet;
use crate::matching::prompts::{SKILL_EXTRACTION_PROMPT_TEMPLATE, SKILL_EXTRACTION_SYSTEM};

/// Joins job-description units with single spaces, keeping their order.
pub fn join_chunks(chunks: &[TextChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.content.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extracts and normalizes the skills a job description asks for.
pub async fn extract_skills(
    jd_text: &str,
    llm: &dyn LanguageModel,
) -> Result<SkillRequirementSet, MatchError> {
    let prompt = SKILL_EXTRACTION_PROMPT_TEMPLATE.replace("{jd_text}", jd_text);

    let raw: SkillRequirementSet = call_json(llm, SKILL_EXTRACTION_SYSTEM, &prompt)
        .await
        .map_err(|e| {
            error!("Failed to read skills from job description: {e}");
            MatchError::from(e)
        })?;

    let requirements = raw.normalized();

    info!(
        tech_stack_required = requirements.tech_stack_required.len(),
        tech_stack_optional = requirements.tech_stack_optional.len(),
        soft_skills = requirements.soft_skills.len(),
        domain_knowledge = requirements.domain_knowledge.len(),
        "Skills extracted from job description"
    );

    Ok(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed reply and records the prompts it was given.
    struct ScriptedModel {
        reply: Result<String, fn() -> LlmError>,
        seen: Mutex<Vec<(String, String, bool)>>,
    }

    impl ScriptedModel {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: fn() -> LlmError) -> Self {
            Self {
                reply: Err(err),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn invoke(
            &self,
            system: &str,
            user: &str,
            structured: bool,
        ) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((system.to_string(), user.to_string(), structured));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    const JD: &str = "Platform Engineer. Required: Docker, Kubernetes. Nice to have: Terraform.";

    #[test]
    fn test_join_chunks_preserves_order() {
        let chunks = vec![
            TextChunk {
                content: "Page one".to_string(),
                index: 0,
                start_pos: 0,
            },
            TextChunk {
                content: "Page two".to_string(),
                index: 1,
                start_pos: 9,
            },
        ];
        assert_eq!(join_chunks(&chunks), "Page one Page two");
    }

    #[tokio::test]
    async fn test_extracts_all_categories() {
        let model = ScriptedModel::replying(
            r#"{
                "tech_stack_required": ["Docker", "Kubernetes"],
                "tech_stack_optional": ["Terraform"],
                "soft_skills": ["Communication"],
                "domain_knowledge": []
            }"#,
        );

        let set = extract_skills(JD, &model).await.unwrap();
        assert_eq!(set.tech_stack_required, vec!["Docker", "Kubernetes"]);
        assert_eq!(set.tech_stack_optional, vec!["Terraform"]);
        assert_eq!(set.soft_skills, vec!["Communication"]);
        assert!(set.domain_knowledge.is_empty());
    }

    #[tokio::test]
    async fn test_sends_one_structured_call_with_jd_text() {
        let model = ScriptedModel::replying(r#"{"tech_stack_required": []}"#);
        extract_skills(JD, &model).await.unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (system, user, structured) = &seen[0];
        assert!(*structured);
        assert!(system.contains("tech_stack_required"));
        assert!(system.contains("domain_knowledge"));
        assert!(user.starts_with("Job description:"));
        assert!(user.contains("Nice to have: Terraform."));
    }

    #[tokio::test]
    async fn test_duplicates_removed_from_model_output() {
        let model = ScriptedModel::replying(
            r#"{"tech_stack_required": ["Docker", "docker", " Kubernetes "]}"#,
        );
        let set = extract_skills(JD, &model).await.unwrap();
        assert_eq!(set.tech_stack_required, vec!["Docker", "Kubernetes"]);
    }

    #[tokio::test]
    async fn test_invalid_json_is_fatal_schema_error() {
        let model = ScriptedModel::replying("Here are the skills: Docker, Kubernetes");
        let err = extract_skills(JD, &model).await.unwrap_err();
        assert!(matches!(err, MatchError::SchemaParse(_)));
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_fatal_schema_error() {
        let model = ScriptedModel::replying(r#"{"tech_stack_required": "Docker"}"#);
        let err = extract_skills(JD, &model).await.unwrap_err();
        assert!(matches!(err, MatchError::SchemaParse(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let model = ScriptedModel::failing(|| LlmError::Timeout { secs: 60 });
        let err = extract_skills(JD, &model).await.unwrap_err();
        assert!(matches!(err, MatchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_provider_error_is_refusal() {
        let model = ScriptedModel::failing(|| LlmError::Api {
            status: 401,
            message: "Invalid API Key".to_string(),
        });
        let err = extract_skills(JD, &model).await.unwrap_err();
        assert!(matches!(err, MatchError::ModelRefusal(_)));
    }
}
