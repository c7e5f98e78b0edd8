use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Sentinel reason stored on verdicts whose model call could not be completed.
pub const FAILED_VERDICT_REASON: &str = "LLM call failed or returned invalid JSON";

/// The four requirement buckets a job description is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillCategory {
    TechStackRequired,
    TechStackOptional,
    SoftSkills,
    DomainKnowledge,
}

impl SkillCategory {
    /// Report order.
    pub const ALL: [SkillCategory; 4] = [
        SkillCategory::TechStackRequired,
        SkillCategory::TechStackOptional,
        SkillCategory::SoftSkills,
        SkillCategory::DomainKnowledge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillCategory::TechStackRequired => "tech_stack_required",
            SkillCategory::TechStackOptional => "tech_stack_optional",
            SkillCategory::SoftSkills => "soft_skills",
            SkillCategory::DomainKnowledge => "domain_knowledge",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }

    /// Contribution weight in the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            SkillCategory::TechStackRequired => 5.0,
            SkillCategory::TechStackOptional => 2.0,
            SkillCategory::SoftSkills => 4.0,
            SkillCategory::DomainKnowledge => 1.0,
        }
    }
}

/// Weight for an arbitrary category name; unknown categories count 1.0.
pub fn category_weight(name: &str) -> f64 {
    SkillCategory::from_name(name)
        .map(|c| c.weight())
        .unwrap_or(1.0)
}

/// Skills extracted from one job description, grouped by category.
///
/// Decoded strictly from model output: every present key must hold a list of
/// strings. A missing key decodes to an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillRequirementSet {
    #[serde(default)]
    pub tech_stack_required: Vec<String>,
    #[serde(default)]
    pub tech_stack_optional: Vec<String>,
    #[serde(default)]
    pub soft_skills: Vec<String>,
    #[serde(default)]
    pub domain_knowledge: Vec<String>,
}

impl SkillRequirementSet {
    pub fn skills(&self, category: SkillCategory) -> &[String] {
        match category {
            SkillCategory::TechStackRequired => &self.tech_stack_required,
            SkillCategory::TechStackOptional => &self.tech_stack_optional,
            SkillCategory::SoftSkills => &self.soft_skills,
            SkillCategory::DomainKnowledge => &self.domain_knowledge,
        }
    }

    /// Categories in report order with their skills.
    pub fn iter(&self) -> impl Iterator<Item = (SkillCategory, &[String])> + '_ {
        SkillCategory::ALL
            .into_iter()
            .map(move |c| (c, self.skills(c)))
    }

    pub fn total_skills(&self) -> usize {
        self.iter().map(|(_, skills)| skills.len()).sum()
    }

    /// Trims names, drops blanks, and removes case-insensitive duplicates
    /// within each category (first spelling wins).
    pub fn normalized(self) -> Self {
        Self {
            tech_stack_required: dedup_skills(self.tech_stack_required),
            tech_stack_optional: dedup_skills(self.tech_stack_optional),
            soft_skills: dedup_skills(self.soft_skills),
            domain_knowledge: dedup_skills(self.domain_knowledge),
        }
    }
}

fn dedup_skills(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_lowercase()))
        .collect()
}

/// The matched / unmatched decision for one skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillVerdict {
    pub skill: String,
    pub matched: bool,
    pub reason: String,
}

impl SkillVerdict {
    /// Stand-in verdict for a skill whose check could not be completed.
    pub fn failed(skill: &str) -> Self {
        Self {
            skill: skill.to_string(),
            matched: false,
            reason: FAILED_VERDICT_REASON.to_string(),
        }
    }
}

/// All verdicts for one category, in requirement order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryVerdicts {
    pub category: String,
    pub verdicts: Vec<SkillVerdict>,
}

/// Verdicts for every category, in report order.
pub type VerdictMap = Vec<CategoryVerdicts>;
