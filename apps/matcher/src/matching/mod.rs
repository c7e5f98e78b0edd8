// Skill matching pipeline: extract skills from the JD, verify each against CV
// evidence, aggregate into the weighted report.
// All model calls go through llm_client.

pub mod aggregator;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod skill_extractor;
pub mod skill_verifier;
