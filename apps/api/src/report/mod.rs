//! Narrative synthesis — the human-readable half of the evaluation.
//!
//! The skill gap is derived deterministically no matter what; only the prose
//! summary involves the external service, and any failure there degrades to a
//! fixed one-line sentence built from the total score.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::extraction::FeatureRecord;
use crate::llm_client::CompletionService;
use crate::scoring::ScoreBreakdown;

pub mod prompts;

/// Emitted as the skill gap when every job skill is covered.
pub const NO_GAPS_SENTINEL: &str = "No significant gaps identified.";

/// The narrative evaluation returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Markdown evaluation from the narrative service, or the deterministic
    /// fallback sentence.
    pub summary: String,
    /// Comma-joined sorted list of job skills missing from the résumé, or
    /// [`NO_GAPS_SENTINEL`].
    pub skill_gap: String,
}

/// Boundary adapter around the narrative service.
pub struct NarrativeSynthesizer {
    llm: Option<Arc<dyn CompletionService>>,
}

impl NarrativeSynthesizer {
    pub fn new(llm: Option<Arc<dyn CompletionService>>) -> Self {
        Self { llm }
    }

    pub async fn synthesize(
        &self,
        resume: &FeatureRecord,
        job: &FeatureRecord,
        breakdown: &ScoreBreakdown,
    ) -> Report {
        Report {
            summary: self.narrative(resume, job, breakdown).await,
            skill_gap: derive_skill_gap(resume, job),
        }
    }

    async fn narrative(
        &self,
        resume: &FeatureRecord,
        job: &FeatureRecord,
        breakdown: &ScoreBreakdown,
    ) -> String {
        let Some(llm) = &self.llm else {
            return fallback_summary(breakdown.total);
        };

        let prompt = prompts::NARRATIVE_PROMPT_TEMPLATE
            .replace("{fit_rating}", &breakdown.fit_rating.to_string())
            .replace("{skill_match}", &breakdown.skill_match.to_string())
            .replace("{keyword_match}", &breakdown.keyword_match.to_string())
            .replace("{experience_match}", &breakdown.experience_match.to_string())
            .replace("{structure_score}", &breakdown.structure_score.to_string())
            .replace("{resume_skills}", &resume.skills.join(", "))
            .replace("{job_skills}", &job.skills.join(", "));

        match llm.complete(&prompt, prompts::NARRATIVE_SYSTEM).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => fallback_summary(breakdown.total),
            Err(e) => {
                warn!("narrative service unavailable, using fallback summary: {e}");
                fallback_summary(breakdown.total)
            }
        }
    }
}

/// Job skills absent from the résumé under case-insensitive comparison:
/// de-duplicated, sorted, comma-joined. Always computed deterministically,
/// independent of the narrative service.
pub fn derive_skill_gap(resume: &FeatureRecord, job: &FeatureRecord) -> String {
    let resume_skills: std::collections::HashSet<String> =
        resume.skills.iter().map(|s| s.to_lowercase()).collect();

    let mut missing: Vec<&str> = job
        .skills
        .iter()
        .filter(|skill| !resume_skills.contains(&skill.to_lowercase()))
        .map(String::as_str)
        .collect();
    missing.sort_by_key(|skill| skill.to_lowercase());
    missing.dedup_by_key(|skill| skill.to_lowercase());

    if missing.is_empty() {
        NO_GAPS_SENTINEL.to_string()
    } else {
        missing.join(", ")
    }
}

fn fallback_summary(total: f64) -> String {
    format!("Resume matches job at {total:.2}%. Review missing skills to improve alignment.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::test_support::{CannedService, FailingService};
    use crate::scoring::{score, FitRating};

    fn features(skills: &[&str]) -> FeatureRecord {
        FeatureRecord {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..FeatureRecord::default()
        }
    }

    fn breakdown() -> ScoreBreakdown {
        score(&features(&["python"]), &features(&["python", "sql"]), "")
    }

    #[test]
    fn test_skill_gap_sorted_and_comma_joined() {
        let gap = derive_skill_gap(&features(&["python"]), &features(&["SQL", "Airflow", "python"]));
        assert_eq!(gap, "Airflow, SQL");
    }

    #[test]
    fn test_skill_gap_is_case_insensitive() {
        let gap = derive_skill_gap(&features(&["PYTHON", "sql"]), &features(&["Python", "SQL"]));
        assert_eq!(gap, NO_GAPS_SENTINEL);
    }

    #[test]
    fn test_skill_gap_deduplicates() {
        let gap = derive_skill_gap(&features(&[]), &features(&["Kafka", "kafka", "Kafka"]));
        assert_eq!(gap, "Kafka");
    }

    #[test]
    fn test_skill_gap_empty_job_skills_yields_sentinel() {
        let gap = derive_skill_gap(&features(&["python"]), &features(&[]));
        assert_eq!(gap, NO_GAPS_SENTINEL);
    }

    #[test]
    fn test_fallback_summary_embeds_total_with_two_decimals() {
        assert_eq!(
            fallback_summary(50.67),
            "Resume matches job at 50.67%. Review missing skills to improve alignment."
        );
        assert_eq!(
            fallback_summary(100.0),
            "Resume matches job at 100.00%. Review missing skills to improve alignment."
        );
    }

    #[tokio::test]
    async fn test_disabled_service_uses_fallback_summary() {
        let synthesizer = NarrativeSynthesizer::new(None);
        let breakdown = breakdown();
        let report = synthesizer
            .synthesize(&features(&["python"]), &features(&["python", "sql"]), &breakdown)
            .await;
        assert_eq!(report.summary, fallback_summary(breakdown.total));
        assert_eq!(report.skill_gap, "sql");
    }

    #[tokio::test]
    async fn test_failed_service_uses_fallback_summary() {
        let synthesizer = NarrativeSynthesizer::new(Some(std::sync::Arc::new(FailingService)));
        let breakdown = breakdown();
        let report = synthesizer
            .synthesize(&features(&["python"]), &features(&["python", "sql"]), &breakdown)
            .await;
        assert_eq!(report.summary, fallback_summary(breakdown.total));
    }

    #[tokio::test]
    async fn test_successful_service_text_is_used_verbatim() {
        let narrative = "### Strengths\n- Python depth\n".to_string();
        let synthesizer =
            NarrativeSynthesizer::new(Some(std::sync::Arc::new(CannedService(narrative.clone()))));
        let report = synthesizer
            .synthesize(&features(&["python"]), &features(&["python"]), &breakdown())
            .await;
        assert_eq!(report.summary, narrative.trim());
        assert_eq!(report.skill_gap, NO_GAPS_SENTINEL);
    }

    #[tokio::test]
    async fn test_skill_gap_computed_even_when_service_fails() {
        let synthesizer = NarrativeSynthesizer::new(Some(std::sync::Arc::new(FailingService)));
        let report = synthesizer
            .synthesize(&features(&[]), &features(&["Rust", "Go"]), &breakdown())
            .await;
        assert_eq!(report.skill_gap, "Go, Rust");
    }

    #[test]
    fn test_breakdown_fixture_is_poor_fit() {
        // Guard: the fixture used above should sit in the Poor band so the
        // fallback string is exercised with a realistic low total.
        assert_eq!(breakdown().fit_rating, FitRating::Poor);
    }
}
