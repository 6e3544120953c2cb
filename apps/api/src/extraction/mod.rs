//! Hybrid feature extraction — model-assisted with a deterministic floor.
//!
//! The deterministic keyword path always runs; the structured-extraction call
//! is best-effort and any failure there is absorbed locally, never surfaced
//! to the pipeline. The merge policy below decides, field by field, whether
//! the model output or the deterministic fallback wins.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm_client::{extract_json_object, CompletionService};

pub mod keywords;
pub mod prompts;

pub use keywords::{KeywordCount, KeywordExtractor, MAX_KEYWORDS};

/// Extracted features for one document (résumé or job description).
///
/// `skills` preserves insertion order for display but is compared
/// case-insensitively by the scoring engine. `years_experience` of 0 means
/// "unknown / entry level"; it is never negative by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub skills: Vec<String>,
    pub keywords: Vec<KeywordCount>,
    pub years_experience: u32,
    pub summary: Option<String>,
}

/// Which side of the match a text belongs to. Drives prompt selection and the
/// summary fallback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Resume,
    JobDescription,
}

/// Length of the truncated-text summary used when the model provides none
/// for a job description.
const SUMMARY_FALLBACK_CHARS: usize = 400;

/// Best-effort structured output of the external model. Every field is
/// optional; a failed call is simply the default value.
#[derive(Debug, Default)]
struct ModelExtraction {
    skills: Vec<String>,
    years_experience: Option<u32>,
    summary: Option<String>,
}

/// Hybrid extractor: deterministic keywords plus optional model assistance.
pub struct FeatureExtractor {
    llm: Option<Arc<dyn CompletionService>>,
    keywords: KeywordExtractor,
}

impl FeatureExtractor {
    pub fn new(llm: Option<Arc<dyn CompletionService>>) -> Self {
        Self {
            llm,
            keywords: KeywordExtractor::new(),
        }
    }

    pub async fn extract_resume(&self, text: &str) -> FeatureRecord {
        self.extract(text, DocumentKind::Resume).await
    }

    pub async fn extract_job(&self, text: &str) -> FeatureRecord {
        self.extract(text, DocumentKind::JobDescription).await
    }

    async fn extract(&self, text: &str, kind: DocumentKind) -> FeatureRecord {
        // Deterministic path runs unconditionally so model availability can
        // never change what the fallback would have been.
        let keywords = self.keywords.extract(text, MAX_KEYWORDS);
        let model = self.call_model(text, kind).await;

        let skills = if model.skills.is_empty() {
            keywords.iter().map(|k| k.token.clone()).collect()
        } else {
            dedup_case_insensitive(model.skills)
        };

        let years_experience = model
            .years_experience
            .filter(|&years| years > 0)
            .unwrap_or_else(|| estimate_years(text));

        let summary = model.summary.or_else(|| match kind {
            DocumentKind::Resume => None,
            DocumentKind::JobDescription => {
                let head: String = text.chars().take(SUMMARY_FALLBACK_CHARS).collect();
                Some(head).filter(|s| !s.trim().is_empty())
            }
        });

        debug!(
            ?kind,
            skills = skills.len(),
            keywords = keywords.len(),
            years_experience,
            "feature extraction complete"
        );

        FeatureRecord {
            skills,
            keywords,
            years_experience,
            summary,
        }
    }

    /// Invokes the structured-extraction service. Every failure mode — the
    /// service being disabled, the call erroring, or the reply not containing
    /// a JSON object — collapses to an empty `ModelExtraction`.
    async fn call_model(&self, text: &str, kind: DocumentKind) -> ModelExtraction {
        let Some(llm) = &self.llm else {
            return ModelExtraction::default();
        };

        let prompt = match kind {
            DocumentKind::Resume => {
                prompts::RESUME_EXTRACT_PROMPT_TEMPLATE.replace("{resume_text}", text)
            }
            DocumentKind::JobDescription => {
                prompts::JD_EXTRACT_PROMPT_TEMPLATE.replace("{jd_text}", text)
            }
        };

        let raw = match llm.complete(&prompt, prompts::JSON_ONLY_SYSTEM).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(?kind, "structured extraction unavailable, using deterministic fallback: {e}");
                return ModelExtraction::default();
            }
        };

        match extract_json_object(&raw) {
            Some(value) => model_extraction_from_value(&value),
            None => {
                warn!(?kind, "structured extraction returned no JSON object, using deterministic fallback");
                ModelExtraction::default()
            }
        }
    }
}

fn model_extraction_from_value(value: &Value) -> ModelExtraction {
    let skills = value
        .get("skills")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let years_experience = value.get("years_experience").and_then(years_from_value);

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    ModelExtraction {
        skills,
        years_experience,
        summary,
    }
}

/// Accepts years as a JSON number or a numeric string — models return both.
fn years_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Keeps the first occurrence of each skill under case-insensitive identity,
/// preserving the original casing and order for display.
fn dedup_case_insensitive(skills: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .into_iter()
        .filter(|skill| seen.insert(skill.to_lowercase()))
        .collect()
}

fn years_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,2})\s*\+?\s*(?:years?|yrs?)").expect("valid regex"))
}

fn standalone_number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{1,2})\b").expect("valid regex"))
}

/// Heuristic years-of-experience estimate used when the model provides none.
///
/// First preference: a number directly qualified by "years"/"yrs" (optionally
/// with a "+"). Failing that, the largest standalone integer in (0, 50) found
/// anywhere in the text. This second scan is knowingly crude — it can pick up
/// unrelated numbers — and defaults to 0 when nothing matches.
pub(crate) fn estimate_years(text: &str) -> u32 {
    let lower = text.to_lowercase();

    if let Some(captures) = years_pattern().captures(&lower) {
        if let Ok(years) = captures[1].parse() {
            return years;
        }
    }

    standalone_number_pattern()
        .captures_iter(&lower)
        .filter_map(|captures| captures[1].parse::<u32>().ok())
        .filter(|&n| n > 0 && n < 50)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::test_support::{CannedService, FailingService};

    const RESUME: &str =
        "Senior data engineer. Skills: Python, SQL, Airflow. 6 years building ETL pipelines.";

    #[tokio::test]
    async fn test_failed_service_falls_back_to_keyword_skills_exactly() {
        let extractor = FeatureExtractor::new(Some(Arc::new(FailingService)));
        let record = extractor.extract_resume(RESUME).await;

        let expected: Vec<String> = KeywordExtractor::new()
            .extract(RESUME, MAX_KEYWORDS)
            .into_iter()
            .map(|k| k.token)
            .collect();
        assert_eq!(record.skills, expected);
        assert!(!record.skills.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_service_matches_failed_service() {
        let disabled = FeatureExtractor::new(None);
        let failing = FeatureExtractor::new(Some(Arc::new(FailingService)));
        assert_eq!(
            disabled.extract_resume(RESUME).await,
            failing.extract_resume(RESUME).await
        );
    }

    #[tokio::test]
    async fn test_model_skills_win_over_keywords() {
        let canned = CannedService(
            r#"{"skills": ["Python", "SQL", "Airflow"], "years_experience": 4}"#.to_string(),
        );
        let extractor = FeatureExtractor::new(Some(Arc::new(canned)));
        let record = extractor.extract_resume(RESUME).await;

        assert_eq!(record.skills, vec!["Python", "SQL", "Airflow"]);
        assert_eq!(record.years_experience, 4);
        // Deterministic keywords are computed regardless of the model path.
        assert!(!record.keywords.is_empty());
    }

    #[tokio::test]
    async fn test_model_skills_are_deduped_case_insensitively() {
        let canned =
            CannedService(r#"{"skills": ["Python", "python", "SQL"], "years_experience": 2}"#.to_string());
        let extractor = FeatureExtractor::new(Some(Arc::new(canned)));
        let record = extractor.extract_resume(RESUME).await;
        assert_eq!(record.skills, vec!["Python", "SQL"]);
    }

    #[tokio::test]
    async fn test_non_json_reply_falls_back() {
        let canned = CannedService("I'm sorry, I cannot help with that.".to_string());
        let extractor = FeatureExtractor::new(Some(Arc::new(canned)));
        let record = extractor.extract_resume(RESUME).await;
        assert_eq!(record.years_experience, 6); // regex heuristic on "6 years"
        assert!(!record.skills.is_empty());
    }

    #[tokio::test]
    async fn test_model_zero_years_defers_to_heuristic() {
        let canned = CannedService(r#"{"skills": ["Python"], "years_experience": 0}"#.to_string());
        let extractor = FeatureExtractor::new(Some(Arc::new(canned)));
        let record = extractor.extract_resume(RESUME).await;
        assert_eq!(record.years_experience, 6);
    }

    #[tokio::test]
    async fn test_resume_summary_is_omitted_without_model() {
        let extractor = FeatureExtractor::new(None);
        let record = extractor.extract_resume(RESUME).await;
        assert_eq!(record.summary, None);
    }

    #[tokio::test]
    async fn test_jd_summary_falls_back_to_text_head() {
        let extractor = FeatureExtractor::new(None);
        let long_text: String = "data engineering role ".repeat(40);
        let record = extractor.extract_job(&long_text).await;

        let summary = record.summary.unwrap();
        assert_eq!(summary.chars().count(), SUMMARY_FALLBACK_CHARS);
        assert!(long_text.starts_with(&summary));
    }

    #[tokio::test]
    async fn test_jd_model_summary_wins() {
        let canned = CannedService(
            r#"{"skills": ["SQL"], "years_experience": 3, "summary": "Builds data platforms."}"#
                .to_string(),
        );
        let extractor = FeatureExtractor::new(Some(Arc::new(canned)));
        let record = extractor.extract_job("We need SQL experts.").await;
        assert_eq!(record.summary.as_deref(), Some("Builds data platforms."));
        assert_eq!(record.years_experience, 3);
    }

    #[tokio::test]
    async fn test_empty_input_yields_empty_record() {
        let extractor = FeatureExtractor::new(None);
        let record = extractor.extract_resume("").await;
        assert!(record.skills.is_empty());
        assert!(record.keywords.is_empty());
        assert_eq!(record.years_experience, 0);
        assert_eq!(record.summary, None);
    }

    #[test]
    fn test_estimate_years_qualified_number() {
        assert_eq!(estimate_years("over 3 years of Python"), 3);
        assert_eq!(estimate_years("5+ yrs in data"), 5);
        assert_eq!(estimate_years("1 year internship"), 1);
    }

    #[test]
    fn test_estimate_years_falls_back_to_max_standalone_integer() {
        // No "N years" phrase; picks the largest small integer in range.
        assert_eq!(estimate_years("led a team of 4 across 12 services"), 12);
    }

    #[test]
    fn test_estimate_years_ignores_out_of_range_numbers() {
        // 2021 is not a 1-2 digit token; 99 is out of the (0, 50) range.
        assert_eq!(estimate_years("joined in 2021, badge 99x"), 0);
    }

    #[test]
    fn test_estimate_years_defaults_to_zero() {
        assert_eq!(estimate_years("no numbers anywhere"), 0);
    }

    #[test]
    fn test_years_from_value_accepts_numeric_string() {
        assert_eq!(years_from_value(&serde_json::json!("7")), Some(7));
        assert_eq!(years_from_value(&serde_json::json!(7)), Some(7));
        assert_eq!(years_from_value(&serde_json::json!(null)), None);
    }
}
