//! Pipeline orchestration — one résumé × one job description per run.
//!
//! Stages run strictly sequentially: decode → résumé features → JD features
//! → score → report. Each stage writes exactly one key into the run's
//! `RunContext` and never re-reads a key it did not just produce, so data
//! flows strictly forward. An unsupported document format is the only fatal
//! error; every other stage degrades to its deterministic fallback.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::decode::{decode, DecodeError};
use crate::extraction::{FeatureExtractor, FeatureRecord};
use crate::llm_client::CompletionService;
use crate::report::{NarrativeSynthesizer, Report};
use crate::scoring::{self, ScoreBreakdown};

pub mod handlers;

pub const KEY_RESUME_TEXT: &str = "resume_text";
pub const KEY_RESUME_FEATURES: &str = "resume_features";
pub const KEY_JD_FEATURES: &str = "jd_features";
pub const KEY_SCORE_BREAKDOWN: &str = "score_breakdown";
pub const KEY_REPORT: &str = "report";

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Unsupported resume format: only PDF and DOCX are accepted")]
    UnsupportedFormat,

    #[error("Pipeline stage left no `{0}` in the run context")]
    MissingStage(&'static str),

    #[error("Batch worker failed: {0}")]
    Worker(String),
}

impl From<DecodeError> for PipelineError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::Unsupported => PipelineError::UnsupportedFormat,
        }
    }
}

/// A value stored in the run context. Stages communicate only through these.
#[derive(Debug, Clone)]
pub enum ContextValue {
    Text(String),
    Features(FeatureRecord),
    Breakdown(ScoreBreakdown),
    Report(Report),
}

/// Per-run key/value store handed from stage to stage.
///
/// Owned exclusively by a single run; never shared across concurrent runs,
/// so no locking. Keys are write-once by convention — overwriting one is a
/// caller bug the store does not enforce.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    data: HashMap<&'static str, ContextValue>,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            data: HashMap::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn set(&mut self, key: &'static str, value: ContextValue) {
        self.data.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.data.get(key)
    }

    fn features(&self, key: &'static str) -> Result<&FeatureRecord, PipelineError> {
        match self.data.get(key) {
            Some(ContextValue::Features(record)) => Ok(record),
            _ => Err(PipelineError::MissingStage(key)),
        }
    }

    fn text(&self, key: &'static str) -> Result<&str, PipelineError> {
        match self.data.get(key) {
            Some(ContextValue::Text(text)) => Ok(text),
            _ => Err(PipelineError::MissingStage(key)),
        }
    }

    /// Consumes the completed context into the run's outcome. Fails with
    /// `MissingStage` if any stage skipped its write.
    fn into_outcome(mut self) -> Result<MatchOutcome, PipelineError> {
        let run_id = self.run_id;
        let resume_features = match self.data.remove(KEY_RESUME_FEATURES) {
            Some(ContextValue::Features(record)) => record,
            _ => return Err(PipelineError::MissingStage(KEY_RESUME_FEATURES)),
        };
        let jd_features = match self.data.remove(KEY_JD_FEATURES) {
            Some(ContextValue::Features(record)) => record,
            _ => return Err(PipelineError::MissingStage(KEY_JD_FEATURES)),
        };
        let breakdown = match self.data.remove(KEY_SCORE_BREAKDOWN) {
            Some(ContextValue::Breakdown(breakdown)) => breakdown,
            _ => return Err(PipelineError::MissingStage(KEY_SCORE_BREAKDOWN)),
        };
        let report = match self.data.remove(KEY_REPORT) {
            Some(ContextValue::Report(report)) => report,
            _ => return Err(PipelineError::MissingStage(KEY_REPORT)),
        };
        Ok(MatchOutcome {
            run_id,
            resume_features,
            jd_features,
            breakdown,
            report,
        })
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// The completed evaluation for one résumé against one job description.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub run_id: Uuid,
    pub resume_features: FeatureRecord,
    pub jd_features: FeatureRecord,
    pub breakdown: ScoreBreakdown,
    pub report: Report,
}

/// One result slot per submitted résumé, in submission order.
pub type RunResult = Result<MatchOutcome, PipelineError>;

/// The matching pipeline. Cheap to share; all state is per-run.
pub struct MatchPipeline {
    extractor: FeatureExtractor,
    synthesizer: NarrativeSynthesizer,
}

impl MatchPipeline {
    pub fn new(llm: Option<Arc<dyn CompletionService>>) -> Self {
        Self {
            extractor: FeatureExtractor::new(llm.clone()),
            synthesizer: NarrativeSynthesizer::new(llm),
        }
    }

    /// Evaluates one résumé document against a job description.
    ///
    /// The only error this can return is `UnsupportedFormat` (directly or via
    /// a stage-sequencing bug surfacing as `MissingStage`); extraction and
    /// narrative failures degrade inside their stages.
    pub async fn run(&self, source: &[u8], jd_text: &str) -> RunResult {
        let resume_text = decode(source)?;
        self.run_text(resume_text, jd_text).await
    }

    /// The sequential stage machine, entered once decoding has succeeded.
    pub(crate) async fn run_text(&self, resume_text: String, jd_text: &str) -> RunResult {
        let mut ctx = RunContext::new();
        let span = info_span!("pipeline_run", run_id = %ctx.run_id());

        async {
            ctx.set(KEY_RESUME_TEXT, ContextValue::Text(resume_text));

            let resume_features = self
                .extractor
                .extract_resume(ctx.text(KEY_RESUME_TEXT)?)
                .await;
            ctx.set(KEY_RESUME_FEATURES, ContextValue::Features(resume_features));

            let jd_features = self.extractor.extract_job(jd_text).await;
            ctx.set(KEY_JD_FEATURES, ContextValue::Features(jd_features));

            let breakdown = scoring::score(
                ctx.features(KEY_RESUME_FEATURES)?,
                ctx.features(KEY_JD_FEATURES)?,
                ctx.text(KEY_RESUME_TEXT)?,
            );
            ctx.set(KEY_SCORE_BREAKDOWN, ContextValue::Breakdown(breakdown.clone()));

            let report = self
                .synthesizer
                .synthesize(
                    ctx.features(KEY_RESUME_FEATURES)?,
                    ctx.features(KEY_JD_FEATURES)?,
                    &breakdown,
                )
                .await;
            ctx.set(KEY_REPORT, ContextValue::Report(report));

            info!(
                total = breakdown.total,
                fit = %breakdown.fit_rating,
                "run complete"
            );
            ctx.into_outcome()
        }
        .instrument(span)
        .await
    }

    /// Evaluates a batch of résumés against one job description.
    ///
    /// Runs fan out task-per-résumé over a worker pool bounded at available
    /// parallelism. Each run owns its context; nothing is shared. Results
    /// come back in submission order regardless of completion order, and a
    /// fatal error in one résumé is isolated to its slot — the batch never
    /// aborts wholesale.
    pub async fn process(self: Arc<Self>, sources: Vec<Vec<u8>>, jd_text: &str) -> Vec<RunResult> {
        let workers = std::thread::available_parallelism()
            .map(usize::from)
            .unwrap_or(4);
        let semaphore = Arc::new(Semaphore::new(workers));
        let jd_text: Arc<str> = Arc::from(jd_text);

        info!(batch = sources.len(), workers, "processing resume batch");

        let handles: Vec<_> = sources
            .into_iter()
            .map(|source| {
                let pipeline = Arc::clone(&self);
                let semaphore = Arc::clone(&semaphore);
                let jd_text = Arc::clone(&jd_text);
                tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| PipelineError::Worker(e.to_string()))?;
                    pipeline.run(&source, &jd_text).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(match handle.await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::Worker(e.to_string())),
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::docx_bytes;
    use crate::llm_client::test_support::{CannedService, FailingService};
    use crate::scoring::FitRating;

    fn pipeline(llm: Option<Arc<dyn CompletionService>>) -> Arc<MatchPipeline> {
        Arc::new(MatchPipeline::new(llm))
    }

    const JD: &str = "Required: 2 years python and sql experience for ETL work.";

    #[tokio::test]
    async fn test_plain_text_source_is_fatal() {
        let result = pipeline(None).run(b"plain text resume", JD).await;
        assert!(matches!(result, Err(PipelineError::UnsupportedFormat)));
    }

    #[tokio::test]
    async fn test_run_produces_complete_outcome() {
        let bytes = docx_bytes(&[
            "Summary",
            "Skills: python, sql",
            "Experience: 3 years of etl pipelines",
        ]);
        let outcome = pipeline(None).run(&bytes, JD).await.unwrap();

        assert!(!outcome.resume_features.skills.is_empty());
        assert!(!outcome.jd_features.keywords.is_empty());
        assert!(outcome.breakdown.total >= 0.0);
        assert!(!outcome.report.summary.is_empty());
    }

    #[tokio::test]
    async fn test_model_failures_degrade_not_abort() {
        let bytes = docx_bytes(&["Skills: python", "Experience: 2 years"]);
        let result = pipeline(Some(Arc::new(FailingService))).run(&bytes, JD).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_is_reproducible_without_model() {
        let bytes = docx_bytes(&["Skills: python and sql", "Experience: 4 years"]);
        let p = pipeline(None);
        let first = p.run(&bytes, JD).await.unwrap();
        let second = p.run(&bytes, JD).await.unwrap();

        assert_eq!(first.breakdown, second.breakdown);
        assert_eq!(first.resume_features, second.resume_features);
        assert_eq!(first.report.skill_gap, second.report.skill_gap);
    }

    #[tokio::test]
    async fn test_batch_preserves_input_order_and_isolates_failures() {
        let strong = docx_bytes(&[
            "Summary",
            "Skills: python, sql, etl",
            "Experience: 5 years of etl",
            "Projects and Education",
        ]);
        let weak = docx_bytes(&["Objective: gardening"]);
        let invalid = b"not a document".to_vec();

        let results = pipeline(None)
            .process(vec![strong, invalid, weak], JD)
            .await;

        assert_eq!(results.len(), 3);
        let first = results[0].as_ref().unwrap();
        assert!(matches!(
            results[1],
            Err(PipelineError::UnsupportedFormat)
        ));
        let third = results[2].as_ref().unwrap();

        // The strong résumé was submitted first and must stay first.
        assert!(first.breakdown.total > third.breakdown.total);
    }

    #[tokio::test]
    async fn test_batch_runs_are_isolated() {
        let a = docx_bytes(&["Skills: python only here"]);
        let b = docx_bytes(&["Skills: rust only here"]);
        let results = pipeline(None).process(vec![a, b], JD).await;

        let first = results[0].as_ref().unwrap();
        let second = results[1].as_ref().unwrap();
        assert_ne!(first.run_id, second.run_id);
        assert_ne!(first.resume_features.skills, second.resume_features.skills);
    }

    #[tokio::test]
    async fn test_canned_model_flows_through_to_report() {
        // A reply that is valid JSON for extraction; the narrative stage
        // receives the same body and uses it verbatim as markdown-ish text.
        let canned = CannedService(r#"{"skills": ["python", "sql"], "years_experience": 2}"#.to_string());
        let bytes = docx_bytes(&["Skills and experience: python, sql, 2 years"]);
        let outcome = pipeline(Some(Arc::new(canned))).run(&bytes, JD).await.unwrap();

        assert_eq!(outcome.resume_features.skills, vec!["python", "sql"]);
        assert_eq!(outcome.jd_features.skills, vec!["python", "sql"]);
        assert_eq!(outcome.breakdown.skill_match, 100.0);
    }

    #[tokio::test]
    async fn test_empty_jd_scores_poor_fit_not_error() {
        let bytes = docx_bytes(&["Skills: python"]);
        let outcome = pipeline(None).run(&bytes, "").await.unwrap();
        // Empty JD: no skills (0), no keywords (0), no years requirement (100),
        // structure from the résumé text only.
        assert_eq!(outcome.breakdown.skill_match, 0.0);
        assert_eq!(outcome.breakdown.keyword_match, 0.0);
        assert_eq!(outcome.breakdown.experience_match, 100.0);
        assert_eq!(outcome.breakdown.fit_rating, FitRating::Poor);
    }

    #[test]
    fn test_run_context_stores_and_returns_values() {
        let mut ctx = RunContext::new();
        ctx.set(KEY_RESUME_TEXT, ContextValue::Text("hello".to_string()));
        assert_eq!(ctx.text(KEY_RESUME_TEXT).unwrap(), "hello");
        assert!(ctx.get(KEY_REPORT).is_none());
        assert!(matches!(
            ctx.features(KEY_RESUME_FEATURES),
            Err(PipelineError::MissingStage(KEY_RESUME_FEATURES))
        ));
    }

    #[test]
    fn test_incomplete_context_cannot_become_outcome() {
        let ctx = RunContext::new();
        assert!(matches!(
            ctx.into_outcome(),
            Err(PipelineError::MissingStage(_))
        ));
    }
}
