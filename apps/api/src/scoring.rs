//! Scoring engine — deterministic, pure, and auditable.
//!
//! Same inputs produce a bit-identical `ScoreBreakdown`. The four sub-scores,
//! the fixed weights, the fit-rating bands, and 2-decimal rounding at
//! construction are all part of the contract; reference outputs depend on
//! reproducing them exactly.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::extraction::FeatureRecord;

pub const WEIGHT_SKILL: f64 = 0.40;
pub const WEIGHT_KEYWORD: f64 = 0.30;
pub const WEIGHT_EXPERIENCE: f64 = 0.20;
pub const WEIGHT_STRUCTURE: f64 = 0.10;

const STRONG_FIT_THRESHOLD: f64 = 80.0;
const MEDIUM_FIT_THRESHOLD: f64 = 55.0;

/// Section names whose presence approximates structural completeness.
const STRUCTURE_SECTIONS: [&str; 5] = ["summary", "skills", "experience", "projects", "education"];

/// Coarse three-band classification of the total score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitRating {
    #[serde(rename = "Strong Fit")]
    Strong,
    #[serde(rename = "Medium Fit")]
    Medium,
    #[serde(rename = "Poor Fit")]
    Poor,
}

impl fmt::Display for FitRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitRating::Strong => write!(f, "Strong Fit"),
            FitRating::Medium => write!(f, "Medium Fit"),
            FitRating::Poor => write!(f, "Poor Fit"),
        }
    }
}

/// Composite match scores, each in [0, 100] and rounded to 2 decimal places
/// at construction. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skill_match: f64,
    pub keyword_match: f64,
    pub experience_match: f64,
    pub structure_score: f64,
    pub total: f64,
    pub fit_rating: FitRating,
}

/// Scores a résumé against a job description.
///
/// Empty job inputs are defined, not erroneous: no job skills or keywords
/// scores that component 0, and a required-years of 0 means "no requirement"
/// and scores 100.
pub fn score(resume: &FeatureRecord, job: &FeatureRecord, resume_text: &str) -> ScoreBreakdown {
    let resume_text_lower = resume_text.to_lowercase();

    let resume_skills: HashSet<String> =
        resume.skills.iter().map(|s| s.to_lowercase()).collect();
    let job_skills: HashSet<String> = job.skills.iter().map(|s| s.to_lowercase()).collect();

    let skill_match = if job_skills.is_empty() {
        0.0
    } else {
        let matched = job_skills.intersection(&resume_skills).count();
        matched as f64 / job_skills.len() as f64 * 100.0
    };

    let keyword_match = if job.keywords.is_empty() {
        0.0
    } else {
        let found = job
            .keywords
            .iter()
            .filter(|k| resume_text_lower.contains(&k.token.to_lowercase()))
            .count();
        found as f64 / job.keywords.len() as f64 * 100.0
    };

    let experience_match = if job.years_experience == 0 {
        100.0
    } else {
        let ratio = f64::from(resume.years_experience) / f64::from(job.years_experience) * 100.0;
        ratio.min(100.0)
    };

    let present_sections = STRUCTURE_SECTIONS
        .iter()
        .filter(|section| resume_text_lower.contains(**section))
        .count();
    let structure_score = present_sections as f64 / STRUCTURE_SECTIONS.len() as f64 * 100.0;

    let skill_match = round2(skill_match);
    let keyword_match = round2(keyword_match);
    let experience_match = round2(experience_match);
    let structure_score = round2(structure_score);

    // Total composes the already-rounded sub-scores; this matters for
    // reproducing reference outputs to the cent.
    let total = round2(compose_total(
        skill_match,
        keyword_match,
        experience_match,
        structure_score,
    ));

    ScoreBreakdown {
        skill_match,
        keyword_match,
        experience_match,
        structure_score,
        total,
        fit_rating: rate(total),
    }
}

/// The fixed affine combination of the four sub-scores.
pub(crate) fn compose_total(
    skill_match: f64,
    keyword_match: f64,
    experience_match: f64,
    structure_score: f64,
) -> f64 {
    skill_match * WEIGHT_SKILL
        + keyword_match * WEIGHT_KEYWORD
        + experience_match * WEIGHT_EXPERIENCE
        + structure_score * WEIGHT_STRUCTURE
}

/// Bands are inclusive on their lower bound: [80, 100] Strong, [55, 80)
/// Medium, [0, 55) Poor.
pub(crate) fn rate(total: f64) -> FitRating {
    if total >= STRONG_FIT_THRESHOLD {
        FitRating::Strong
    } else if total >= MEDIUM_FIT_THRESHOLD {
        FitRating::Medium
    } else {
        FitRating::Poor
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
