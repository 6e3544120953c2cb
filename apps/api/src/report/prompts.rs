// Prompt constants for narrative report synthesis.

/// System prompt for the HR-style evaluation report.
pub const NARRATIVE_SYSTEM: &str = "You are an expert HR recruiter evaluating a candidate \
    against a specific role. \
    Return ONLY clean Markdown. No JSON. No inline labels.";

/// Narrative report prompt template.
/// Replace: {fit_rating}, {skill_match}, {keyword_match}, {experience_match},
///          {structure_score}, {resume_skills}, {job_skills}
pub const NARRATIVE_PROMPT_TEMPLATE: &str = r#"Generate a clean, well-formatted Markdown report.
Each section MUST appear on its own with proper line breaks.

### Strengths
List 2-4 strengths based on resume skills and the job match.

### Weaknesses
List 2-4 weaknesses based on missing skills.

### Fit Rating
{fit_rating} (summarize why)

### ATS Score Breakdown
- Skill Match: {skill_match}%
- Keyword Match: {keyword_match}%
- Experience Match: {experience_match}%
- Structure Score: {structure_score}%

### Improvement Suggestions
List exactly 3 numbered, actionable steps.

Resume Skills: {resume_skills}
Job Skills: {job_skills}"#;
