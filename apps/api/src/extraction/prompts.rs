// Prompt constants for structured feature extraction.

pub use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// Résumé extraction prompt template. Replace `{resume_text}` before sending.
pub const RESUME_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract structured JSON from this resume.

Return a JSON object with this EXACT schema (no extra fields):
{
  "skills": ["Python", "SQL"],
  "years_experience": 2
}

Rules:
- skills: the candidate's primary technical and domain skills
- years_experience: integer estimate of total professional experience

Resume:
{resume_text}"#;

/// Job-description extraction prompt template. Replace `{jd_text}` before sending.
pub const JD_EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract structured JSON from this job description.

Return a JSON object with this EXACT schema (no extra fields):
{
  "skills": ["Python", "SQL"],
  "years_experience": 2,
  "summary": "One to two sentence description of the role."
}

Rules:
- skills: every skill or technology the role asks for
- years_experience: integer years of experience the role requires (0 if unstated)
- summary: short 1-2 sentence description

Job Description:
{jd_text}"#;
