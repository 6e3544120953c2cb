//! Axum route handlers for the Match API.
//!
//! Thin adapters only: multipart plumbing in, pipeline entry points, JSON
//! out. No matching logic lives here.

use axum::extract::{Multipart, State};
use axum::Json;
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::pipeline::{MatchOutcome, PipelineError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    #[serde(flatten)]
    pub outcome: MatchOutcome,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchItem {
    Ok {
        #[serde(flatten)]
        outcome: MatchOutcome,
    },
    Error {
        code: &'static str,
        message: String,
    },
}

#[derive(Debug, Serialize)]
pub struct BatchMatchResponse {
    pub results: Vec<BatchItem>,
}

/// Parsed form of a match upload: résumé payloads plus the JD text.
struct MatchUpload {
    resumes: Vec<Bytes>,
    jd_text: String,
}

/// POST /api/v1/match
///
/// Multipart form with one `resume` file part and a `jd_text` part.
/// The unsupported-format condition surfaces as 422; everything else the
/// pipeline degrades internally.
pub async fn handle_match(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<MatchResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let [resume]: [Bytes; 1] = upload
        .resumes
        .try_into()
        .map_err(|_| AppError::Validation("expected exactly one `resume` part".to_string()))?;

    let outcome = state.pipeline.run(&resume, &upload.jd_text).await?;
    Ok(Json(MatchResponse { outcome }))
}

/// POST /api/v1/match/batch
///
/// Multipart form with repeated `resume` file parts and one `jd_text` part.
/// Per-résumé failures are isolated to their result slot; slots come back in
/// upload order.
pub async fn handle_match_batch(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<BatchMatchResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    if upload.resumes.is_empty() {
        return Err(AppError::Validation(
            "at least one `resume` part is required".to_string(),
        ));
    }

    info!(resumes = upload.resumes.len(), "batch match request");

    let sources: Vec<Vec<u8>> = upload.resumes.iter().map(|b| b.to_vec()).collect();
    let results = state
        .pipeline
        .clone()
        .process(sources, &upload.jd_text)
        .await;

    let results = results
        .into_iter()
        .map(|result| match result {
            Ok(outcome) => BatchItem::Ok { outcome },
            Err(e) => BatchItem::Error {
                code: match e {
                    PipelineError::UnsupportedFormat => "UNSUPPORTED_FORMAT",
                    _ => "PIPELINE_ERROR",
                },
                message: e.to_string(),
            },
        })
        .collect();

    Ok(Json(BatchMatchResponse { results }))
}

async fn read_upload(mut multipart: Multipart) -> Result<MatchUpload, AppError> {
    let mut resumes = Vec::new();
    let mut jd_text: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("resume") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read resume part: {e}")))?;
                resumes.push(bytes);
            }
            Some("jd_text") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read jd_text part: {e}")))?;
                jd_text = Some(text);
            }
            _ => {} // unknown parts are ignored
        }
    }

    let jd_text =
        jd_text.ok_or_else(|| AppError::Validation("`jd_text` part is required".to_string()))?;
    if jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }

    Ok(MatchUpload { resumes, jd_text })
}
