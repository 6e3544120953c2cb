use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::MatchPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The matching pipeline; holds the (optional) completion service.
    pub pipeline: Arc<MatchPipeline>,
    pub config: Config,
}
