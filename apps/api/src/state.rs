use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::generation::pipeline::ResumePipeline;
use crate::keywords::extractor::KeywordExtractor;
use crate::profiles::repository::PgProfileStore;
use crate::profiles::ProfileLookup;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    #[allow(dead_code)]
    pub db: PgPool,
    #[allow(dead_code)]
    pub config: Config,
    pub pipeline: ResumePipeline,
    pub extractor: KeywordExtractor,
    /// Read seam used by generation and profile reads. `PgProfileStore` in production.
    pub profiles: Arc<dyn ProfileLookup>,
    /// Writes and email lookups.
    pub profile_store: PgProfileStore,
}
