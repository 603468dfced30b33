use std::sync::Arc;

use sqlx::PgPool;

use crate::advice::oracle::Oracle;
use crate::advice::rules::RuleTable;
use crate::auth::JwtKeys;
use crate::templates::store::TemplateStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt: JwtKeys,
    /// Language-model capability. Default: `LlmOracle`; tests inject a stub.
    pub oracle: Arc<dyn Oracle>,
    /// Template Store backing the catalog and lookups. Default: `PgTemplateStore`.
    pub store: Arc<dyn TemplateStore>,
    pub rules: Arc<RuleTable>,
}
