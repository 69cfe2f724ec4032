use std::sync::Arc;

use crate::session::SessionRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Open editor sessions and their readiness jobs, keyed by CV id.
    pub sessions: Arc<SessionRegistry>,
}
