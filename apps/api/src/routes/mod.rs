pub mod health;

use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ingestion
        .route("/api/v1/cvs/:cv_id/ingest", post(handlers::handle_start_ingest))
        .route("/api/v1/cvs/:cv_id/readiness", get(handlers::handle_readiness))
        // Session lifecycle
        .route(
            "/api/v1/cvs/:cv_id/session",
            post(handlers::handle_open_session).delete(handlers::handle_close_session),
        )
        .route("/api/v1/cvs/:cv_id/document", get(handlers::handle_get_document))
        .route("/api/v1/cvs/:cv_id/save", post(handlers::handle_save))
        .route(
            "/api/v1/cvs/:cv_id/export.md",
            get(handlers::handle_export_markdown),
        )
        // Mutation API
        .route(
            "/api/v1/cvs/:cv_id/personal-info",
            patch(handlers::handle_update_personal_info),
        )
        .route("/api/v1/cvs/:cv_id/summary", put(handlers::handle_update_summary))
        .route("/api/v1/cvs/:cv_id/sections", post(handlers::handle_add_section))
        .route(
            "/api/v1/cvs/:cv_id/sections/move",
            post(handlers::handle_move_section),
        )
        .route(
            "/api/v1/cvs/:cv_id/sections/:si",
            patch(handlers::handle_update_section),
        )
        .route(
            "/api/v1/cvs/:cv_id/sections/:si/items",
            post(handlers::handle_add_section_item),
        )
        .route(
            "/api/v1/cvs/:cv_id/sections/:si/items/:ii",
            patch(handlers::handle_update_section_item).delete(handlers::handle_delete_section_item),
        )
        .route(
            "/api/v1/cvs/:cv_id/sections/:si/items/:ii/bullets",
            post(handlers::handle_add_bullet),
        )
        .route(
            "/api/v1/cvs/:cv_id/sections/:si/items/:ii/bullets/:k",
            put(handlers::handle_update_bullet).delete(handlers::handle_delete_bullet),
        )
        .with_state(state)
}
