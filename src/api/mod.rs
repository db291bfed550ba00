mod error;
mod identity;
mod links;
pub mod wire;

use axum::{
    routing::{get, patch, post},
    Router,
};
use curricula_core::Database;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::audit::AuditWriter;

pub use error::ApiError;
pub use identity::{CurrentUser, USER_ID_HEADER, USER_ROLES_HEADER};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub audit: AuditWriter,
}

pub fn create_router(db: Database) -> Router {
    let state = AppState {
        audit: AuditWriter::new(db.clone()),
        db,
    };

    Router::new()
        .route(
            "/programs/{program_id}/templates",
            get(links::list_templates).post(links::attach_template),
        )
        .route(
            "/programs/{program_id}/templates/reorder",
            post(links::reorder_templates),
        )
        .route(
            "/programs/{program_id}/templates/{template_id}",
            patch(links::update_template).delete(links::detach_template),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
