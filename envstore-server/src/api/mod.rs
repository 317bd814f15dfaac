//! REST API under `/api/v1/`
//!
//! List endpoints accept `page`, `size`, repeatable `sort_by` and `order`, and
//! answer with a [`Paginated`] envelope. Single-resource endpoints answer with
//! [`Item`] or [`Ack`], and every failure uses the error envelope from
//! [`crate::error`].

pub mod builds;
pub mod channels;
pub mod envelope;
pub mod environments;
pub mod namespaces;
pub mod paging;
pub mod params;
pub mod projection;
pub mod responder;
pub mod sorting;
pub mod specification;

pub use envelope::{Ack, Item, Paginated, Status};
pub use paging::PageRequest;
pub use params::ListParams;
pub use projection::Projection;
pub use responder::Responder;
pub use sorting::{SortDirective, SortField, SortSpec};

use axum::{routing::get, routing::post, Router};

use crate::state::AppState;

/// `GET /api/v1/`
pub async fn api_status() -> Ack {
    Ack::ok()
}

/// All API routes, with state applied
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/", get(api_status))
        .route("/api/v1/namespace/", get(namespaces::list_namespaces))
        .route("/api/v1/environment/", get(environments::list_environments))
        .route(
            "/api/v1/environment/{namespace}/{name}/",
            get(environments::get_environment)
                .put(environments::update_environment_build)
                .delete(environments::delete_environment),
        )
        .route(
            "/api/v1/specification/",
            post(specification::post_specification),
        )
        .route("/api/v1/build/", get(builds::list_builds))
        .route(
            "/api/v1/build/{build_id}/",
            get(builds::get_build)
                .put(builds::rebuild)
                .delete(builds::delete_build),
        )
        .route("/api/v1/build/{build_id}/logs/", get(builds::get_build_logs))
        .route("/api/v1/channel/", get(channels::list_channels))
        .route("/api/v1/package/", get(channels::list_packages))
        .with_state(state)
}
