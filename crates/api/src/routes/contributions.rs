//! Route definitions for contribution sessions.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;

use ivd_core::image_file::MAX_IMAGE_BYTES;

use crate::handlers::contributions;
use crate::state::AppState;

/// Headroom above the image cap for multipart framing.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// ```text
/// POST   /                          open_session
/// GET    /{id}                      get_session
/// DELETE /{id}                      close_session
/// PUT    /{id}/state                select_state
/// PUT    /{id}/district             select_district
/// PUT    /{id}/image                upload_image (multipart, field `image`)
/// DELETE /{id}/image                clear_image
/// PUT    /{id}/location             report_location
/// PUT    /{id}/description          set_description
/// PUT    /{id}/contributor          set_contributor
/// POST   /{id}/advance              advance
/// POST   /{id}/back                 back
/// POST   /{id}/submit               submit
/// POST   /{id}/reset                reset
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(contributions::open_session))
        .route(
            "/{id}",
            get(contributions::get_session).delete(contributions::close_session),
        )
        .route("/{id}/state", put(contributions::select_state))
        .route("/{id}/district", put(contributions::select_district))
        .route(
            "/{id}/image",
            put(contributions::upload_image)
                .delete(contributions::clear_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/{id}/location", put(contributions::report_location))
        .route("/{id}/description", put(contributions::set_description))
        .route("/{id}/contributor", put(contributions::set_contributor))
        .route("/{id}/advance", post(contributions::advance))
        .route("/{id}/back", post(contributions::back))
        .route("/{id}/submit", post(contributions::submit))
        .route("/{id}/reset", post(contributions::reset))
}
