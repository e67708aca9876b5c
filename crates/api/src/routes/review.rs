//! Route definitions for the review console.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::review;
use crate::state::AppState;

/// ```text
/// GET    /submissions                list_submissions (?status=&state=&search=)
/// GET    /submissions/{id}           get_submission
/// POST   /submissions/{id}/approve   approve_submission
/// POST   /submissions/{id}/reject    reject_submission
/// GET    /coverage                   list_coverage
/// GET    /orphans                    list_orphans
/// POST   /orphans/reconcile          reconcile_orphans
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submissions", get(review::list_submissions))
        .route("/submissions/{id}", get(review::get_submission))
        .route("/submissions/{id}/approve", post(review::approve_submission))
        .route("/submissions/{id}/reject", post(review::reject_submission))
        .route("/coverage", get(review::list_coverage))
        .route("/orphans", get(review::list_orphans))
        .route("/orphans/reconcile", post(review::reconcile_orphans))
}
