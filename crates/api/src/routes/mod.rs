pub mod contributions;
pub mod districts;
pub mod health;
pub mod review;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /districts                                   catalog (?state=)
///
/// /contributions                               open session (POST)
/// /contributions/{id}                          snapshot, tear down
/// /contributions/{id}/state                    select state (PUT)
/// /contributions/{id}/district                 select district (PUT)
/// /contributions/{id}/image                    upload (PUT multipart), change (DELETE)
/// /contributions/{id}/location                 browser GPS reading (PUT)
/// /contributions/{id}/description              description text (PUT)
/// /contributions/{id}/contributor              name and contact (PUT)
/// /contributions/{id}/advance                  next step (POST)
/// /contributions/{id}/back                     previous step (POST)
/// /contributions/{id}/submit                   submit transaction (POST)
/// /contributions/{id}/reset                    start over (POST)
///
/// /review/submissions                          filtered list (?status=&state=&search=)
/// /review/submissions/{id}                     detail
/// /review/submissions/{id}/approve             approve (POST)
/// /review/submissions/{id}/reject              reject (POST)
/// /review/coverage                             coverage rows
/// /review/orphans                              orphaned blobs
/// /review/orphans/reconcile                    remove orphaned blobs (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/districts", districts::router())
        .nest("/contributions", contributions::router())
        .nest("/review", review::router())
}
