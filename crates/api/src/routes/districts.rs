use axum::routing::get;
use axum::Router;

use crate::handlers::districts;
use crate::state::AppState;

/// ```text
/// GET    /                          get_catalog (?state=)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(districts::get_catalog))
}
