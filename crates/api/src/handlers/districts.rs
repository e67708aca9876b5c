//! Handler for the district catalog.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use ivd_core::district::District;
use ivd_flows::catalog::load_catalog;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub state: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CatalogView {
    /// Distinct states, in catalog order.
    pub states: Vec<String>,
    /// Districts of the requested state; empty when no state was given.
    pub districts: Vec<District>,
}

/// GET /api/v1/districts
///
/// An unreachable backend yields an empty catalog rather than an error.
pub async fn get_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> AppResult<Json<DataResponse<CatalogView>>> {
    let catalog = load_catalog(state.store.as_ref()).await;
    let selected = query.state.as_deref().filter(|s| !s.trim().is_empty());

    Ok(Json(DataResponse {
        data: CatalogView {
            states: catalog.states_in_order().to_vec(),
            districts: catalog
                .districts_for_state(selected)
                .into_iter()
                .cloned()
                .collect(),
        },
    }))
}
