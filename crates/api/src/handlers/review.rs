//! Handlers for the review console.
//!
//! All requests share one [`ReviewConsole`](ivd_flows::ReviewConsole), so
//! decisions are serialised and every list reflects the latest reload.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ivd_core::review::{FilterCriteria, StateFilter, StatusFilter, SubmissionTally};
use ivd_core::submission::{ReviewDecision, Submission, SubmissionStatus};
use ivd_flows::console::CoverageRow;
use ivd_flows::orphans::{OrphanedBlob, ReconcileReport};
use ivd_flows::ReviewError;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
Request and response bodies
-------------------------------------------------------------------------- */

/// Filter query for the submission list. Missing values mean "all".
#[derive(Debug, Default, Deserialize)]
pub struct ReviewQuery {
    pub status: Option<String>,
    pub state: Option<String>,
    pub search: Option<String>,
}

impl ReviewQuery {
    fn criteria(&self) -> AppResult<FilterCriteria> {
        let status = StatusFilter::parse(self.status.as_deref().unwrap_or_default())?;
        let state = StateFilter::parse(self.state.as_deref().unwrap_or_default());
        Ok(FilterCriteria::new(
            status,
            state,
            self.search.clone().unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionList {
    pub submissions: Vec<Submission>,
    /// Counts over every submission, not just the visible ones.
    pub tally: SubmissionTally,
    /// Options for the state dropdown.
    pub states: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewedSubmission {
    pub id: Uuid,
    pub status: SubmissionStatus,
    /// The row as reloaded after the decision; absent if the reload failed.
    pub submission: Option<Submission>,
}

#[derive(Debug, Serialize)]
pub struct OrphanList {
    pub orphans: Vec<OrphanedBlob>,
}

/* --------------------------------------------------------------------------
Submissions
-------------------------------------------------------------------------- */

/// GET /api/v1/review/submissions
pub async fn list_submissions(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> AppResult<Json<DataResponse<SubmissionList>>> {
    let criteria = query.criteria()?;

    let mut console = state.console.lock().await;
    console.reload().await;
    console.set_criteria(criteria);

    Ok(Json(DataResponse {
        data: SubmissionList {
            submissions: console.visible().into_iter().cloned().collect(),
            tally: console.tally(),
            states: console.states(),
        },
    }))
}

/// GET /api/v1/review/submissions/{id}
pub async fn get_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<Submission>>> {
    let mut console = state.console.lock().await;
    if console.select(id).is_none() {
        console.reload().await;
    }
    let submission = console.select(id).cloned().ok_or(ReviewError::NotFound(id))?;
    Ok(Json(DataResponse { data: submission }))
}

/// POST /api/v1/review/submissions/{id}/approve
pub async fn approve_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<ReviewedSubmission>>> {
    decide(&state, id, ReviewDecision::Approve, body).await
}

/// POST /api/v1/review/submissions/{id}/reject
pub async fn reject_submission(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<ReviewedSubmission>>> {
    decide(&state, id, ReviewDecision::Reject, body).await
}

async fn decide(
    state: &AppState,
    id: Uuid,
    decision: ReviewDecision,
    body: Option<Json<ReviewRequest>>,
) -> AppResult<Json<DataResponse<ReviewedSubmission>>> {
    let notes = body.and_then(|Json(request)| request.notes);

    let mut console = state.console.lock().await;
    // Decisions may arrive without a prior list call.
    if console.select(id).is_none() {
        console.reload().await;
    }
    console.review(id, decision, notes).await?;

    Ok(Json(DataResponse {
        data: ReviewedSubmission {
            id,
            status: decision.target_status(),
            submission: console.select(id).cloned(),
        },
    }))
}

/* --------------------------------------------------------------------------
Coverage and orphans
-------------------------------------------------------------------------- */

/// GET /api/v1/review/coverage
pub async fn list_coverage(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<CoverageRow>>>> {
    let mut console = state.console.lock().await;
    console.reload().await;
    Ok(Json(DataResponse {
        data: console.coverage_rows(),
    }))
}

/// GET /api/v1/review/orphans
pub async fn list_orphans(State(state): State<AppState>) -> Json<DataResponse<OrphanList>> {
    Json(DataResponse {
        data: OrphanList {
            orphans: state.orphans.entries(),
        },
    })
}

/// POST /api/v1/review/orphans/reconcile
///
/// Delete every recorded orphan from storage. Paths that could not be
/// removed stay in the ledger for the next attempt.
pub async fn reconcile_orphans(
    State(state): State<AppState>,
) -> Json<DataResponse<ReconcileReport>> {
    let report = state.orphans.reconcile(state.store.as_ref()).await;
    tracing::info!(
        removed = report.removed.len(),
        failed = report.failed.len(),
        "Orphaned images reconciled"
    );
    Json(DataResponse { data: report })
}
