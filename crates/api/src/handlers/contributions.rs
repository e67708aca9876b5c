//! Handlers for contribution sessions.
//!
//! Every handler locks the addressed session for the whole request, so a
//! contributor's actions are applied strictly in order. Mutations answer
//! with the session snapshot the front end renders from.

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ivd_core::image_file::ImageFile;
use ivd_core::wizard::SubmissionReceipt;
use ivd_flows::location::ReportedLocation;
use ivd_flows::{ContributionSession, SessionSnapshot};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying the photograph.
pub const IMAGE_FIELD: &str = "image";

/* --------------------------------------------------------------------------
Request and response bodies
-------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
pub struct SelectStateRequest {
    /// `null` clears the selection.
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectDistrictRequest {
    pub district_id: Option<Uuid>,
}

/// A reading from the browser geolocation API, or its error message.
#[derive(Debug, Deserialize)]
pub struct LocationReport {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DescriptionRequest {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ContributorRequest {
    pub name: String,
    #[serde(default)]
    pub contact: String,
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct TransitionView {
    /// Whether the step changed.
    pub moved: bool,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct LocationView {
    /// Whether a position was attached; failures are not errors.
    pub captured: bool,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Serialize)]
pub struct SubmitView {
    pub receipt: SubmissionReceipt,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
}

type SnapshotResponse = Json<DataResponse<SessionSnapshot>>;

fn snapshot_of(session: &ContributionSession) -> SnapshotResponse {
    Json(DataResponse {
        data: session.snapshot(),
    })
}

/* --------------------------------------------------------------------------
Session lifecycle
-------------------------------------------------------------------------- */

/// POST /api/v1/contributions
///
/// Open a session with a freshly loaded district catalog.
pub async fn open_session(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let session = ContributionSession::open(Arc::clone(&state.store))
        .await
        .with_orphan_ledger(Arc::clone(&state.orphans));
    let snapshot = session.snapshot();
    let id = state.sessions.insert(session).await;

    tracing::info!(session_id = %id, states = snapshot.states.len(), "Contribution session opened");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SessionView { id, snapshot },
        }),
    ))
}

/// GET /api/v1/contributions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<SessionView>>> {
    let hosted = state.sessions.get(id).await?;
    let session = hosted.session.lock().await;
    Ok(Json(DataResponse {
        data: SessionView {
            id,
            snapshot: session.snapshot(),
        },
    }))
}

/// DELETE /api/v1/contributions/{id}
///
/// Abandon the session; its draft is discarded.
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    if !state.sessions.remove(id).await {
        return Err(ivd_core::error::CoreError::NotFound {
            entity: "ContributionSession",
            id,
        }
        .into());
    }
    tracing::info!(session_id = %id, "Contribution session closed");
    Ok(StatusCode::NO_CONTENT)
}

/* --------------------------------------------------------------------------
Step inputs
-------------------------------------------------------------------------- */

/// PUT /api/v1/contributions/{id}/state
pub async fn select_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SelectStateRequest>,
) -> AppResult<SnapshotResponse> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    session.select_state(input.state.as_deref())?;
    Ok(snapshot_of(&session))
}

/// PUT /api/v1/contributions/{id}/district
pub async fn select_district(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SelectDistrictRequest>,
) -> AppResult<SnapshotResponse> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    session.select_district(input.district_id)?;
    Ok(snapshot_of(&session))
}

/// PUT /api/v1/contributions/{id}/image
///
/// Multipart upload with the photograph in the `image` field. The format is
/// sniffed from the bytes; the declared content type is ignored.
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<SnapshotResponse> {
    let hosted = state.sessions.get(id).await?;

    let mut image = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or(IMAGE_FIELD).to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read image: {e}")))?;
        image = Some(ImageFile::new(file_name, bytes.to_vec())?);
        break;
    }
    let image = image.ok_or_else(|| {
        AppError::BadRequest(format!("Multipart field '{IMAGE_FIELD}' is required"))
    })?;

    let mut session = hosted.session.lock().await;
    session.choose_image(image)?;
    Ok(snapshot_of(&session))
}

/// DELETE /api/v1/contributions/{id}/image
pub async fn clear_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<SnapshotResponse> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    session.clear_image()?;
    Ok(snapshot_of(&session))
}

/// PUT /api/v1/contributions/{id}/location
///
/// A failed or missing reading is logged and ignored; only a wrong step is
/// an error.
pub async fn report_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(report): Json<LocationReport>,
) -> AppResult<Json<DataResponse<LocationView>>> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    let reading = ReportedLocation::from_report(report.latitude, report.longitude, report.error);
    let captured = session.capture_location(&reading).await?.is_some();
    Ok(Json(DataResponse {
        data: LocationView {
            captured,
            snapshot: session.snapshot(),
        },
    }))
}

/// PUT /api/v1/contributions/{id}/description
pub async fn set_description(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<DescriptionRequest>,
) -> AppResult<SnapshotResponse> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    session.set_description(&input.description)?;
    Ok(snapshot_of(&session))
}

/// PUT /api/v1/contributions/{id}/contributor
pub async fn set_contributor(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<ContributorRequest>,
) -> AppResult<SnapshotResponse> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    session.set_contributor(&input.name, &input.contact)?;
    Ok(snapshot_of(&session))
}

/* --------------------------------------------------------------------------
Navigation and submit
-------------------------------------------------------------------------- */

/// POST /api/v1/contributions/{id}/advance
///
/// A failing guard is not an error; `moved` is simply false.
pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<TransitionView>>> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    let moved = session.advance();
    Ok(Json(DataResponse {
        data: TransitionView {
            moved,
            snapshot: session.snapshot(),
        },
    }))
}

/// POST /api/v1/contributions/{id}/back
pub async fn back(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<TransitionView>>> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    let moved = session.back();
    Ok(Json(DataResponse {
        data: TransitionView {
            moved,
            snapshot: session.snapshot(),
        },
    }))
}

/// POST /api/v1/contributions/{id}/submit
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    let receipt = session.submit().await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmitView {
                receipt,
                snapshot: session.snapshot(),
            },
        }),
    ))
}

/// POST /api/v1/contributions/{id}/reset
pub async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<SnapshotResponse> {
    let hosted = state.sessions.get(id).await?;
    let mut session = hosted.session.lock().await;
    session.reset();
    Ok(snapshot_of(&session))
}
