use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{CreateRobeRequest, UpdateRobeRequest},
    repo,
    repo_types::RobeTransaction,
};
use crate::{
    auth::{
        extractors::AuthUser,
        gate::{protect, STAFF},
    },
    error::{ApiError, ApiResponse, ApiResult},
    extract::{ValidPath, ValidatedJson},
    participants,
    state::AppState,
};

const NOT_FOUND: &str = "Robe transaction not found";

pub fn router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route(
            "/participants/:id/robes",
            get(list_robes).post(create_robe),
        )
        .route("/robes/:id", patch(update_robe));
    protect(routes, state, STAFF)
}

#[instrument(skip(state, _caller))]
pub async fn list_robes(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(participant_id): ValidPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<RobeTransaction>>>> {
    participants::handlers::load(&state, participant_id).await?;
    let items = repo::list_for_participant(&state.db, participant_id).await?;
    Ok(ApiResponse::ok("Robe transactions fetched", items))
}

#[instrument(skip(state, _caller, body))]
pub async fn create_robe(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(participant_id): ValidPath<Uuid>,
    ValidatedJson(body): ValidatedJson<CreateRobeRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<RobeTransaction>>)> {
    let new = body
        .into_new(participant_id)
        .ok_or_else(|| ApiError::Validation(vec!["Type is required".into()]))?;
    participants::handlers::load(&state, participant_id).await?;
    let robe = repo::insert(&state.db, &new).await?;
    info!(robe_id = %robe.id, %participant_id, kind = robe.kind.as_str(), "robe transaction created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Robe transaction created", robe),
    ))
}

#[instrument(skip(state, _caller, body))]
pub async fn update_robe(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateRobeRequest>,
) -> ApiResult<Json<ApiResponse<RobeTransaction>>> {
    let current = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    if let Some(status) = body.status {
        if !status.applies_to(current.kind) {
            return Err(ApiError::BadRequest(format!(
                "Status {} is not valid for a {} transaction",
                status.as_str(),
                current.kind.as_str()
            )));
        }
    }
    let updated = repo::update(&state.db, id, body.status, body.notes.as_deref())
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    info!(robe_id = %id, status = updated.status.as_str(), "robe transaction updated");
    Ok(ApiResponse::ok("Robe transaction updated", updated))
}
