use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{RegisterRequest, RosterQuery, UpdateParticipantRequest},
    repo,
    repo_types::{Participant, Refusal, Registration},
};
use crate::{
    auth::{
        extractors::AuthUser,
        gate::{protect, MEMBER, STAFF},
        services,
    },
    error::{ApiError, ApiResponse, ApiResult},
    extract::{ValidPath, ValidQuery, ValidatedJson},
    retreats,
    state::AppState,
};

pub const NOT_FOUND: &str = "Participant not found";

pub fn member_router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route(
            "/retreats/:id/register",
            post(register).delete(cancel_registration),
        )
        .route("/auth/me/registrations", get(my_registrations));
    protect(routes, state, MEMBER)
}

pub fn admin_router(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/retreats/:id/participants", get(list_participants))
        .route("/participants/:id", patch(update_participant));
    protect(routes, state, STAFF)
}

pub(crate) async fn load(state: &AppState, id: Uuid) -> ApiResult<Participant> {
    repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))
}

#[instrument(skip(state, claims, body), fields(member_id = %claims.sub))]
pub async fn register(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidPath(retreat_id): ValidPath<Uuid>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Participant>>)> {
    let member = services::me(&state, &claims).await?;
    let outcome = repo::register(&state.db, retreat_id, member.id, body.notes.as_deref()).await?;
    match outcome {
        Registration::Created(p) => {
            info!(participant_id = %p.id, %retreat_id, "member registered");
            Ok((
                StatusCode::CREATED,
                ApiResponse::ok("Registered for retreat", p),
            ))
        }
        Registration::Refused(refusal) => Err(refused(refusal)),
    }
}

fn refused(refusal: Refusal) -> ApiError {
    match refusal {
        Refusal::RetreatUnavailable => ApiError::NotFound(retreats::handlers::NOT_FOUND),
        Refusal::Full => ApiError::Conflict("Retreat is full".into()),
        Refusal::AlreadyRegistered => {
            ApiError::Conflict("Already registered for this retreat".into())
        }
    }
}

#[instrument(skip(state, claims), fields(member_id = %claims.sub))]
pub async fn cancel_registration(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ValidPath(retreat_id): ValidPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Participant>>> {
    let cancelled = repo::cancel(&state.db, retreat_id, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("Registration not found"))?;
    info!(participant_id = %cancelled.id, %retreat_id, "registration cancelled");
    Ok(ApiResponse::ok("Registration cancelled", cancelled))
}

#[instrument(skip(state, claims), fields(member_id = %claims.sub))]
pub async fn my_registrations(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> ApiResult<Json<ApiResponse<Vec<Participant>>>> {
    let member = services::me(&state, &claims).await?;
    let items = repo::list_for_member(&state.db, member.id).await?;
    Ok(ApiResponse::ok("Registrations fetched", items))
}

#[instrument(skip(state, _caller))]
pub async fn list_participants(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(retreat_id): ValidPath<Uuid>,
    ValidQuery(q): ValidQuery<RosterQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Participant>>>> {
    retreats::handlers::load(&state, retreat_id).await?;
    let items = repo::list_for_retreat(&state.db, retreat_id, q.status).await?;
    Ok(ApiResponse::ok("Participants fetched", items))
}

#[instrument(skip(state, _caller, body))]
pub async fn update_participant(
    State(state): State<AppState>,
    _caller: AuthUser,
    ValidPath(id): ValidPath<Uuid>,
    ValidatedJson(body): ValidatedJson<UpdateParticipantRequest>,
) -> ApiResult<Json<ApiResponse<Participant>>> {
    let updated = repo::update(&state.db, id, &body.into_changes())
        .await?
        .ok_or(ApiError::NotFound(NOT_FOUND))?;
    info!(participant_id = %id, status = updated.status.as_str(), "participant updated");
    Ok(ApiResponse::ok("Participant updated", updated))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::refused;
    use crate::{
        accounts::{Account, AccountKind, Role},
        participants::repo_types::Refusal,
        testing::{empty_request, json_request, send, Harness},
    };

    fn people() -> (Harness, Account, Account) {
        let now = OffsetDateTime::now_utc();
        let bob = Account::provision(AccountKind::Member, "bob@example.com", Role::Member, now);
        let ops = Account::provision(AccountKind::Admin, "ops@example.com", Role::Admin, now);
        let h = Harness::with_accounts(vec![bob.clone(), ops.clone()]);
        (h, bob, ops)
    }

    #[tokio::test]
    async fn registration_is_for_members_only() {
        let (h, _, ops) = people();
        let token = h.token_for(&ops);
        let uri = format!("/public/api/retreats/{}/register", Uuid::new_v4());
        let (status, _) = send(h.app(), json_request(Method::POST, &uri, Some(&token), json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(h.app(), empty_request(Method::DELETE, &uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn members_cannot_reach_the_roster() {
        let (h, bob, _) = people();
        let token = h.token_for(&bob);
        let uri = format!("/private/api/retreats/{}/participants", Uuid::new_v4());
        let (status, _) = send(h.app(), empty_request(Method::GET, &uri, Some(&token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn long_notes_are_rejected() {
        let (h, bob, _) = people();
        let token = h.token_for(&bob);
        let uri = format!("/public/api/retreats/{}/register", Uuid::new_v4());
        let (status, body) = send(
            h.app(),
            json_request(Method::POST, &uri, Some(&token), json!({"notes": "x".repeat(501)})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Notes must be at most 500 characters");
    }

    #[tokio::test]
    async fn invalid_status_update_is_a_bad_request() {
        let (h, _, ops) = people();
        let token = h.token_for(&ops);
        let uri = format!("/private/api/participants/{}", Uuid::new_v4());
        let (status, body) = send(
            h.app(),
            json_request(Method::PATCH, &uri, Some(&token), json!({"payment_amount": -5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[test]
    fn refusals_map_to_status_codes() {
        let missing = refused(Refusal::RetreatUnavailable);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Retreat not found");

        let full = refused(Refusal::Full);
        assert_eq!(full.status(), StatusCode::CONFLICT);
        assert_eq!(full.to_string(), "Retreat is full");

        let dup = refused(Refusal::AlreadyRegistered);
        assert_eq!(dup.status(), StatusCode::CONFLICT);
        assert_eq!(dup.to_string(), "Already registered for this retreat");
    }

    #[tokio::test]
    async fn malformed_retreat_id_keeps_the_envelope() {
        let (h, bob, _) = people();
        let token = h.token_for(&bob);
        let (status, body) = send(
            h.app(),
            json_request(
                Method::POST,
                "/public/api/retreats/not-a-uuid/register",
                Some(&token),
                json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().contains("UUID"));
    }
}
