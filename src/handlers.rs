use crate::{
    AppState,
    auth::AdminUser,
    error::{ApiError, ErrorBody},
    models::{CreatePollRequest, NewPoll, PollListResponse, PollResponse, UpdatePollRequest},
    validation::{self, Violation},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State, rejection::PathRejection},
    http::StatusCode,
};
use uuid::Uuid;

/// Turns a malformed `{id}` segment into a 400 instead of axum's plain-text rejection.
fn poll_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    id.map(|Path(id)| id).map_err(|_| {
        ApiError::Validation(vec![Violation::new("id", "invalid_type", "must be a UUID")])
    })
}

/// list_polls
///
/// [Admin Route] Returns every poll in the store.
#[utoipa::path(
    get,
    path = "/api/admin/polls",
    responses(
        (status = 200, description = "All polls", body = PollListResponse),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
#[tracing::instrument(name = "list_polls", skip_all)]
pub async fn list_polls(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> Result<Json<PollListResponse>, ApiError> {
    let polls = state.repo.list_polls().await?;
    Ok(Json(PollListResponse { polls }))
}

/// create_poll
///
/// [Admin Route] Validates the body and inserts a poll owned by the caller.
/// The store assigns id and timestamp; both come back in the response.
#[utoipa::path(
    post,
    path = "/api/admin/polls",
    request_body = CreatePollRequest,
    responses(
        (status = 201, description = "Created", body = PollResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
#[tracing::instrument(name = "create_poll", skip_all)]
pub async fn create_poll(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<PollResponse>), ApiError> {
    let CreatePollRequest { question, options } =
        validation::create_payload(&body).map_err(ApiError::Validation)?;

    let poll = state
        .repo
        .create_poll(NewPoll {
            question,
            options,
            created_by: admin.id,
        })
        .await?;

    tracing::info!(poll_id = %poll.id, created_by = %admin.id, "poll created");
    Ok((StatusCode::CREATED, Json(PollResponse { poll })))
}

/// update_poll
///
/// [Admin Route] Partial update: only the supplied fields change. An unknown
/// id surfaces as a store error (500), same as any other store failure.
#[utoipa::path(
    put,
    path = "/api/admin/polls/{id}",
    params(("id" = Uuid, Path, description = "Poll ID")),
    request_body = UpdatePollRequest,
    responses(
        (status = 200, description = "Updated", body = PollResponse),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
#[tracing::instrument(name = "update_poll", skip_all)]
pub async fn update_poll(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> Result<Json<PollResponse>, ApiError> {
    let id = poll_id(id)?;
    let changes = validation::update_payload(&body).map_err(ApiError::Validation)?;

    let poll = state.repo.update_poll(id, changes).await?;
    tracing::info!(poll_id = %poll.id, "poll updated");
    Ok(Json(PollResponse { poll }))
}

/// delete_poll
///
/// [Admin Route] Removes a poll. Deleting a missing id is still a 204.
#[utoipa::path(
    delete,
    path = "/api/admin/polls/{id}",
    params(("id" = Uuid, Path, description = "Poll ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
#[tracing::instrument(name = "delete_poll", skip_all)]
pub async fn delete_poll(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = poll_id(id)?;
    state.repo.delete_poll(id).await?;
    tracing::info!(poll_id = %id, "poll deleted");
    Ok(StatusCode::NO_CONTENT)
}
