use axum::{
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{AppState, error::AppError};

use super::model::{CheckUserRequest, CheckUserResponse};

const INVALID_BODY_MESSAGE: &str = "Invalid JSON body";

#[axum::debug_handler]
pub async fn check_user(
    State(state): State<AppState>,
    payload: Result<Json<CheckUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckUserResponse>), AppError> {
    let Json(req) = payload.map_err(|rejection| {
        tracing::debug!("rejected check-user body: {}", rejection);
        AppError::InvalidInput(INVALID_BODY_MESSAGE.to_string())
    })?;
    let (username, phone) = req.validate()?;

    let registration = state
        .registrations
        .check_or_register(&username, &phone)
        .await?;

    Ok((
        registration.status(),
        Json(CheckUserResponse {
            message: registration.message().to_string(),
        }),
    ))
}
