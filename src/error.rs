use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{repository::StoreError, validation::Violation};

/// ApiError
///
/// Failure taxonomy of the admin API. [`IntoResponse`] below is the one mapping
/// from error to status and body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("no authenticated identity")]
    Unauthenticated,

    #[error("identity lacks the admin role")]
    Forbidden,

    #[error("payload failed validation ({} violation(s))", .0.len())]
    Validation(Vec<Violation>),

    #[error("upstream store failure: {0}")]
    Upstream(#[from] StoreError),
}

/// ErrorBody
///
/// JSON body of every error response. `details` is only present on 400s.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<Violation>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthenticated => ErrorBody {
                error: "Unauthorized".to_string(),
                details: None,
            },
            ApiError::Forbidden => ErrorBody {
                error: "Forbidden: Admins only".to_string(),
                details: None,
            },
            ApiError::Validation(violations) => ErrorBody {
                error: "Invalid input".to_string(),
                details: Some(violations),
            },
            ApiError::Upstream(e) => {
                // Logged here, never echoed to the caller.
                tracing::error!(error = %e, "store request failed");
                ErrorBody {
                    error: "Internal Server Error".to_string(),
                    details: None,
                }
            }
        };

        (status, Json(body)).into_response()
    }
}
