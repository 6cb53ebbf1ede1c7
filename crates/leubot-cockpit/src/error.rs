//! [`ApiError`] – rejections rendered as HTTP responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use leubot_types::{ArmError, ArmReply};
use serde_json::json;
use tracing::{debug, error};

#[derive(Debug)]
pub enum ApiError {
    /// The arbitrator rejected the request.
    Arm(ArmError),
    /// The request body could not be read as the expected JSON.
    BadRequest(String),
}

impl ApiError {
    /// The arbitrator answered with a reply kind the route never asked for.
    pub fn unexpected(reply: ArmReply) -> Self {
        ApiError::Arm(ArmError::Internal(format!("unexpected reply {reply:?}")))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Arm(e) => match e {
                ArmError::IdentityConflict => StatusCode::CONFLICT,
                ArmError::InvalidIdentity(_) | ArmError::InvalidCommand { .. } => {
                    StatusCode::BAD_REQUEST
                }
                ArmError::InvalidToken | ArmError::NoSession => StatusCode::UNAUTHORIZED,
                ArmError::NotFound => StatusCode::NOT_FOUND,
                ArmError::Internal(_) | ArmError::MailboxClosed => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Arm(e) => e.to_string(),
            ApiError::BadRequest(msg) => msg.clone(),
        }
    }
}

impl From<ArmError> for ApiError {
    fn from(e: ArmError) -> Self {
        ApiError::Arm(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(%status, error = %message, "request failed");
        } else {
            debug!(%status, error = %message, "request rejected");
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ArmError::IdentityConflict, StatusCode::CONFLICT),
            (ArmError::InvalidIdentity("x".into()), StatusCode::BAD_REQUEST),
            (
                ArmError::InvalidCommand {
                    field: "base".into(),
                    value: 2000,
                    min: 0,
                    max: 1023,
                },
                StatusCode::BAD_REQUEST,
            ),
            (ArmError::InvalidToken, StatusCode::UNAUTHORIZED),
            (ArmError::NoSession, StatusCode::UNAUTHORIZED),
            (ArmError::NotFound, StatusCode::NOT_FOUND),
            (ArmError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ArmError::MailboxClosed, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err.clone()).status(), status, "{err:?}");
        }
        assert_eq!(
            ApiError::BadRequest("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn unexpected_reply_is_internal() {
        let e = ApiError::unexpected(ArmReply::Released);
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
