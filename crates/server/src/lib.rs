use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;

pub use auth::{AuthConfig, AuthError, CredentialVerifier, ExternalAuthConfig, Principal};
pub use server::{ServerState, router, run_with_listener};

mod auth;
mod balances;
mod groups;
mod invitations;
mod memberships;
mod server;
mod transactions;
mod user;
mod views;

pub enum ServerError {
    Engine(EngineError),
    Auth(AuthError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        EngineError::Database(_) | EngineError::Credential(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::ExistingKey(_)
        | EngineError::InvalidOperation(_)
        | EngineError::InvalidInput(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidSplit(_)
        | EngineError::InvalidRole(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidCursor(_) => StatusCode::BAD_REQUEST,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Credential(reason) => {
            tracing::error!("credential error: {reason}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Auth(err) => {
                tracing::debug!("authentication failed: {err}");
                (StatusCode::UNAUTHORIZED, err.to_string())
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<AuthError> for ServerError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}
