//! Registration, local login and external identity sync.

use api_types::user::{Login, Register, Token, UserView};
use axum::{Json, extract::State, http::StatusCode};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{AuthError, Principal, ServerError, server::ServerState, views};

pub async fn register(
    State(state): State<ServerState>,
    Json(payload): Json<Register>,
) -> Result<(StatusCode, Json<UserView>), ServerError> {
    let user = state
        .engine
        .register_local_user(&payload.username, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(views::user(user))))
}

pub async fn login(
    State(state): State<ServerState>,
    Json(payload): Json<Login>,
) -> Result<Json<Token>, ServerError> {
    let user = state
        .engine
        .authenticate_local(&payload.username, &payload.password)
        .await?;
    let issued = state.verifier.issue_local(user.id)?;
    tracing::debug!(user_id = %user.id, "issued local token");
    Ok(Json(Token {
        access_token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in,
    }))
}

/// Creates or links the user behind an external identity token.
pub async fn sync(
    State(state): State<ServerState>,
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Json<UserView>, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(AuthError::Missing.into());
    };
    let Principal::External(claims) = state.verifier.verify(bearer.token()).await? else {
        return Err(AuthError::ExternalRequired.into());
    };
    let user = state
        .engine
        .resolve_or_create_from_external_claims(&claims)
        .await?;
    Ok(Json(views::user(user)))
}
