use api_types::{
    Message,
    invitation::{InvitationResponse, InvitationView},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::User;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

pub async fn list_mine(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<InvitationView>>, ServerError> {
    let invitations = state.engine.list_my_pending_invitations(user.id).await?;
    Ok(Json(invitations.into_iter().map(views::invitation).collect()))
}

pub async fn list_for_group(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<InvitationView>>, ServerError> {
    let invitations = state
        .engine
        .list_group_pending_invitations(group_id, user.id)
        .await?;
    Ok(Json(invitations.into_iter().map(views::invitation).collect()))
}

pub async fn respond(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(invitation_id): Path<Uuid>,
    Json(payload): Json<InvitationResponse>,
) -> Result<Json<Message>, ServerError> {
    state
        .engine
        .respond_to_invitation(invitation_id, user.id, payload.accept)
        .await?;
    let message = if payload.accept {
        "invitation accepted"
    } else {
        "invitation rejected"
    };
    Ok(Json(Message::new(message)))
}
