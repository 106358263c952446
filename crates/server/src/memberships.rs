//! Membership management endpoints.

use api_types::{
    Message,
    group::GroupView,
    membership::{MemberAdd, MemberAdded, RoleUpdate},
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::User;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

pub async fn add(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<MemberAdd>,
) -> Result<(StatusCode, Json<MemberAdded>), ServerError> {
    let outcome = state
        .engine
        .add_member(
            group_id,
            user.id,
            &payload.identifier,
            views::role_from_api(payload.role),
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MemberAdded {
            group: views::group(outcome.group),
            invitation: outcome.invitation.map(views::invitation),
        }),
    ))
}

pub async fn set_role(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((group_id, target_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<RoleUpdate>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state
        .engine
        .set_role(
            group_id,
            target_id,
            views::role_from_api(payload.role),
            user.id,
        )
        .await?;
    Ok(Json(views::group(group)))
}

pub async fn replace_with_guest(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((group_id, target_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state
        .engine
        .replace_member_with_guest(group_id, target_id, user.id)
        .await?;
    Ok(Json(views::group(group)))
}

pub async fn leave(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Message>, ServerError> {
    state.engine.leave_group(group_id, user.id).await?;
    Ok(Json(Message::new("left the group")))
}
