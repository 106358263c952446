use api_types::group::{GroupNew, GroupUpdate, GroupView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::User;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<GroupView>>, ServerError> {
    let groups = state.engine.list_active_groups_for(user.id).await?;
    Ok(Json(groups.into_iter().map(views::group).collect()))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Json(payload): Json<GroupNew>,
) -> Result<(StatusCode, Json<GroupView>), ServerError> {
    let group = state
        .engine
        .create_group(user.id, &payload.name, payload.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(views::group(group))))
}

pub async fn detail(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<GroupView>, ServerError> {
    let group = state.engine.group_detail(group_id, user.id).await?;
    Ok(Json(views::group(group)))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<GroupUpdate>,
) -> Result<Json<GroupView>, ServerError> {
    if payload.name.is_none() && payload.description.is_none() {
        return Err(ServerError::Generic("nothing to update".to_string()));
    }
    let group = state
        .engine
        .update_group(
            group_id,
            user.id,
            payload.name.as_deref(),
            payload.description.as_deref(),
        )
        .await?;
    Ok(Json(views::group(group)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_group(group_id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
