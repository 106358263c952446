use api_types::balance::BalanceView;
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use engine::User;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<BalanceView>>, ServerError> {
    let balances = state.engine.member_balances(group_id, user.id).await?;
    Ok(Json(balances.into_iter().map(views::balance).collect()))
}
