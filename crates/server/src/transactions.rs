//! Transactions API endpoints

use api_types::{
    Message,
    transaction::{TransactionList, TransactionListResponse, TransactionNew, TransactionView},
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{SplitInput, TransactionCmd, User};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, views};

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

fn command(group_id: Uuid, user_id: Uuid, payload: TransactionNew) -> TransactionCmd {
    let mut cmd = TransactionCmd::new(
        group_id,
        user_id,
        views::kind_from_api(payload.kind),
        payload.amount_minor,
        payload.description,
        payload.occurred_at.unwrap_or_else(Utc::now),
    )
    .split_mode(views::split_mode_from_api(payload.split_mode))
    .splits(
        payload
            .splits
            .into_iter()
            .map(|s| SplitInput {
                user_id: s.user_id,
                amount_minor: s.amount_minor,
                percentage: s.percentage,
            })
            .collect(),
    );
    if let Some(category) = payload.category {
        cmd = cmd.category(category);
    }
    if let Some(payer_id) = payload.payer_id {
        cmd = cmd.payer(payer_id);
    }
    cmd
}

pub async fn list(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .min(MAX_PAGE_SIZE);
    let page = state
        .engine
        .list_transactions_page(group_id, user.id, limit, query.cursor.as_deref())
        .await?;
    Ok(Json(TransactionListResponse {
        transactions: page.items.into_iter().map(views::transaction).collect(),
        next_cursor: page.next_cursor,
    }))
}

pub async fn detail(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((group_id, transaction_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .transaction_detail(group_id, transaction_id, user.id)
        .await?;
    Ok(Json(views::transaction(tx)))
}

pub async fn create(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path(group_id): Path<Uuid>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let tx = state
        .engine
        .create_transaction(command(group_id, user.id, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(views::transaction(tx))))
}

pub async fn update(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((group_id, transaction_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TransactionNew>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .update_transaction(transaction_id, command(group_id, user.id, payload))
        .await?;
    Ok(Json(views::transaction(tx)))
}

pub async fn delete(
    Extension(user): Extension<User>,
    State(state): State<ServerState>,
    Path((group_id, transaction_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Message>, ServerError> {
    state
        .engine
        .delete_transaction(group_id, transaction_id, user.id)
        .await?;
    Ok(Json(Message::new("transaction deleted")))
}
