use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use std::sync::Arc;

use crate::{
    AuthError, CredentialVerifier, Principal, ServerError, balances, groups, invitations,
    memberships, transactions, user,
};
use engine::{Engine, EngineError};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub verifier: Arc<CredentialVerifier>,
}

impl ServerState {
    pub fn new(engine: Engine, verifier: CredentialVerifier) -> Self {
        Self {
            engine: Arc::new(engine),
            verifier: Arc::new(verifier),
        }
    }
}

/// Resolves the bearer token to a known [`engine::User`] and stores it in the
/// request extensions.
///
/// External identities must have been synced through `/auth/sync` first.
async fn auth(
    auth_header: Option<TypedHeader<Authorization<Bearer>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(Authorization(bearer))) = auth_header else {
        return Err(AuthError::Missing.into());
    };

    let user = match state.verifier.verify(bearer.token()).await? {
        Principal::Local { user_id } => match state.engine.user_by_id(user_id).await {
            Ok(user) => user,
            Err(EngineError::KeyNotFound(_)) => {
                return Err(AuthError::Invalid("unknown user".to_string()).into());
            }
            Err(err) => return Err(err.into()),
        },
        Principal::External(claims) => {
            let subject = claims.subject.as_deref().unwrap_or_default();
            state
                .engine
                .user_by_external_subject(subject)
                .await?
                .ok_or_else(|| {
                    ServerError::Engine(EngineError::Unauthenticated(
                        "identity not synced, call /auth/sync first".to_string(),
                    ))
                })?
        }
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let protected = Router::new()
        .route("/groups", get(groups::list).post(groups::create))
        .route(
            "/groups/{group_id}",
            get(groups::detail)
                .put(groups::update)
                .delete(groups::delete),
        )
        .route(
            "/groups/{group_id}/invitations",
            get(invitations::list_for_group),
        )
        .route("/groups/{group_id}/members", post(memberships::add))
        .route(
            "/groups/{group_id}/members/{user_id}/role",
            put(memberships::set_role),
        )
        .route(
            "/groups/{group_id}/members/{user_id}/replace-with-guest",
            put(memberships::replace_with_guest),
        )
        .route("/groups/{group_id}/leave", post(memberships::leave))
        .route("/groups/{group_id}/balances", get(balances::list))
        .route(
            "/groups/{group_id}/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route(
            "/groups/{group_id}/transactions/{transaction_id}",
            get(transactions::detail)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route("/invitations", get(invitations::list_mine))
        .route(
            "/invitations/{invitation_id}/respond",
            post(invitations::respond),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    Router::new()
        .route("/auth/register", post(user::register))
        .route("/auth/login", post(user::login))
        .route("/auth/sync", post(user::sync))
        .merge(protected)
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    verifier: CredentialVerifier,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState::new(engine, verifier);

    axum::serve(listener, router(state)).await
}
