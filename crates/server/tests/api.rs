use axum::{
    Json, Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    routing::get,
};
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use migration::MigratorTrait;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use engine::{Engine, ExternalClaims};
use server::{AuthConfig, CredentialVerifier, ExternalAuthConfig, ServerState, router};

const IDP_SECRET: &[u8] = b"external-identity-test-secret-32";
const IDP_K: &str = "ZXh0ZXJuYWwtaWRlbnRpdHktdGVzdC1zZWNyZXQtMzI";

struct TestApp {
    router: Router,
    state: ServerState,
}

impl TestApp {
    async fn new(external: Option<ExternalAuthConfig>) -> Self {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        let verifier = CredentialVerifier::new(AuthConfig {
            secret: "test-secret".to_string(),
            token_ttl: chrono::Duration::minutes(30),
            external,
        });
        let state = ServerState::new(engine, verifier);
        Self {
            router: router(state.clone()),
            state,
        }
    }

    /// Creates a user without going through password hashing and returns
    /// `(id, bearer token)`.
    async fn user(&self, name: &str) -> (Uuid, String) {
        let user = self
            .state
            .engine
            .resolve_or_create_from_external_claims(&ExternalClaims {
                subject: Some(format!("sub-{name}")),
                email: Some(format!("{name}@example.com")),
                name: Some(name.to_string()),
                preferred_username: None,
            })
            .await
            .unwrap();
        let token = self.state.verifier.issue_local(user.id).unwrap().token;
        (user.id, token)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }
}

fn idp_token(sub: &str, email: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some("idp-1".to_string());
    let mut claims = json!({
        "sub": sub,
        "name": "Idp User",
        "aud": "cassa",
        "iss": "https://idp.test",
        "exp": (Utc::now() + chrono::Duration::minutes(5)).timestamp(),
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
    }
    encode(&header, &claims, &EncodingKey::from_secret(IDP_SECRET)).unwrap()
}

/// Serves a one-key JWKS on an ephemeral port.
async fn spawn_idp() -> ExternalAuthConfig {
    let jwks = json!({ "keys": [{ "kty": "oct", "kid": "idp-1", "alg": "HS256", "k": IDP_K }] });
    let app = Router::new().route("/jwks", get(move || async move { Json(jwks) }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    ExternalAuthConfig {
        jwks_url: format!("http://{addr}/jwks"),
        audience: Some("cassa".to_string()),
        issuer: Some("https://idp.test".to_string()),
        cache_ttl: std::time::Duration::from_secs(300),
    }
}

#[tokio::test]
async fn register_login_and_create_group() {
    let app = TestApp::new(None).await;

    let (status, user) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "alice", "email": "alice@example.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], "alice");

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "username": "alice2", "email": "ALICE@example.com", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, token) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(token["expires_in"], 1800);
    let token = token["access_token"].as_str().unwrap().to_string();

    let (status, _) = app.send(Method::GET, "/groups", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app
        .send(Method::GET, "/groups", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, group) = app
        .send(
            Method::POST,
            "/groups",
            Some(&token),
            Some(json!({ "name": "Trip", "description": "Lisbon" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(group["members"][0]["role"], "OWNER");

    let (status, _) = app
        .send(Method::POST, "/groups", Some(&token), Some(json!({ "name": "trip" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, groups) = app.send(Method::GET, "/groups", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(groups.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invite_split_and_leave() {
    let app = TestApp::new(None).await;
    let (alice, alice_token) = app.user("alice").await;
    let (bob, bob_token) = app.user("bob").await;

    let (_, group) = app
        .send(Method::POST, "/groups", Some(&alice_token), Some(json!({ "name": "Trip" })))
        .await;
    let group_id = group["id"].as_str().unwrap().to_string();

    let (status, added) = app
        .send(
            Method::POST,
            &format!("/groups/{group_id}/members"),
            Some(&alice_token),
            Some(json!({ "identifier": "bob@example.com", "role": "EDITOR" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["invitation"]["status"], "PENDING");
    let invitation_id = added["invitation"]["id"].as_str().unwrap().to_string();

    let (status, again) = app
        .send(
            Method::POST,
            &format!("/groups/{group_id}/members"),
            Some(&alice_token),
            Some(json!({ "identifier": "bob@example.com", "role": "VIEWER" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{again}");

    let (_, mine) = app
        .send(Method::GET, "/invitations", Some(&bob_token), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/invitations/{invitation_id}/respond"),
            Some(&bob_token),
            Some(json!({ "accept": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/invitations/{invitation_id}/respond"),
            Some(&bob_token),
            Some(json!({ "accept": false })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, tx) = app
        .send(
            Method::POST,
            &format!("/groups/{group_id}/transactions"),
            Some(&bob_token),
            Some(json!({
                "kind": "CREDIT",
                "amount_minor": 300,
                "description": "Dinner",
                "split_mode": "EQUAL",
                "splits": [{ "user_id": alice }, { "user_id": bob }],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{tx}");
    assert_eq!(tx["created_by"], "bob");
    assert_eq!(tx["splits"][0]["amount_minor"], 150);
    let tx_id = tx["id"].as_str().unwrap().to_string();

    let (status, detail) = app
        .send(
            Method::GET,
            &format!("/groups/{group_id}/transactions/{tx_id}"),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["description"], "Dinner");
    assert_eq!(detail["splits"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/groups/{group_id}/transactions"),
            Some(&bob_token),
            Some(json!({
                "kind": "DEBIT",
                "amount_minor": 300,
                "description": "Taxi",
                "split_mode": "AMOUNT",
                "splits": [
                    { "user_id": alice, "amount_minor": 100 },
                    { "user_id": bob, "amount_minor": 100 },
                ],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = app
        .send(
            Method::GET,
            &format!("/groups/{group_id}/transactions?limit=10"),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["transactions"].as_array().unwrap().len(), 1);
    assert!(page["next_cursor"].is_null());

    let (_, balances) = app
        .send(
            Method::GET,
            &format!("/groups/{group_id}/balances"),
            Some(&alice_token),
            None,
        )
        .await;
    let total: i64 = balances
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["balance_minor"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 0);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/groups/{group_id}/leave"),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/groups/{group_id}/leave"),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(Method::GET, &format!("/groups/{group_id}"), Some(&bob_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, group) = app
        .send(Method::GET, &format!("/groups/{group_id}"), Some(&alice_token), None)
        .await;
    let guest = group["members"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["username"] == "bob")
        .unwrap();
    assert_eq!(guest["role"], "GUEST");
}

#[tokio::test]
async fn gates_map_to_status_codes() {
    let app = TestApp::new(None).await;
    let (alice, alice_token) = app.user("alice").await;
    let (_, mallory_token) = app.user("mallory").await;

    let (_, group) = app
        .send(Method::POST, "/groups", Some(&alice_token), Some(json!({ "name": "Trip" })))
        .await;
    let group_id = group["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::GET, &format!("/groups/{group_id}"), Some(&mallory_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/groups/{}", Uuid::new_v4()),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/groups/{group_id}/members/{alice}/role"),
            Some(&alice_token),
            Some(json!({ "role": "VIEWER" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/groups/{group_id}/transactions/{}", Uuid::new_v4()),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(Method::DELETE, &format!("/groups/{group_id}"), Some(&mallory_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/groups/{group_id}"),
            Some(&alice_token),
            Some(json!({ "name": "Road trip" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Road trip");

    let (status, body) = app
        .send(Method::PUT, &format!("/groups/{group_id}"), Some(&alice_token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "nothing to update");

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/groups/{group_id}/transactions/{}", Uuid::new_v4()),
            Some(&alice_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::DELETE, &format!("/groups/{group_id}"), Some(&alice_token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());
}

#[tokio::test]
async fn external_identity_sync() {
    let idp = spawn_idp().await;
    let app = TestApp::new(Some(idp)).await;
    let token = idp_token("idp-sub-1", Some("Erin@Example.com"));

    // Not synced yet.
    let (status, _) = app.send(Method::GET, "/groups", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, user) = app.send(Method::POST, "/auth/sync", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{user}");
    assert_eq!(user["email"], "erin@example.com");

    let (status, again) = app.send(Method::POST, "/auth/sync", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], user["id"]);

    let (status, groups) = app.send(Method::GET, "/groups", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(groups.as_array().unwrap().is_empty());

    let no_email = idp_token("idp-sub-2", None);
    let (status, _) = app
        .send(Method::POST, "/auth/sync", Some(&no_email), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Local tokens cannot be used to sync.
    let (_, local) = app.user("frank").await;
    let (status, _) = app.send(Method::POST, "/auth/sync", Some(&local), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
