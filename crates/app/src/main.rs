use std::time::Duration;

use migration::{Migrator, MigratorTrait};
use server::{AuthConfig, CredentialVerifier, ExternalAuthConfig};
use settings::Database;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "cassa={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let engine = engine::Engine::builder().database(db).build().await?;
    let verifier = CredentialVerifier::new(auth_config(settings.auth));

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr = format!("{}:{}", bind, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    server::run_with_listener(engine, verifier, listener).await?;

    Ok(())
}

fn auth_config(auth: settings::Auth) -> AuthConfig {
    if auth.external.is_none() {
        tracing::info!("no external identity provider configured, local tokens only");
    }
    AuthConfig {
        secret: auth.secret,
        token_ttl: chrono::Duration::minutes(auth.token_ttl_minutes),
        external: auth.external.map(|external| ExternalAuthConfig {
            jwks_url: external.jwks_url,
            audience: external.audience,
            issuer: external.issuer,
            cache_ttl: Duration::from_secs(external.cache_ttl_secs),
        }),
    }
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    tracing::info!("database ready");
    Ok(database)
}
