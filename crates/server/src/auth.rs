//! Bearer credential verification.
//!
//! Two kinds of tokens are accepted:
//! - local HS256 tokens issued by `/auth/login`, recognised by their `kid`;
//! - tokens from an external identity provider, checked against its JWKS.

use std::time::{Duration, Instant};

use chrono::Utc;
use engine::ExternalClaims;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, decode_header, encode,
    jwk::{AlgorithmParameters, EllipticCurve, Jwk, JwkSet, KeyAlgorithm},
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// `kid` stamped on every locally issued token.
const LOCAL_KEY_ID: &str = "cassa-local";

/// Minimum spacing between two JWKS requests, successful or not.
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("external identity tokens are not accepted")]
    ExternalDisabled,
    #[error("external identity token required")]
    ExternalRequired,
    #[error("cannot fetch signing keys: {0}")]
    Jwks(String),
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HMAC secret for local tokens.
    pub secret: String,
    pub token_ttl: chrono::Duration,
    pub external: Option<ExternalAuthConfig>,
}

#[derive(Clone, Debug)]
pub struct ExternalAuthConfig {
    pub jwks_url: String,
    pub audience: Option<String>,
    pub issuer: Option<String>,
    pub cache_ttl: Duration,
}

/// Who a verified token speaks for.
#[derive(Clone, Debug)]
pub enum Principal {
    Local { user_id: Uuid },
    External(ExternalClaims),
}

#[derive(Debug)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LocalClaims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct CredentialVerifier {
    secret: String,
    token_ttl: chrono::Duration,
    external: Option<ExternalVerifier>,
}

impl CredentialVerifier {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            secret: config.secret,
            token_ttl: config.token_ttl,
            external: config.external.map(ExternalVerifier::new),
        }
    }

    /// Signs a short-lived token for `user_id`.
    pub fn issue_local(&self, user_id: Uuid) -> Result<IssuedToken, AuthError> {
        let now = Utc::now();
        let claims = LocalClaims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.token_ttl).timestamp(),
        };
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(LOCAL_KEY_ID.to_string());

        let token = encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|err| AuthError::Invalid(err.to_string()))?;
        Ok(IssuedToken {
            token,
            expires_in: self.token_ttl.num_seconds(),
        })
    }

    pub async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let header = decode_header(token).map_err(|err| AuthError::Invalid(err.to_string()))?;
        if header.kid.as_deref() == Some(LOCAL_KEY_ID) {
            return self.verify_local(token);
        }
        let external = self.external.as_ref().ok_or(AuthError::ExternalDisabled)?;
        external.verify(token, &header).await.map(Principal::External)
    }

    fn verify_local(&self, token: &str) -> Result<Principal, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        let data = decode::<LocalClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|err| AuthError::Invalid(err.to_string()))?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AuthError::Invalid("malformed subject".to_string()))?;
        Ok(Principal::Local { user_id })
    }
}

struct CachedJwks {
    keys: JwkSet,
    fetched_at: Instant,
}

impl CachedJwks {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}

struct ExternalVerifier {
    config: ExternalAuthConfig,
    http: reqwest::Client,
    cache: RwLock<Option<CachedJwks>>,
    /// Time of the last JWKS request. Held while fetching.
    last_fetch: Mutex<Option<Instant>>,
}

impl ExternalVerifier {
    fn new(config: ExternalAuthConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            cache: RwLock::new(None),
            last_fetch: Mutex::new(None),
        }
    }

    async fn verify(&self, token: &str, header: &Header) -> Result<ExternalClaims, AuthError> {
        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::Invalid("token has no key id".to_string()))?;
        let (key, alg) = self.decoding_key(kid).await?;
        if header.alg != alg {
            return Err(AuthError::Invalid(format!(
                "token algorithm {:?} does not match signing key {kid}",
                header.alg
            )));
        }

        let mut validation = Validation::new(alg);
        match &self.config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer]);
        }
        decode::<ExternalClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|err| AuthError::Invalid(err.to_string()))
    }

    /// Key for `kid`, from the cache while it is fresh.
    ///
    /// A stale cache or an unknown `kid` triggers a refetch so rotated keys
    /// are picked up, at most once per [`MIN_REFETCH_INTERVAL`].
    async fn decoding_key(&self, kid: &str) -> Result<(DecodingKey, Algorithm), AuthError> {
        if let Some(found) = self.cached_key(kid).await {
            return found;
        }

        let mut last_fetch = self.last_fetch.lock().await;
        // Another request may have refreshed the keys while this one waited.
        if let Some(found) = self.cached_key(kid).await {
            return found;
        }
        if last_fetch.is_some_and(|at| at.elapsed() < MIN_REFETCH_INTERVAL) {
            let cache = self.cache.read().await;
            return match cache.as_ref() {
                Some(cached) if cached.is_fresh(self.config.cache_ttl) => {
                    Err(AuthError::Invalid(format!("unknown signing key {kid}")))
                }
                _ => Err(AuthError::Jwks("signing keys unavailable".to_string())),
            };
        }
        *last_fetch = Some(Instant::now());

        let keys = self.fetch().await?;
        let key = keys
            .find(kid)
            .ok_or_else(|| AuthError::Invalid(format!("unknown signing key {kid}")))
            .and_then(decoding_key_for);
        *self.cache.write().await = Some(CachedJwks {
            keys,
            fetched_at: Instant::now(),
        });
        key
    }

    async fn cached_key(&self, kid: &str) -> Option<Result<(DecodingKey, Algorithm), AuthError>> {
        let cache = self.cache.read().await;
        let cached = cache.as_ref().filter(|c| c.is_fresh(self.config.cache_ttl))?;
        cached.keys.find(kid).map(decoding_key_for)
    }

    async fn fetch(&self) -> Result<JwkSet, AuthError> {
        tracing::debug!(url = %self.config.jwks_url, "fetching JWKS");
        let response = self
            .http
            .get(&self.config.jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| {
                tracing::warn!("JWKS request failed: {err}");
                AuthError::Jwks(err.to_string())
            })?;
        response.json::<JwkSet>().await.map_err(|err| {
            tracing::warn!("JWKS response is not a key set: {err}");
            AuthError::Jwks(err.to_string())
        })
    }

    #[cfg(test)]
    async fn seed(&self, keys: JwkSet, fetched_at: Instant) {
        *self.cache.write().await = Some(CachedJwks { keys, fetched_at });
    }
}

fn decoding_key_for(jwk: &Jwk) -> Result<(DecodingKey, Algorithm), AuthError> {
    let alg = signing_algorithm(jwk)?;
    let key = DecodingKey::from_jwk(jwk).map_err(|err| AuthError::Invalid(err.to_string()))?;
    Ok((key, alg))
}

/// The algorithm a key may verify: its `alg` member, or the usual one for
/// its key type. Symmetric keys must name their algorithm.
fn signing_algorithm(jwk: &Jwk) -> Result<Algorithm, AuthError> {
    if let Some(alg) = &jwk.common.key_algorithm {
        return match alg {
            KeyAlgorithm::HS256 => Ok(Algorithm::HS256),
            KeyAlgorithm::HS384 => Ok(Algorithm::HS384),
            KeyAlgorithm::HS512 => Ok(Algorithm::HS512),
            KeyAlgorithm::ES256 => Ok(Algorithm::ES256),
            KeyAlgorithm::ES384 => Ok(Algorithm::ES384),
            KeyAlgorithm::RS256 => Ok(Algorithm::RS256),
            KeyAlgorithm::RS384 => Ok(Algorithm::RS384),
            KeyAlgorithm::RS512 => Ok(Algorithm::RS512),
            KeyAlgorithm::PS256 => Ok(Algorithm::PS256),
            KeyAlgorithm::PS384 => Ok(Algorithm::PS384),
            KeyAlgorithm::PS512 => Ok(Algorithm::PS512),
            KeyAlgorithm::EdDSA => Ok(Algorithm::EdDSA),
            other => Err(AuthError::Invalid(format!(
                "key algorithm {other:?} cannot verify signatures"
            ))),
        };
    }
    match &jwk.algorithm {
        AlgorithmParameters::RSA(_) => Ok(Algorithm::RS256),
        AlgorithmParameters::EllipticCurve(ec) if ec.curve == EllipticCurve::P256 => {
            Ok(Algorithm::ES256)
        }
        AlgorithmParameters::EllipticCurve(ec) if ec.curve == EllipticCurve::P384 => {
            Ok(Algorithm::ES384)
        }
        AlgorithmParameters::OctetKeyPair(_) => Ok(Algorithm::EdDSA),
        _ => Err(AuthError::Invalid(
            "signing key does not name its algorithm".to_string(),
        )),
    }
}
