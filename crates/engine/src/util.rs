//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! parsing, naming and credential logic so every operation derives identities
//! the same way.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, users::GUEST_EMAIL_DOMAIN};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Lowercase and validate an email address.
///
/// Addresses in the synthetic guest domain are refused so real accounts can
/// never collide with guests.
pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = value.trim().to_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(EngineError::InvalidInput(format!("invalid email: {value}")));
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return Err(EngineError::InvalidInput(format!("invalid email: {value}")));
    }
    if domain == GUEST_EMAIL_DOMAIN || domain.ends_with(&format!(".{GUEST_EMAIL_DOMAIN}")) {
        return Err(EngineError::InvalidInput(format!(
            "email domain {domain} is reserved"
        )));
    }
    Ok(email)
}

/// ASCII-ish slug: accents stripped, lowercase alphanumerics, runs of anything
/// else collapsed into `sep`.
pub(crate) fn slugify(input: &str, sep: char) -> Option<String> {
    let mut out = String::new();
    let mut pending_sep = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push(sep);
            }
            pending_sep = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_sep = true;
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

/// First eight hex digits of a UUID, used as a short disambiguating suffix.
pub(crate) fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// Deterministic synthetic address for a guest, unique per `(name, scope)`.
pub(crate) fn guest_email(display_name: &str, scope: &str) -> String {
    let slug = slugify(display_name, '.').unwrap_or_else(|| "guest".to_string());
    format!("{slug}.{scope}@{GUEST_EMAIL_DOMAIN}")
}

pub(crate) fn hash_password(password: &str) -> ResultEngine<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|err| EngineError::Credential(format!("cannot hash password: {err}")))
}

pub(crate) fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
