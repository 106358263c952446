use chrono::Utc;
use sea_orm::{
    ActiveValue, Condition, DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, User, users,
    util::{guest_email, hash_password, normalize_email, short_id, slugify, verify_password},
};

use super::{Engine, is_unique_violation, normalize_required_name, with_tx};

/// Highest numeric suffix tried before falling back to a random one.
const MAX_USERNAME_SUFFIX: u32 = 999;

/// Verified claims of an externally issued identity token.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ExternalClaims {
    #[serde(rename = "sub")]
    pub subject: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub preferred_username: Option<String>,
}

impl ExternalClaims {
    fn display_name(&self) -> Option<&str> {
        [self.name.as_deref(), self.preferred_username.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

impl Engine {
    /// Registers a user with a local password.
    pub async fn register_local_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> ResultEngine<User> {
        let username = normalize_required_name(username, "username")?;
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(EngineError::InvalidInput(
                "password must not be empty".to_string(),
            ));
        }
        let password_hash = hash_password(password)?;

        let result = with_tx!(self, |db_tx| {
            if self.find_user_by_username(&db_tx, &username).await?.is_some() {
                return Err(EngineError::ExistingKey(username));
            }
            if self.find_user_by_email(&db_tx, &email).await?.is_some() {
                return Err(EngineError::ExistingKey(email));
            }

            let model = users::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4().to_string()),
                username: ActiveValue::Set(username.clone()),
                email: ActiveValue::Set(email.clone()),
                external_subject: ActiveValue::Set(None),
                password_hash: ActiveValue::Set(Some(password_hash)),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    EngineError::ExistingKey(username.clone())
                } else {
                    err.into()
                }
            })?;
            User::try_from(model)
        });
        if let Ok(user) = &result {
            tracing::info!(user_id = %user.id, "registered local user");
        }
        result
    }

    /// Checks a local password. `identifier` is a username or an email.
    ///
    /// Guests and external accounts have no password and never match.
    pub async fn authenticate_local(&self, identifier: &str, password: &str) -> ResultEngine<User> {
        let identifier = identifier.trim();
        with_tx!(self, |db_tx| {
            let model = users::Entity::find()
                .filter(
                    Condition::any()
                        .add(users::Column::Username.eq(identifier))
                        .add(users::Column::Email.eq(identifier.to_lowercase())),
                )
                .one(&db_tx)
                .await?;
            let Some(model) = model else {
                return Err(EngineError::Unauthenticated(
                    "incorrect username or password".to_string(),
                ));
            };
            let valid = model
                .password_hash
                .as_deref()
                .is_some_and(|hash| verify_password(password, hash));
            if !valid {
                return Err(EngineError::Unauthenticated(
                    "incorrect username or password".to_string(),
                ));
            }
            User::try_from(model)
        })
    }

    pub async fn user_by_id(&self, user_id: Uuid) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self.require_user(&db_tx, user_id).await?;
            User::try_from(model)
        })
    }

    pub async fn user_by_username(&self, username: &str) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = self
                .find_user_by_username(&db_tx, username.trim())
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("user not exists".to_string()))?;
            User::try_from(model)
        })
    }

    pub async fn user_by_external_subject(&self, subject: &str) -> ResultEngine<Option<User>> {
        with_tx!(self, |db_tx| {
            self.find_user_by_subject(&db_tx, subject)
                .await?
                .map(User::try_from)
                .transpose()
        })
    }

    /// Maps verified external claims to a user, creating it on first sight.
    ///
    /// Two concurrent first requests may both try to insert; the loser hits a
    /// unique violation and re-reads the row the winner created.
    pub async fn resolve_or_create_from_external_claims(
        &self,
        claims: &ExternalClaims,
    ) -> ResultEngine<User> {
        let subject = claims
            .subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::Unauthenticated("missing subject claim".to_string()))?;
        let email = claims
            .email
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::Unauthenticated("missing email claim".to_string()))?;
        let email = normalize_email(email)?;

        match self.create_or_link_external(subject, &email, claims).await {
            Err(EngineError::Database(err)) if is_unique_violation(&err) => {
                tracing::debug!(subject, "external user created concurrently, re-reading");
                self.user_by_external_subject(subject)
                    .await?
                    .ok_or(EngineError::Database(err))
            }
            other => other,
        }
    }

    async fn create_or_link_external(
        &self,
        subject: &str,
        email: &str,
        claims: &ExternalClaims,
    ) -> ResultEngine<User> {
        with_tx!(self, |db_tx| {
            let model = if let Some(model) = self.find_user_by_subject(&db_tx, subject).await? {
                model
            } else if let Some(existing) = self.find_user_by_email(&db_tx, email).await? {
                if existing.external_subject.is_some() {
                    return Err(EngineError::ExistingKey(email.to_string()));
                }
                let mut active: users::ActiveModel = existing.into();
                active.external_subject = ActiveValue::Set(Some(subject.to_string()));
                active.update(&db_tx).await?
            } else {
                let base = claims
                    .display_name()
                    .and_then(|name| slugify(name, '_'))
                    .or_else(|| email.split('@').next().and_then(|l| slugify(l, '_')))
                    .unwrap_or_else(|| "user".to_string());
                let username = self.available_username(&db_tx, &base).await?;
                let created = users::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4().to_string()),
                    username: ActiveValue::Set(username),
                    email: ActiveValue::Set(email.to_string()),
                    external_subject: ActiveValue::Set(Some(subject.to_string())),
                    password_hash: ActiveValue::Set(None),
                    created_at: ActiveValue::Set(Utc::now()),
                }
                .insert(&db_tx)
                .await?;
                tracing::info!(user_id = %created.id, "created user from external identity");
                created
            };
            User::try_from(model)
        })
    }

    /// Inserts a synthetic user standing in for `display_name` inside a group.
    ///
    /// The username gets a short random suffix; the email lives in the
    /// reserved guest domain and is scoped to the group and the new id.
    pub(super) async fn create_guest_user(
        &self,
        db: &DatabaseTransaction,
        display_name: &str,
        group_id: Uuid,
    ) -> ResultEngine<User> {
        let id = Uuid::new_v4();
        let suffix = short_id(id);
        let scope = format!("{}-{suffix}", short_id(group_id));
        let model = users::ActiveModel {
            id: ActiveValue::Set(id.to_string()),
            username: ActiveValue::Set(format!("{display_name}-{suffix}")),
            email: ActiveValue::Set(guest_email(display_name, &scope)),
            external_subject: ActiveValue::Set(None),
            password_hash: ActiveValue::Set(None),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await?;
        User::try_from(model)
    }

    pub(super) async fn find_user_by_email(
        &self,
        db: &DatabaseTransaction,
        email: &str,
    ) -> ResultEngine<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    async fn find_user_by_username(
        &self,
        db: &DatabaseTransaction,
        username: &str,
    ) -> ResultEngine<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(db)
            .await
            .map_err(Into::into)
    }

    async fn find_user_by_subject(
        &self,
        db: &DatabaseTransaction,
        subject: &str,
    ) -> ResultEngine<Option<users::Model>> {
        users::Entity::find()
            .filter(users::Column::ExternalSubject.eq(subject))
            .one(db)
            .await
            .map_err(Into::into)
    }

    /// `base`, or `base` followed by the first free numeric suffix.
    async fn available_username(&self, db: &DatabaseTransaction, base: &str) -> ResultEngine<String> {
        if self.find_user_by_username(db, base).await?.is_none() {
            return Ok(base.to_string());
        }
        for n in 1..=MAX_USERNAME_SUFFIX {
            let candidate = format!("{base}{n}");
            if self.find_user_by_username(db, &candidate).await?.is_none() {
                return Ok(candidate);
            }
        }
        Ok(format!("{base}-{}", short_id(Uuid::new_v4())))
    }
}
