use std::sync::Arc;

use crate::domain::{Actor, Credentials, NewUser, User};
use crate::error::{DomainError, RepoError};
use crate::ports::{AuthError, PasswordService, TokenService, UserRepository};

const DEFAULT_ROLE: &str = "user";

/// A signed-in user together with a freshly issued token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub access_token: String,
    pub expires_in: u64,
}

/// Registration, login and profile lookup.
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<dyn TokenService>,
    passwords: Arc<dyn PasswordService>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        Self {
            users,
            tokens,
            passwords,
        }
    }

    pub async fn register(&self, profile: NewUser) -> Result<Session, DomainError> {
        let profile = profile.normalized();
        profile.validate()?;

        if self.users.find_by_email(&profile.email).await?.is_some() {
            return Err(DomainError::validation("Email already exists"));
        }
        if self.users.find_by_username(&profile.username).await?.is_some() {
            return Err(DomainError::validation("Username already taken"));
        }

        let password_hash = self.passwords.hash(&profile.password).map_err(internal)?;
        let user = self
            .users
            .create(User::new(profile, password_hash))
            .await
            .map_err(registration_conflict)?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        self.open_session(user)
    }

    pub async fn login(&self, credentials: Credentials) -> Result<Session, DomainError> {
        let email = credentials.normalized_email();
        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(invalid_credentials());
        };

        let valid = self
            .passwords
            .verify(&credentials.password, &user.password_hash)
            .map_err(internal)?;
        if !valid {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(invalid_credentials());
        }

        self.open_session(user)
    }

    /// The acting user's stored profile.
    pub async fn profile(&self, actor: &Actor) -> Result<User, DomainError> {
        self.users
            .find_by_id(actor.user_id)
            .await?
            .ok_or(DomainError::NotFound {
                entity_type: "User",
                id: actor.user_id,
            })
    }

    fn open_session(&self, user: User) -> Result<Session, DomainError> {
        let access_token = self
            .tokens
            .generate_token(user.id, &user.email, vec![DEFAULT_ROLE.to_string()])
            .map_err(internal)?;

        Ok(Session {
            user,
            access_token,
            expires_in: u64::try_from(self.tokens.expiration_seconds()).unwrap_or(0),
        })
    }
}

/// A unique index rejected the insert after the lookups passed, i.e. a
/// concurrent registration won. The raw storage message stays out of the body.
fn registration_conflict(err: RepoError) -> DomainError {
    match err {
        RepoError::Constraint(detail) => {
            tracing::debug!(%detail, "Registration lost a unique-index race");
            if detail.contains("username") {
                DomainError::validation("Username already taken")
            } else {
                DomainError::validation("Email already exists")
            }
        }
        other => other.into(),
    }
}

fn invalid_credentials() -> DomainError {
    DomainError::Unauthorized(AuthError::InvalidCredentials.to_string())
}

fn internal(err: AuthError) -> DomainError {
    DomainError::Internal(err.to_string())
}
