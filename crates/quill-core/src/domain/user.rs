use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

const MIN_PASSWORD_LEN: usize = 6;

/// User entity - represents a registered author or reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with generated ID and timestamps.
    ///
    /// `profile` is expected to have gone through [`NewUser::normalized`].
    pub fn new(profile: NewUser, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            username: profile.username,
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }

    /// Display fields used when a user is shown as a blog author.
    pub fn summary(&self) -> AuthorSummary {
        AuthorSummary {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Public author fields embedded in blog listings and reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// The verified identity performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
}

impl Actor {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Trim every field and lower-case the email.
    pub fn normalized(self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: normalize_email(&self.email),
            password: self.password,
        }
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("username", &self.username),
            ("email", &self.email),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::validation(format!("{field} is required")));
            }
        }

        if !self.email.contains('@') {
            return Err(DomainError::validation("Invalid email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(())
    }
}

/// Login input.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn normalized_email(&self) -> String {
        normalize_email(&self.email)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
