//! Application state - shared across all handlers.

use std::sync::Arc;

use quill_core::ports::{BlogRepository, PasswordService, TokenService, UserRepository};
use quill_core::services::{AccountService, BlogService};
use quill_infra::database::DatabaseConfig;
use quill_infra::{
    Argon2PasswordService, InMemoryBlogRepository, InMemoryUserRepository, JwtTokenService,
};

#[cfg(feature = "postgres")]
use quill_infra::DatabaseConnections;
#[cfg(feature = "postgres")]
use quill_infra::database::{PostgresBlogRepository, PostgresUserRepository};

#[cfg(feature = "rate-limit")]
use quill_core::ports::RateLimiter;
#[cfg(feature = "rate-limit")]
use quill_infra::InMemoryRateLimiter;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub blogs: Arc<BlogService>,
    pub tokens: Arc<dyn TokenService>,
    #[cfg(feature = "rate-limit")]
    pub auth_limiter: Arc<dyn RateLimiter>,
}

type Repositories = (Arc<dyn UserRepository>, Arc<dyn BlogRepository>);

impl AppState {
    /// Build the application state with appropriate implementations.
    ///
    /// Without a database configuration the repositories live in memory.
    pub async fn new(db_config: Option<&DatabaseConfig>) -> std::io::Result<Self> {
        let (users, blogs) = repositories(db_config).await?;
        let state = Self::from_parts(
            users,
            blogs,
            Arc::new(JwtTokenService::from_env()),
            Arc::new(Argon2PasswordService::new()),
        );

        tracing::info!("Application state initialized");
        Ok(state)
    }

    /// Wire the services over the given adapters.
    pub fn from_parts(
        users: Arc<dyn UserRepository>,
        blogs: Arc<dyn BlogRepository>,
        tokens: Arc<dyn TokenService>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        Self {
            accounts: Arc::new(AccountService::new(users.clone(), tokens.clone(), passwords)),
            blogs: Arc::new(BlogService::new(blogs, users)),
            tokens,
            #[cfg(feature = "rate-limit")]
            auth_limiter: Arc::new(InMemoryRateLimiter::from_env()),
        }
    }
}

fn in_memory() -> Repositories {
    (
        Arc::new(InMemoryUserRepository::new()),
        Arc::new(InMemoryBlogRepository::new()),
    )
}

#[cfg(feature = "postgres")]
async fn repositories(db_config: Option<&DatabaseConfig>) -> std::io::Result<Repositories> {
    let Some(config) = db_config else {
        tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
        return Ok(in_memory());
    };

    let connections = DatabaseConnections::init(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to connect to database");
        std::io::Error::other(e.to_string())
    })?;

    Ok((
        Arc::new(PostgresUserRepository::new(connections.main.clone())),
        Arc::new(PostgresBlogRepository::new(connections.main)),
    ))
}

#[cfg(not(feature = "postgres"))]
async fn repositories(db_config: Option<&DatabaseConfig>) -> std::io::Result<Repositories> {
    if db_config.is_some() {
        tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
    }
    tracing::info!("Running with in-memory repositories");
    Ok(in_memory())
}
