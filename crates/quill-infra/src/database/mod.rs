//! Repositories and database connection management.

mod connections;
mod memory;

#[cfg(feature = "postgres")]
mod postgres_base;
#[cfg(feature = "postgres")]
pub mod postgres_repo;

#[cfg(feature = "postgres")]
pub mod entity;

pub use connections::DatabaseConfig;
#[cfg(feature = "postgres")]
pub use connections::DatabaseConnections;
pub use memory::{InMemoryBlogRepository, InMemoryUserRepository};

#[cfg(feature = "postgres")]
pub use postgres_repo::{PostgresBlogRepository, PostgresUserRepository};
