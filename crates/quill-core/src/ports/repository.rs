use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Blog, User};
use crate::error::RepoError;
use crate::query::{BlogFilter, BlogSort};

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn create(&self, entity: T) -> Result<T, RepoError>;

    /// Persist changes to an existing entity.
    async fn save(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    /// Find a user by their (normalized) email address.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Find a user by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Batch lookup used to populate blog authors. Unknown ids are skipped.
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Blog repository. Applies whatever filter, sort and window it is handed;
/// building those is the query engine's job.
///
/// `save` never writes `read_count`; the stored value wins over whatever the
/// caller fetched. Only `increment_read_count` changes it.
#[async_trait]
pub trait BlogRepository: BaseRepository<Blog, Uuid> {
    /// Matching blogs ordered by `sort`, skipping `skip` and returning at most `limit`.
    async fn find_many(
        &self,
        filter: &BlogFilter,
        sort: BlogSort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Blog>, RepoError>;

    /// Number of blogs matching `filter`.
    async fn count(&self, filter: &BlogFilter) -> Result<u64, RepoError>;

    /// Atomically add one to the read count of a published blog and return
    /// the updated record. `None` if no published blog has this id.
    async fn increment_read_count(&self, id: Uuid) -> Result<Option<Blog>, RepoError>;
}
