//! In-memory repositories - used when no database is configured, and in tests.
//!
//! Queries are evaluated with the same [`BlogFilter::matches`] and
//! [`BlogSort::compare`] that define the listing semantics, so results match
//! the PostgreSQL repositories.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Blog, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, BlogRepository, UserRepository};
use quill_core::query::{BlogFilter, BlogSort};

/// In-memory user store. Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryUserRepository {
    store: RwLock<HashMap<Uuid, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut store = self.store.write().await;

        // Mirror the unique indexes on email and username.
        let taken = store
            .values()
            .any(|u| u.id == user.id || u.email == user.email || u.username == user.username);
        if taken {
            return Err(RepoError::Constraint("User already exists".to_string()));
        }

        store.insert(user.id, user.clone());
        Ok(user)
    }

    async fn save(&self, user: User) -> Result<User, RepoError> {
        let mut store = self.store.write().await;
        let slot = store.get_mut(&user.id).ok_or(RepoError::NotFound)?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.store
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let store = self.store.read().await;
        Ok(store.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let store = self.store.read().await;
        Ok(store.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let store = self.store.read().await;
        Ok(ids.iter().filter_map(|id| store.get(id).cloned()).collect())
    }
}

/// In-memory blog store. Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryBlogRepository {
    store: RwLock<HashMap<Uuid, Blog>>,
}

impl InMemoryBlogRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BaseRepository<Blog, Uuid> for InMemoryBlogRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        Ok(self.store.read().await.get(&id).cloned())
    }

    async fn create(&self, blog: Blog) -> Result<Blog, RepoError> {
        let mut store = self.store.write().await;
        if store.contains_key(&blog.id) {
            return Err(RepoError::Constraint("Blog already exists".to_string()));
        }
        store.insert(blog.id, blog.clone());
        Ok(blog)
    }

    async fn save(&self, blog: Blog) -> Result<Blog, RepoError> {
        let mut store = self.store.write().await;
        let slot = store.get_mut(&blog.id).ok_or(RepoError::NotFound)?;
        // The stored counter may have moved since `blog` was fetched.
        let read_count = slot.read_count;
        *slot = Blog { read_count, ..blog };
        Ok(slot.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.store
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}

#[async_trait]
impl BlogRepository for InMemoryBlogRepository {
    async fn find_many(
        &self,
        filter: &BlogFilter,
        sort: BlogSort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Blog>, RepoError> {
        let store = self.store.read().await;

        let mut matching: Vec<&Blog> = store.values().filter(|b| filter.matches(b)).collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        let skip = usize::try_from(skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &BlogFilter) -> Result<u64, RepoError> {
        let store = self.store.read().await;
        Ok(store.values().filter(|b| filter.matches(b)).count() as u64)
    }

    async fn increment_read_count(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        // The write lock makes read-and-increment one step.
        let mut store = self.store.write().await;
        Ok(store.get_mut(&id).filter(|b| b.is_published()).map(|blog| {
            blog.read_count += 1;
            blog.clone()
        }))
    }
}
