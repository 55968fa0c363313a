use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::domain::{Actor, AuthorSummary, Blog, BlogChanges, NewBlog};
use crate::error::{DomainError, RepoError};
use crate::policy::{self, BlogAction};
use crate::ports::{BlogRepository, UserRepository};
use crate::query::{self, BlogQuery, ListingParams, OwnListingParams, Page, PublicListing};

/// A blog with its author's display fields populated.
#[derive(Debug, Clone, Serialize)]
pub struct BlogView {
    pub blog: Blog,
    pub author: Option<AuthorSummary>,
}

/// Every blog use case: listing, reading and author-only mutations.
pub struct BlogService {
    blogs: Arc<dyn BlogRepository>,
    users: Arc<dyn UserRepository>,
}

impl BlogService {
    pub fn new(blogs: Arc<dyn BlogRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { blogs, users }
    }

    /// Create a draft owned by `actor`.
    pub async fn create(&self, actor: &Actor, new: NewBlog) -> Result<Blog, DomainError> {
        let blog = self.blogs.create(Blog::draft(actor.user_id, new)?).await?;
        tracing::info!(blog_id = %blog.id, author = %actor.user_id, "Blog drafted");
        Ok(blog)
    }

    /// Public listing: published posts only, with authors populated.
    pub async fn list_published(
        &self,
        params: &ListingParams,
    ) -> Result<Page<BlogView>, DomainError> {
        let listing = PublicListing::parse(params)?;

        let author_id = match listing.author_username() {
            Some(username) => self.resolve_username(username).await?,
            None => None,
        };
        let search_author_id = match listing.search_text() {
            Some(text) => self.resolve_username(text).await?,
            None => None,
        };

        let page = self.run(&listing.into_query(author_id, search_author_id)).await?;
        let authors = self.authors_of(&page.items).await?;

        Ok(page.map(|blog| BlogView {
            author: authors.get(&blog.author_id).cloned(),
            blog,
        }))
    }

    /// The acting author's own posts in any state.
    pub async fn list_own(
        &self,
        actor: &Actor,
        params: &OwnListingParams,
    ) -> Result<Page<Blog>, DomainError> {
        self.run(&query::own_listing(actor, params)?).await
    }

    /// Fetch a published post and count the read.
    pub async fn read_published(&self, id: Uuid) -> Result<BlogView, DomainError> {
        let blog = policy::require_blog(self.blogs.increment_read_count(id).await?, id)?;
        let author = self
            .users
            .find_by_id(blog.author_id)
            .await?
            .map(|user| user.summary());

        Ok(BlogView { blog, author })
    }

    pub async fn publish(&self, actor: &Actor, id: Uuid) -> Result<Blog, DomainError> {
        let mut blog = self.fetch(id).await?;
        policy::authorize_publish(actor, &blog)?;

        blog.publish()?;
        let blog = self.persist(blog).await?;
        tracing::info!(blog_id = %blog.id, "Blog published");
        Ok(blog)
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        changes: BlogChanges,
    ) -> Result<Blog, DomainError> {
        let mut blog = self.fetch(id).await?;
        policy::authorize(actor, &blog, BlogAction::Update)?;

        if changes.is_empty() {
            return Ok(blog);
        }
        blog.apply(changes)?;
        self.persist(blog).await
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), DomainError> {
        let blog = self.fetch(id).await?;
        policy::authorize(actor, &blog, BlogAction::Delete)?;

        self.blogs
            .delete(blog.id)
            .await
            .map_err(blog_repo_error(id))?;
        tracing::info!(blog_id = %id, "Blog deleted");
        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> Result<Blog, DomainError> {
        policy::require_blog(self.blogs.find_by_id(id).await?, id)
    }

    async fn persist(&self, blog: Blog) -> Result<Blog, DomainError> {
        let id = blog.id;
        self.blogs.save(blog).await.map_err(blog_repo_error(id))
    }

    async fn run(&self, query: &BlogQuery) -> Result<Page<Blog>, DomainError> {
        if query.filter.matches_nothing() {
            return Ok(Page::empty(query.page));
        }

        let total = self.blogs.count(&query.filter).await?;
        let items = if total > query.page.skip() {
            self.blogs
                .find_many(
                    &query.filter,
                    query.sort,
                    query.page.skip(),
                    query.page.limit(),
                )
                .await?
        } else {
            Vec::new()
        };

        Ok(Page::new(items, total, query.page))
    }

    async fn resolve_username(&self, username: &str) -> Result<Option<Uuid>, DomainError> {
        Ok(self
            .users
            .find_by_username(username)
            .await?
            .map(|user| user.id))
    }

    async fn authors_of(
        &self,
        blogs: &[Blog],
    ) -> Result<HashMap<Uuid, AuthorSummary>, DomainError> {
        let mut ids: Vec<Uuid> = blogs.iter().map(|b| b.author_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let users = self.users.find_by_ids(&ids).await?;
        Ok(users.iter().map(|u| (u.id, u.summary())).collect())
    }
}

/// A row vanishing between lookup and write is reported as the blog being gone.
fn blog_repo_error(id: Uuid) -> impl FnOnce(RepoError) -> DomainError {
    move |err| match err {
        RepoError::NotFound => DomainError::blog_not_found(id),
        other => other.into(),
    }
}
