//! End-to-end service behaviour over the in-memory repositories.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use quill_core::DomainError;
use quill_core::domain::{Actor, Blog, BlogChanges, BlogState, Credentials, NewBlog, NewUser, User};
use quill_core::error::RepoError;
use quill_core::ports::{
    AuthError, BaseRepository, BlogRepository, PasswordService, TokenService, UserRepository,
};
use quill_core::query::{BlogFilter, BlogSort, ListingParams, OwnListingParams};
use quill_core::services::{AccountService, BlogService};
use quill_infra::{InMemoryBlogRepository, InMemoryUserRepository, JwtConfig, JwtTokenService};

/// Reversible stand-in for Argon2 so tests stay fast.
struct PlainPasswords;

impl PasswordService for PlainPasswords {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        Ok(format!("plain:{password}"))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        Ok(hash.strip_prefix("plain:") == Some(password))
    }
}

struct App {
    accounts: AccountService,
    blogs: BlogService,
    blog_repo: Arc<InMemoryBlogRepository>,
    tokens: Arc<JwtTokenService>,
}

fn app() -> App {
    let users = Arc::new(InMemoryUserRepository::new());
    let blog_repo = Arc::new(InMemoryBlogRepository::new());
    let tokens = Arc::new(JwtTokenService::new(JwtConfig {
        secret: "integration-secret".to_string(),
        ..JwtConfig::default()
    }));

    App {
        accounts: AccountService::new(users.clone(), tokens.clone(), Arc::new(PlainPasswords)),
        blogs: BlogService::new(blog_repo.clone(), users),
        blog_repo,
        tokens,
    }
}

fn new_user(username: &str) -> NewUser {
    NewUser {
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: "password123".to_string(),
    }
}

fn post(title: &str, tags: &[&str]) -> NewBlog {
    NewBlog {
        title: title.to_string(),
        description: format!("About {title}"),
        body: "one two three".to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

impl App {
    async fn signup(&self, username: &str) -> Actor {
        let session = self.accounts.register(new_user(username)).await.unwrap();
        Actor::new(session.user.id)
    }

    async fn publish_new(&self, actor: &Actor, title: &str, tags: &[&str]) -> Uuid {
        let blog = self.blogs.create(actor, post(title, tags)).await.unwrap();
        self.blogs.publish(actor, blog.id).await.unwrap();
        blog.id
    }
}

fn listing() -> ListingParams {
    ListingParams::default()
}

#[tokio::test]
async fn test_register_then_login_issues_valid_token() {
    let app = app();
    let registered = app.accounts.register(new_user("ada")).await.unwrap();

    let session = app
        .accounts
        .login(Credentials {
            email: "ADA@example.com".to_string(),
            password: "password123".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(session.user.id, registered.user.id);
    assert_eq!(session.expires_in, 720 * 3600);
    let claims = app.tokens.validate_token(&session.access_token).unwrap();
    assert_eq!(claims.user_id, registered.user.id);
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = app();
    app.signup("ada").await;

    let err = app
        .accounts
        .login(Credentials {
            email: "ada@example.com".to_string(),
            password: "wrong-password".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized(_)));
}

#[tokio::test]
async fn test_duplicate_email_and_username_are_rejected() {
    let app = app();
    app.signup("ada").await;

    let mut same_email = new_user("grace");
    same_email.email = "Ada@Example.com".to_string();
    match app.accounts.register(same_email).await {
        Err(DomainError::Validation(msg)) => assert_eq!(msg, "Email already exists"),
        other => panic!("expected validation error, got {other:?}"),
    }

    let mut same_username = new_user("ada");
    same_username.email = "someone-else@example.com".to_string();
    match app.accounts.register(same_username).await {
        Err(DomainError::Validation(msg)) => assert_eq!(msg, "Username already taken"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_draft_is_hidden_until_published() {
    let app = app();
    let ada = app.signup("ada").await;
    let draft = app.blogs.create(&ada, post("Hidden", &[])).await.unwrap();

    assert_eq!(app.blogs.list_published(&listing()).await.unwrap().total, 0);
    assert!(matches!(
        app.blogs.read_published(draft.id).await,
        Err(DomainError::NotFound { .. })
    ));

    app.blogs.publish(&ada, draft.id).await.unwrap();
    let page = app.blogs.list_published(&listing()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].author.as_ref().unwrap().username, "ada");
}

#[tokio::test]
async fn test_second_publish_is_conflict() {
    let app = app();
    let ada = app.signup("ada").await;
    let id = app.publish_new(&ada, "Once", &[]).await;

    assert!(matches!(
        app.blogs.publish(&ada, id).await,
        Err(DomainError::Conflict(_))
    ));
    let stored = app.blog_repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.state, BlogState::Published);
}

#[tokio::test]
async fn test_other_users_are_forbidden() {
    let app = app();
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    let draft = app.blogs.create(&ada, post("Mine", &[])).await.unwrap();

    // An invalid payload still yields Forbidden.
    let invalid = BlogChanges {
        title: Some("   ".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        app.blogs.update(&bob, draft.id, invalid).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        app.blogs.delete(&bob, draft.id).await,
        Err(DomainError::Forbidden(_))
    ));
    assert!(matches!(
        app.blogs.publish(&bob, draft.id).await,
        Err(DomainError::Forbidden(_))
    ));

    app.blogs.publish(&ada, draft.id).await.unwrap();
    assert!(matches!(
        app.blogs.publish(&bob, draft.id).await,
        Err(DomainError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_pagination_over_twelve_posts() {
    let app = app();
    let ada = app.signup("ada").await;
    for i in 0..12 {
        app.publish_new(&ada, &format!("Post {i}"), &[]).await;
    }

    let params = ListingParams {
        page: Some("2".to_string()),
        limit: Some("5".to_string()),
        ..listing()
    };
    let page = app.blogs.list_published(&params).await.unwrap();
    assert_eq!(page.items.len(), 5);
    assert_eq!(page.total, 12);
    assert_eq!(page.pages, 3);
    assert_eq!(page.page, 2);

    let past_end = ListingParams {
        page: Some("4".to_string()),
        limit: Some("5".to_string()),
        ..listing()
    };
    let page = app.blogs.list_published(&past_end).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 12);
}

#[tokio::test]
async fn test_invalid_paging_is_validation_error() {
    let app = app();
    for (page, limit) in [("0", "5"), ("1", "-3"), ("abc", "5")] {
        let params = ListingParams {
            page: Some(page.to_string()),
            limit: Some(limit.to_string()),
            ..listing()
        };
        assert!(matches!(
            app.blogs.list_published(&params).await,
            Err(DomainError::Validation(_))
        ));
    }
}

#[tokio::test]
async fn test_each_read_increments_once() {
    let app = app();
    let ada = app.signup("ada").await;
    let id = app.publish_new(&ada, "Popular", &[]).await;

    assert_eq!(app.blogs.read_published(id).await.unwrap().blog.read_count, 1);
    let view = app.blogs.read_published(id).await.unwrap();
    assert_eq!(view.blog.read_count, 2);
    assert_eq!(view.author.unwrap().username, "ada");
}

#[tokio::test]
async fn test_concurrent_reads_are_all_counted() {
    let app = Arc::new(app());
    let ada = app.signup("ada").await;
    let id = app.publish_new(&ada, "Hot", &[]).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { app.blogs.read_published(id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = app.blog_repo.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.read_count, 20);
}

#[tokio::test]
async fn test_unknown_sort_field_falls_back_to_newest_first() {
    let app = app();
    let ada = app.signup("ada").await;
    let first = app.publish_new(&ada, "First", &[]).await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.publish_new(&ada, "Second", &[]).await;

    let params = ListingParams {
        order_by: Some("popularity".to_string()),
        ..listing()
    };
    let page = app.blogs.list_published(&params).await.unwrap();
    let ids: Vec<_> = page.items.iter().map(|v| v.blog.id).collect();
    assert_eq!(ids, vec![second, first]);
}

#[tokio::test]
async fn test_sort_by_read_count() {
    let app = app();
    let ada = app.signup("ada").await;
    let quiet = app.publish_new(&ada, "Quiet", &[]).await;
    let loud = app.publish_new(&ada, "Loud", &[]).await;
    for _ in 0..3 {
        app.blogs.read_published(loud).await.unwrap();
    }

    let params = ListingParams {
        order_by: Some("read_count".to_string()),
        order: Some("desc".to_string()),
        ..listing()
    };
    let page = app.blogs.list_published(&params).await.unwrap();
    assert_eq!(page.items[0].blog.id, loud);
    assert_eq!(page.items[1].blog.id, quiet);
}

#[tokio::test]
async fn test_tag_filter_matches_any_listed_tag() {
    let app = app();
    let ada = app.signup("ada").await;
    let go = app.publish_new(&ada, "Go", &["go"]).await;
    let rust = app.publish_new(&ada, "Rust", &["rust", "systems"]).await;
    app.publish_new(&ada, "Python", &["python"]).await;

    let params = ListingParams {
        tags: Some("go,rust".to_string()),
        ..listing()
    };
    let page = app.blogs.list_published(&params).await.unwrap();
    let mut ids: Vec<_> = page.items.iter().map(|v| v.blog.id).collect();
    ids.sort();
    let mut expected = vec![go, rust];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_author_filter_and_search_resolve_usernames() {
    let app = app();
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    let ada_post = app.publish_new(&ada, "Engines", &[]).await;
    let bob_post = app.publish_new(&bob, "Analytical notes", &[]).await;

    let by_author = ListingParams {
        author: Some("ada".to_string()),
        ..listing()
    };
    let page = app.blogs.list_published(&by_author).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].blog.id, ada_post);

    let unknown_author = ListingParams {
        author: Some("nobody".to_string()),
        ..listing()
    };
    assert_eq!(app.blogs.list_published(&unknown_author).await.unwrap().total, 0);

    // Search matches the author's username or any title.
    let search = ListingParams {
        search: Some("bob".to_string()),
        ..listing()
    };
    let page = app.blogs.list_published(&search).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].blog.id, bob_post);

    let search = ListingParams {
        search: Some("ENGINE".to_string()),
        ..listing()
    };
    let page = app.blogs.list_published(&search).await.unwrap();
    assert_eq!(page.items[0].blog.id, ada_post);
}

#[tokio::test]
async fn test_own_listing_filters_by_state() {
    let app = app();
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    app.publish_new(&ada, "Live", &[]).await;
    app.blogs.create(&ada, post("Draft", &[])).await.unwrap();
    app.blogs.create(&bob, post("Not mine", &[])).await.unwrap();

    let all = app
        .blogs
        .list_own(&ada, &OwnListingParams::default())
        .await
        .unwrap();
    assert_eq!(all.total, 2);
    assert_eq!(all.limit, 10);

    let drafts = OwnListingParams {
        state: Some("draft".to_string()),
        ..Default::default()
    };
    let page = app.blogs.list_own(&ada, &drafts).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].title, "Draft");

    let bogus = OwnListingParams {
        state: Some("archived".to_string()),
        ..Default::default()
    };
    assert!(matches!(
        app.blogs.list_own(&ada, &bogus).await,
        Err(DomainError::Validation(_))
    ));
}

#[tokio::test]
async fn test_update_recomputes_reading_time_and_keeps_counters() {
    let app = app();
    let ada = app.signup("ada").await;
    let id = app.publish_new(&ada, "Long read", &[]).await;
    app.blogs.read_published(id).await.unwrap();

    let changes = BlogChanges {
        body: Some("word ".repeat(450)),
        tags: Some(vec!["rust".to_string()]),
        ..Default::default()
    };
    let updated = app.blogs.update(&ada, id, changes).await.unwrap();

    assert_eq!(updated.reading_time, 3);
    assert_eq!(updated.read_count, 1);
    assert_eq!(updated.state, BlogState::Published);
    assert_eq!(updated.tags, vec!["rust".to_string()]);
    assert_eq!(updated.title, "Long read");
}

#[tokio::test]
async fn test_delete_removes_post() {
    let app = app();
    let ada = app.signup("ada").await;
    let id = app.publish_new(&ada, "Gone soon", &[]).await;

    app.blogs.delete(&ada, id).await.unwrap();
    assert!(matches!(
        app.blogs.read_published(id).await,
        Err(DomainError::NotFound { .. })
    ));
    assert!(matches!(
        app.blogs.delete(&ada, id).await,
        Err(DomainError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_login_with_argon2_hashes() {
    let users = Arc::new(InMemoryUserRepository::new());
    let accounts = AccountService::new(
        users.clone(),
        Arc::new(JwtTokenService::new(JwtConfig {
            secret: "argon2-secret".to_string(),
            ..JwtConfig::default()
        })),
        Arc::new(quill_infra::Argon2PasswordService::new()),
    );

    let registered = accounts.register(new_user("ada")).await.unwrap();
    let stored = users.find_by_id(registered.user.id).await.unwrap().unwrap();
    assert!(stored.password_hash.starts_with("$argon2"));

    let session = accounts
        .login(Credentials {
            email: "ada@example.com".to_string(),
            password: "password123".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(session.user.id, registered.user.id);
}

/// Blog store where one reader always lands between an author's fetch and save.
struct ReadDuringFetch {
    inner: Arc<InMemoryBlogRepository>,
}

#[async_trait]
impl BaseRepository<Blog, Uuid> for ReadDuringFetch {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        let snapshot = self.inner.find_by_id(id).await?;
        self.inner.increment_read_count(id).await?;
        Ok(snapshot)
    }

    async fn create(&self, blog: Blog) -> Result<Blog, RepoError> {
        self.inner.create(blog).await
    }

    async fn save(&self, blog: Blog) -> Result<Blog, RepoError> {
        self.inner.save(blog).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.inner.delete(id).await
    }
}

#[async_trait]
impl BlogRepository for ReadDuringFetch {
    async fn find_many(
        &self,
        filter: &BlogFilter,
        sort: BlogSort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Blog>, RepoError> {
        self.inner.find_many(filter, sort, skip, limit).await
    }

    async fn count(&self, filter: &BlogFilter) -> Result<u64, RepoError> {
        self.inner.count(filter).await
    }

    async fn increment_read_count(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        self.inner.increment_read_count(id).await
    }
}

#[tokio::test]
async fn test_update_keeps_reads_that_land_after_fetch() {
    let users = Arc::new(InMemoryUserRepository::new());
    let inner = Arc::new(InMemoryBlogRepository::new());
    let tokens = Arc::new(JwtTokenService::new(JwtConfig::default()));
    let accounts = AccountService::new(users.clone(), tokens, Arc::new(PlainPasswords));
    let blogs = BlogService::new(Arc::new(ReadDuringFetch { inner: inner.clone() }), users);

    let session = accounts.register(new_user("ada")).await.unwrap();
    let actor = Actor::new(session.user.id);
    let id = blogs.create(&actor, post("Busy", &[])).await.unwrap().id;
    blogs.publish(&actor, id).await.unwrap();
    for _ in 0..3 {
        blogs.read_published(id).await.unwrap();
    }

    let changes = BlogChanges {
        title: Some("Renamed".to_string()),
        ..BlogChanges::default()
    };
    let updated = blogs.update(&actor, id, changes).await.unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.read_count, 4);
    assert_eq!(inner.find_by_id(id).await.unwrap().unwrap().read_count, 4);
}

/// User store whose lookups miss, so the unique index is what rejects the insert.
struct LostRegistrationRace {
    detail: &'static str,
}

#[async_trait]
impl BaseRepository<User, Uuid> for LostRegistrationRace {
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(None)
    }

    async fn create(&self, _user: User) -> Result<User, RepoError> {
        Err(RepoError::Constraint(self.detail.to_string()))
    }

    async fn save(&self, _user: User) -> Result<User, RepoError> {
        Err(RepoError::NotFound)
    }

    async fn delete(&self, _id: Uuid) -> Result<(), RepoError> {
        Err(RepoError::NotFound)
    }
}

#[async_trait]
impl UserRepository for LostRegistrationRace {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, RepoError> {
        Ok(None)
    }

    async fn find_by_username(&self, _username: &str) -> Result<Option<User>, RepoError> {
        Ok(None)
    }

    async fn find_by_ids(&self, _ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_unique_index_race_uses_fixed_messages() {
    let cases = [
        (
            r#"duplicate key value violates unique constraint "users_username_key""#,
            "Username already taken",
        ),
        (
            r#"duplicate key value violates unique constraint "users_email_key""#,
            "Email already exists",
        ),
    ];

    for (detail, expected) in cases {
        let accounts = AccountService::new(
            Arc::new(LostRegistrationRace { detail }),
            Arc::new(JwtTokenService::new(JwtConfig::default())),
            Arc::new(PlainPasswords),
        );

        match accounts.register(new_user("ada")).await {
            Err(DomainError::Validation(msg)) => assert_eq!(msg, expected),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
