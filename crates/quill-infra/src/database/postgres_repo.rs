//! PostgreSQL repository implementations.

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Value,
};
use uuid::Uuid;

use quill_core::domain::{Blog, User};
use quill_core::error::RepoError;
use quill_core::ports::{BlogRepository, UserRepository};
use quill_core::query::{AuthorScope, BlogFilter, BlogSort, SortDirection, SortField};

use super::entity::blog::{self, Entity as BlogEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, db_error};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL blog repository.
pub type PostgresBlogRepository = PostgresBaseRepository<BlogEntity>;

/// Mask an email for logging to avoid PII in logs.
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        None => "***".to_string(),
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_error)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let result = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(db_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}

/// `%needle%` for LIKE, with the LIKE metacharacters escaped so user input
/// always matches literally. PostgreSQL's default LIKE escape is `\`.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// `LOWER(column) LIKE '%needle%'`. `needle` is already lower-cased.
fn lower_contains(column: blog::Column, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col((BlogEntity, column))))
        .like(LikeExpr::new(contains_pattern(needle)))
}

/// Any tag contains `needle` (lower-cased), case-insensitively.
fn any_tag_contains(needle: &str) -> SimpleExpr {
    Expr::cust_with_values(
        r#"EXISTS (SELECT 1 FROM unnest("blogs"."tags") AS tag WHERE LOWER(tag) LIKE $1)"#,
        [contains_pattern(needle)],
    )
}

/// Translate a [`BlogFilter`] into a WHERE condition.
pub(crate) fn blog_condition(filter: &BlogFilter) -> Condition {
    let mut cond = Condition::all();

    if let Some(state) = filter.state {
        cond = cond.add(blog::Column::State.eq(blog::State::from(state)));
    }

    match filter.author {
        AuthorScope::Anyone => {}
        AuthorScope::Only(id) => cond = cond.add(blog::Column::AuthorId.eq(id)),
        AuthorScope::Nobody => cond = cond.add(Expr::cust("FALSE")),
    }

    if let Some(title) = &filter.title {
        cond = cond.add(lower_contains(blog::Column::Title, title));
    }

    if !filter.tags.is_empty() {
        // text[] overlap: at least one requested tag is present
        cond = cond.add(Expr::cust_with_values(
            r#""blogs"."tags" && $1"#,
            [Value::from(filter.tags.clone())],
        ));
    }

    if let Some(search) = &filter.search {
        let mut any = Condition::any()
            .add(lower_contains(blog::Column::Title, &search.text))
            .add(any_tag_contains(&search.text));
        if let Some(author_id) = search.author_id {
            any = any.add(blog::Column::AuthorId.eq(author_id));
        }
        cond = cond.add(any);
    }

    cond
}

/// Apply the sort key plus the newest-first / id tie-breakers.
pub(crate) fn apply_sort(select: Select<BlogEntity>, sort: BlogSort) -> Select<BlogEntity> {
    let column = match sort.field {
        SortField::CreatedAt => blog::Column::CreatedAt,
        SortField::ReadCount => blog::Column::ReadCount,
        SortField::ReadingTime => blog::Column::ReadingTime,
    };
    let order = match sort.direction {
        SortDirection::Asc => Order::Asc,
        SortDirection::Desc => Order::Desc,
    };

    select
        .order_by(column, order)
        .order_by(blog::Column::CreatedAt, Order::Desc)
        .order_by(blog::Column::Id, Order::Asc)
}

#[async_trait]
impl BlogRepository for PostgresBlogRepository {
    async fn find_many(
        &self,
        filter: &BlogFilter,
        sort: BlogSort,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Blog>, RepoError> {
        let select = BlogEntity::find().filter(blog_condition(filter));

        let result = apply_sort(select, sort)
            .offset(skip)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filter: &BlogFilter) -> Result<u64, RepoError> {
        BlogEntity::find()
            .filter(blog_condition(filter))
            .count(&self.db)
            .await
            .map_err(db_error)
    }

    async fn increment_read_count(&self, id: Uuid) -> Result<Option<Blog>, RepoError> {
        // Single UPDATE ... RETURNING, so concurrent reads never lose an increment.
        let updated = BlogEntity::update_many()
            .col_expr(
                blog::Column::ReadCount,
                Expr::col(blog::Column::ReadCount).add(1),
            )
            .filter(blog::Column::Id.eq(id))
            .filter(blog::Column::State.eq(blog::State::Published))
            .exec_with_returning(&self.db)
            .await
            .map_err(db_error)?;

        Ok(updated.into_iter().next().map(Into::into))
    }
}
