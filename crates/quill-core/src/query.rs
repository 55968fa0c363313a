//! Blog query engine.
//!
//! Turns untrusted listing parameters into a [`BlogQuery`]: a filter, a sort
//! order and a page window. Repositories execute these as-is; the same
//! [`BlogFilter::matches`] and [`BlogSort::compare`] define the semantics for
//! backends that evaluate queries in process.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Actor, Blog, BlogState, normalize_tags};
use crate::error::DomainError;

pub const DEFAULT_PAGE: u64 = 1;
/// Page size of the public listing when none is given.
pub const DEFAULT_PUBLIC_LIMIT: u64 = 20;
/// Page size of an author's own listing when none is given.
pub const DEFAULT_OWN_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// A validated page window. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u64,
    limit: u64,
}

impl PageRequest {
    /// Build a window from already-numeric values. `limit` is capped at [`MAX_LIMIT`].
    pub fn new(page: u64, limit: u64) -> Result<Self, DomainError> {
        if page == 0 {
            return Err(DomainError::validation("page must be a positive integer"));
        }
        if limit == 0 {
            return Err(DomainError::validation("limit must be a positive integer"));
        }
        Ok(Self {
            page,
            limit: limit.min(MAX_LIMIT),
        })
    }

    /// Parse raw query-string values. Absent or blank values take the defaults.
    pub fn parse(
        page: Option<&str>,
        limit: Option<&str>,
        default_limit: u64,
    ) -> Result<Self, DomainError> {
        let page = parse_positive("page", page)?.unwrap_or(DEFAULT_PAGE);
        let limit = parse_positive("limit", limit)?.unwrap_or(default_limit);
        Self::new(page, limit)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Number of pages needed for `total` results.
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(self.limit)
    }
}

fn parse_positive(name: &str, raw: Option<&str>) -> Result<Option<u64>, DomainError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(DomainError::validation(format!(
            "{name} must be a positive integer, got '{raw}'"
        ))),
    }
}

/// One page of results plus the totals needed to render a pager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page(),
            limit: request.limit(),
            pages: request.page_count(total),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(Vec::new(), 0, request)
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            limit: self.limit,
            pages: self.pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    ReadCount,
    ReadingTime,
}

impl SortField {
    /// `None` for anything outside the sortable set.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "created_at" | "timestamp" => Some(SortField::CreatedAt),
            "read_count" => Some(SortField::ReadCount),
            "reading_time" => Some(SortField::ReadingTime),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// Only an explicit `asc` sorts ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            SortDirection::Asc
        } else {
            SortDirection::Desc
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlogSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for BlogSort {
    fn default() -> Self {
        Self::newest_first()
    }
}

impl BlogSort {
    pub fn newest_first() -> Self {
        Self {
            field: SortField::CreatedAt,
            direction: SortDirection::Desc,
        }
    }

    /// Never fails: an unknown field means newest first, whatever the direction.
    pub fn parse(field: Option<&str>, direction: Option<&str>) -> Self {
        let direction = direction.map_or(SortDirection::Desc, SortDirection::parse);
        match field.map(str::trim).filter(|f| !f.is_empty()) {
            None => Self {
                field: SortField::CreatedAt,
                direction,
            },
            Some(raw) => match SortField::parse(raw) {
                Some(field) => Self { field, direction },
                None => Self::newest_first(),
            },
        }
    }

    /// Total order over blogs: the sort key first, then newest first, then id.
    pub fn compare(&self, a: &Blog, b: &Blog) -> Ordering {
        let primary = match self.field {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::ReadCount => a.read_count.cmp(&b.read_count),
            SortField::ReadingTime => a.reading_time.cmp(&b.reading_time),
        };
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Which authors a query is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorScope {
    #[default]
    Anyone,
    Only(Uuid),
    /// An author was requested but could not be resolved.
    Nobody,
}

/// Free-text search: matches title or any tag by substring, or the resolved author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    /// Lower-cased needle.
    pub text: String,
    pub author_id: Option<Uuid>,
}

impl SearchTerm {
    pub fn matches(&self, blog: &Blog) -> bool {
        contains_ci(&blog.title, &self.text)
            || blog.tags.iter().any(|tag| contains_ci(tag, &self.text))
            || self.author_id.is_some_and(|id| blog.author_id == id)
    }
}

/// Conjunction of every constraint a listing applies.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlogFilter {
    pub state: Option<BlogState>,
    pub author: AuthorScope,
    /// Lower-cased title substring.
    pub title: Option<String>,
    /// Blog must carry at least one of these tags. Empty means no constraint.
    pub tags: Vec<String>,
    pub search: Option<SearchTerm>,
}

impl BlogFilter {
    pub fn published() -> Self {
        Self {
            state: Some(BlogState::Published),
            ..Default::default()
        }
    }

    pub fn authored_by(user_id: Uuid) -> Self {
        Self {
            author: AuthorScope::Only(user_id),
            ..Default::default()
        }
    }

    /// True when the filter can be answered without asking storage.
    pub fn matches_nothing(&self) -> bool {
        self.author == AuthorScope::Nobody
    }

    pub fn matches(&self, blog: &Blog) -> bool {
        if self.state.is_some_and(|state| blog.state != state) {
            return false;
        }
        match self.author {
            AuthorScope::Anyone => {}
            AuthorScope::Only(id) if blog.author_id == id => {}
            _ => return false,
        }
        if let Some(title) = &self.title {
            if !contains_ci(&blog.title, title) {
                return false;
            }
        }
        if !self.tags.is_empty() && !blog.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        self.search.as_ref().is_none_or(|search| search.matches(blog))
    }
}

/// `needle` must already be lower-cased.
fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// A complete repository query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogQuery {
    pub filter: BlogFilter,
    pub sort: BlogSort,
    pub page: PageRequest,
}

/// Raw parameters of the public listing, straight from the query string.
#[derive(Debug, Clone, Default)]
pub struct ListingParams {
    pub title: Option<String>,
    pub author: Option<String>,
    pub tags: Option<String>,
    pub search: Option<String>,
    pub order_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Raw parameters of an author's own listing.
#[derive(Debug, Clone, Default)]
pub struct OwnListingParams {
    pub state: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// A parsed public listing whose usernames have not been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicListing {
    title: Option<String>,
    author: Option<String>,
    tags: Vec<String>,
    search: Option<String>,
    sort: BlogSort,
    page: PageRequest,
}

impl PublicListing {
    pub fn parse(params: &ListingParams) -> Result<Self, DomainError> {
        let page = PageRequest::parse(
            params.page.as_deref(),
            params.limit.as_deref(),
            DEFAULT_PUBLIC_LIMIT,
        )?;
        let tags = params
            .tags
            .as_deref()
            .map(|raw| normalize_tags(raw.split(',')))
            .unwrap_or_default();

        Ok(Self {
            title: non_blank(params.title.as_deref()).map(str::to_lowercase),
            author: non_blank(params.author.as_deref()).map(str::to_string),
            tags,
            search: non_blank(params.search.as_deref()).map(str::to_string),
            sort: BlogSort::parse(params.order_by.as_deref(), params.order.as_deref()),
            page,
        })
    }

    /// Username given in the `author` parameter, if any.
    pub fn author_username(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// Free-text search term. Also looked up as a username.
    pub fn search_text(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Finish the query once usernames have been resolved to ids.
    ///
    /// `author_id` is the resolution of [`author_username`](Self::author_username),
    /// `search_author_id` the resolution of [`search_text`](Self::search_text).
    pub fn into_query(self, author_id: Option<Uuid>, search_author_id: Option<Uuid>) -> BlogQuery {
        let author = match (&self.author, author_id) {
            (None, _) => AuthorScope::Anyone,
            (Some(_), Some(id)) => AuthorScope::Only(id),
            (Some(_), None) => AuthorScope::Nobody,
        };
        let search = self.search.map(|text| SearchTerm {
            text: text.to_lowercase(),
            author_id: search_author_id,
        });

        BlogQuery {
            filter: BlogFilter {
                state: Some(BlogState::Published),
                author,
                title: self.title,
                tags: self.tags,
                search,
            },
            sort: self.sort,
            page: self.page,
        }
    }
}

/// Build the query for `actor`'s own posts, newest first.
pub fn own_listing(actor: &Actor, params: &OwnListingParams) -> Result<BlogQuery, DomainError> {
    let page = PageRequest::parse(
        params.page.as_deref(),
        params.limit.as_deref(),
        DEFAULT_OWN_LIMIT,
    )?;
    let state = non_blank(params.state.as_deref())
        .map(str::parse::<BlogState>)
        .transpose()?;

    Ok(BlogQuery {
        filter: BlogFilter {
            state,
            ..BlogFilter::authored_by(actor.user_id)
        },
        sort: BlogSort::newest_first(),
        page,
    })
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewBlog;
    use chrono::Duration;

    fn blog(title: &str, tags: &[&str]) -> Blog {
        let mut blog = Blog::draft(
            Uuid::new_v4(),
            NewBlog {
                title: title.to_string(),
                description: "desc".to_string(),
                body: "body text".to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        )
        .unwrap();
        blog.state = BlogState::Published;
        blog
    }

    fn params() -> ListingParams {
        ListingParams::default()
    }

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::parse(None, None, DEFAULT_PUBLIC_LIMIT).unwrap();
        assert_eq!(page.page(), 1);
        assert_eq!(page.limit(), 20);
        assert_eq!(page.skip(), 0);
    }

    #[test]
    fn test_page_request_skip_and_page_count() {
        let page = PageRequest::parse(Some("2"), Some("5"), DEFAULT_PUBLIC_LIMIT).unwrap();
        assert_eq!(page.skip(), 5);
        assert_eq!(page.page_count(12), 3);
        assert_eq!(page.page_count(0), 0);
        assert_eq!(page.page_count(10), 2);
    }

    #[test]
    fn test_page_request_rejects_non_positive_and_garbage() {
        for raw in ["0", "-1", "abc", "1.5"] {
            let err = PageRequest::parse(Some(raw), None, 20).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "page={raw}");
            let err = PageRequest::parse(None, Some(raw), 20).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "limit={raw}");
        }
    }

    #[test]
    fn test_page_request_caps_limit() {
        let page = PageRequest::parse(None, Some("5000"), 20).unwrap();
        assert_eq!(page.limit(), MAX_LIMIT);
    }

    #[test]
    fn test_page_request_blank_is_default() {
        let page = PageRequest::parse(Some(" "), Some(""), 10).unwrap();
        assert_eq!(page, PageRequest::new(1, 10).unwrap());
    }

    #[test]
    fn test_sort_unknown_field_falls_back_to_newest_first() {
        let sort = BlogSort::parse(Some("title"), Some("asc"));
        assert_eq!(sort, BlogSort::newest_first());
    }

    #[test]
    fn test_sort_known_fields_and_aliases() {
        let sort = BlogSort::parse(Some("read_count"), Some("asc"));
        assert_eq!(sort.field, SortField::ReadCount);
        assert_eq!(sort.direction, SortDirection::Asc);

        let sort = BlogSort::parse(Some("timestamp"), None);
        assert_eq!(sort.field, SortField::CreatedAt);
        assert_eq!(sort.direction, SortDirection::Desc);

        let sort = BlogSort::parse(None, Some("asc"));
        assert_eq!(sort.field, SortField::CreatedAt);
        assert_eq!(sort.direction, SortDirection::Asc);

        let sort = BlogSort::parse(Some("reading_time"), Some("sideways"));
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn test_sort_compare_orders_by_key_then_newest() {
        let mut a = blog("a", &[]);
        let mut b = blog("b", &[]);
        a.read_count = 5;
        b.read_count = 9;
        b.created_at = a.created_at + Duration::seconds(1);

        let desc = BlogSort::parse(Some("read_count"), Some("desc"));
        assert_eq!(desc.compare(&a, &b), Ordering::Greater);

        let asc = BlogSort::parse(Some("read_count"), Some("asc"));
        assert_eq!(asc.compare(&a, &b), Ordering::Less);

        b.read_count = 5;
        assert_eq!(asc.compare(&a, &b), Ordering::Greater, "tie breaks newest first");
    }

    #[test]
    fn test_filter_excludes_drafts() {
        let mut draft = blog("hidden", &[]);
        draft.state = BlogState::Draft;
        assert!(!BlogFilter::published().matches(&draft));
        assert!(BlogFilter::published().matches(&blog("shown", &[])));
    }

    #[test]
    fn test_filter_title_is_case_insensitive_literal() {
        let mut p = params();
        p.title = Some("RUST".to_string());
        let query = PublicListing::parse(&p).unwrap().into_query(None, None);

        assert!(query.filter.matches(&blog("Learning Rust", &[])));
        assert!(!query.filter.matches(&blog("Learning Go", &[])));

        p.title = Some(".*".to_string());
        let query = PublicListing::parse(&p).unwrap().into_query(None, None);
        assert!(!query.filter.matches(&blog("Learning Go", &[])));
    }

    #[test]
    fn test_filter_tags_match_any() {
        let mut p = params();
        p.tags = Some("go, rust,,".to_string());
        let query = PublicListing::parse(&p).unwrap().into_query(None, None);

        assert_eq!(query.filter.tags, vec!["go".to_string(), "rust".to_string()]);
        assert!(query.filter.matches(&blog("x", &["rust", "wasm"])));
        assert!(query.filter.matches(&blog("x", &["go"])));
        assert!(!query.filter.matches(&blog("x", &["python"])));
        assert!(!query.filter.matches(&blog("x", &[])));
    }

    #[test]
    fn test_unresolved_author_matches_nothing() {
        let mut p = params();
        p.author = Some("ghost".to_string());
        let listing = PublicListing::parse(&p).unwrap();
        assert_eq!(listing.author_username(), Some("ghost"));

        let query = listing.into_query(None, None);
        assert!(query.filter.matches_nothing());
        assert!(!query.filter.matches(&blog("x", &[])));
    }

    #[test]
    fn test_resolved_author_scopes_results() {
        let post = blog("x", &[]);
        let mut p = params();
        p.author = Some("ada".to_string());

        let query = PublicListing::parse(&p)
            .unwrap()
            .into_query(Some(post.author_id), None);
        assert_eq!(query.filter.author, AuthorScope::Only(post.author_id));
        assert!(query.filter.matches(&post));
        assert!(!query.filter.matches(&blog("y", &[])));
    }

    #[test]
    fn test_search_matches_title_tag_or_author() {
        let by_title = blog("Fearless Concurrency", &[]);
        let by_tag = blog("x", &["concurrency-patterns"]);
        let by_author = blog("unrelated", &[]);
        let neither = blog("unrelated", &["misc"]);

        let mut p = params();
        p.search = Some("Concurrency".to_string());
        let query = PublicListing::parse(&p)
            .unwrap()
            .into_query(None, Some(by_author.author_id));

        assert!(query.filter.matches(&by_title));
        assert!(query.filter.matches(&by_tag));
        assert!(query.filter.matches(&by_author));
        assert!(!query.filter.matches(&neither));
    }

    #[test]
    fn test_public_listing_always_published() {
        let query = PublicListing::parse(&params()).unwrap().into_query(None, None);
        assert_eq!(query.filter.state, Some(BlogState::Published));
        assert_eq!(query.filter.author, AuthorScope::Anyone);
        assert_eq!(query.sort, BlogSort::newest_first());
    }

    #[test]
    fn test_own_listing_scopes_to_actor() {
        let actor = Actor::new(Uuid::new_v4());
        let query = own_listing(
            &actor,
            &OwnListingParams {
                state: Some("draft".to_string()),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(query.filter.author, AuthorScope::Only(actor.user_id));
        assert_eq!(query.filter.state, Some(BlogState::Draft));
        assert_eq!(query.page.limit(), DEFAULT_OWN_LIMIT);
        assert_eq!(query.sort, BlogSort::newest_first());
    }

    #[test]
    fn test_own_listing_rejects_unknown_state() {
        let actor = Actor::new(Uuid::new_v4());
        let result = own_listing(
            &actor,
            &OwnListingParams {
                state: Some("archived".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn test_page_map_keeps_totals() {
        let request = PageRequest::new(2, 5).unwrap();
        let page = Page::new(vec![1, 2, 3], 12, request).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20, 30]);
        assert_eq!(page.total, 12);
        assert_eq!(page.pages, 3);
    }
}
