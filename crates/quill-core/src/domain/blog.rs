use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Reading speed used for the reading-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Lifecycle state of a blog post. The only transition is `Draft -> Published`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogState {
    Draft,
    Published,
}

impl BlogState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlogState::Draft => "draft",
            BlogState::Published => "published",
        }
    }
}

impl fmt::Display for BlogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlogState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(BlogState::Draft),
            "published" => Ok(BlogState::Published),
            other => Err(DomainError::validation(format!(
                "Unknown blog state '{other}', expected 'draft' or 'published'"
            ))),
        }
    }
}

/// Blog entity - a post owned by exactly one author.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blog {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tags: Vec<String>,
    pub state: BlogState,
    pub read_count: u64,
    /// Estimated minutes to read the body.
    pub reading_time: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Blog {
    /// Create a new draft owned by `author_id`.
    pub fn draft(author_id: Uuid, new: NewBlog) -> Result<Self, DomainError> {
        new.validate()?;

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            author_id,
            reading_time: reading_time(&new.body),
            title: new.title.trim().to_string(),
            description: new.description.trim().to_string(),
            body: new.body,
            tags: normalize_tags(new.tags),
            state: BlogState::Draft,
            read_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_published(&self) -> bool {
        self.state == BlogState::Published
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Move the post to `Published`. Re-publishing is a conflict, not a no-op.
    pub fn publish(&mut self) -> Result<(), DomainError> {
        if self.is_published() {
            return Err(DomainError::Conflict("Blog already published".to_string()));
        }
        self.state = BlogState::Published;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Merge whitelisted changes into the post.
    ///
    /// Validation happens before anything is written, so a rejected change
    /// leaves the post untouched.
    pub fn apply(&mut self, changes: BlogChanges) -> Result<(), DomainError> {
        changes.validate()?;

        if let Some(title) = changes.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = changes.description {
            self.description = description.trim().to_string();
        }
        if let Some(tags) = changes.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(body) = changes.body {
            self.reading_time = reading_time(&body);
            self.body = body;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Input for creating a blog post.
#[derive(Debug, Clone, Default)]
pub struct NewBlog {
    pub title: String,
    pub description: String,
    pub body: String,
    pub tags: Vec<String>,
}

impl NewBlog {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.title.trim().is_empty()
            || self.description.trim().is_empty()
            || self.body.trim().is_empty()
        {
            return Err(DomainError::validation(
                "Title, description, and body are required.",
            ));
        }
        Ok(())
    }
}

/// The fields an author may change on an existing post.
///
/// State, read count, author and timestamps are not editable.
#[derive(Debug, Clone, Default)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl BlogChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.body.is_none()
            && self.tags.is_none()
    }

    fn validate(&self) -> Result<(), DomainError> {
        let provided = [
            ("title", self.title.as_deref()),
            ("description", self.description.as_deref()),
            ("body", self.body.as_deref()),
        ];
        for (field, value) in provided {
            if value.is_some_and(|v| v.trim().is_empty()) {
                return Err(DomainError::validation(format!("{field} cannot be empty")));
            }
        }
        Ok(())
    }
}

/// Minutes needed to read `body`, rounded up.
pub fn reading_time(body: &str) -> u32 {
    let words = body.split_whitespace().count();
    u32::try_from(words.div_ceil(WORDS_PER_MINUTE)).unwrap_or(u32::MAX)
}

/// Trim tags, drop empty ones and duplicates, keep first-seen order.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}
