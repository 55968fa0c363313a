//! Data Transfer Objects - request/response types for the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Request to login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response containing a user's public information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Response containing an authentication token and the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

/// Author fields embedded in blog responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// `POST /api/blogs` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBlogRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// `PUT /api/blogs/{id}` body. Only these fields can be changed; anything
/// else in the payload is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBlogRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub body: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// A blog as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogResponse {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub body: String,
    pub tags: Vec<String>,
    pub state: String,
    pub read_count: u64,
    pub reading_time: u32,
    pub author_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<AuthorResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A page of blogs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogListResponse {
    pub blogs: Vec<BlogResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

/// Query string of `GET /api/blogs`.
///
/// Every value is taken as a raw string and validated by the query engine,
/// so malformed numbers surface as validation errors rather than parse errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListBlogsQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub tags: Option<String>,
    pub search: Option<String>,
    #[serde(alias = "sort_by", alias = "sortBy")]
    pub order_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// Query string of `GET /api/blogs/my-blogs`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MyBlogsQuery {
    pub state: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}
