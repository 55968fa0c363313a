//! Domain entities - the core business objects.

mod blog;
mod user;

pub use blog::{
    Blog, BlogChanges, BlogState, NewBlog, WORDS_PER_MINUTE, normalize_tags, reading_time,
};
pub use user::{Actor, AuthorSummary, Credentials, NewUser, User};
