//! Application services - orchestrate ports and policy per use case.

mod accounts;
mod blogs;

pub use accounts::{AccountService, Session};
pub use blogs::{BlogService, BlogView};
