//! # Quill Core
//!
//! The domain layer of the Quill blog API.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, ports, the blog query engine, the authorization policy, and the
//! services that orchestrate them.

pub mod domain;
pub mod error;
pub mod policy;
pub mod ports;
pub mod query;
pub mod services;

pub use error::DomainError;
