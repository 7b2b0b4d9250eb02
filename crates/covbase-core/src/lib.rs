//! covbase core
//!
//! Shared vocabulary for the coverage baseline step: the error type, the
//! read-only trigger context, and the port traits that the resolvers use to
//! talk to the host platform. This crate has minimal dependencies so every
//! other crate in the workspace can build on it.

pub mod context;
pub mod error;
pub mod ports;

pub use context::{RepoSlug, TriggerContext};
pub use error::{Error, Result};
