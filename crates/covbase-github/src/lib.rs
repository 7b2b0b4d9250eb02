//! GitHub adapters for covbase.
//!
//! Provides the REST client implementing the core ports, plus the two
//! resolvers that only need host metadata: branch context and commit ancestry.

pub mod ancestry;
pub mod branch;
pub mod client;

pub use ancestry::CommitAncestryResolver;
pub use branch::{BranchContext, BranchContextResolver, branch_from_ref};
pub use client::{DEFAULT_API_URL, GitHubClient};
