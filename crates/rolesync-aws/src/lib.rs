//! Rolesync AWS - Cross-account discovery of SAML-trusted IAM roles
//!
//! The collector enumerates every member account of the organization,
//! assumes a scoped reader role in each, matches the account's SAML
//! providers against the expected metadata descriptor, and scans IAM role
//! trust policies for singular SAML federation statements.

pub mod collector;
pub mod orgs;
pub mod providers;
pub mod sts;
pub mod trust;

pub use collector::{Collector, DiscoverySummary};
