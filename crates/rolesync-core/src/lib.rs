//! Rolesync Core - Domain types and errors for the role reconciliation engine

pub mod error;
pub mod model;

pub use error::*;
pub use model::*;
