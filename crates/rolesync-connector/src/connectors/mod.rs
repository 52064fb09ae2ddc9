//! Connector implementations

pub mod azure;
