//! # plume-shared
//!
//! Identifier types, error types and constants shared by every Plume crate.

pub mod constants;
pub mod error;
pub mod types;

pub use error::IdError;
pub use types::{AtUri, Did, EntityKey, Tid};
