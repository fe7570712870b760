//! Core domain model for shelfmark.
//!
//! This crate defines the book catalog data model (`BookRecord` and its
//! derived enrichments), the SQLite schema, and the category taxonomy
//! used by the classification stage.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod model;
pub mod schema;
pub mod taxonomy;

pub use error::{Error, Result};
