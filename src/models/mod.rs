//! Core data models for the bucket browser.
//!
//! These types describe what a listing surfaces (entries, breadcrumbs) and how
//! object names are classified. They serialize naturally as JSON via `serde`.

pub mod entry;
pub mod file_kind;
