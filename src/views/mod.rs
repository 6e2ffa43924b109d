//! Presentation of listing results.

pub mod listing;
