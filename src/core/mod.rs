//! Core modules of the dApp registry.
//!
//! Identifiers, the canonical and legacy data model, classification
//! lookup, the metadata side-table, flattening, merging and persistence.

pub mod config;
pub mod db;
pub mod error;
pub mod flatten;
pub mod ids;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod resolver;
pub mod store;
