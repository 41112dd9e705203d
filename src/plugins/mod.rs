//! Command drivers built on [`crate::core`].
//!
//! - `import`: tabular `dex,class,script_hash` sources
//! - `migrate`: legacy nested documents
//! - `validate`: registry consistency checks

pub mod import;
pub mod migrate;
pub mod validate;
