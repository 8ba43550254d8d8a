//! CLI command handlers module
//!
//! This module is organized by functional domains:
//! - rag: full pipeline runs and queries
//! - index: indexing and index removal
//! - info: cache statistics and configuration display

pub mod index;
pub mod info;
pub mod rag;

pub use index::*;
pub use info::*;
pub use rag::*;
