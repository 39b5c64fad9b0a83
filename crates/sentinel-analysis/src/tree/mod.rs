//! Tree builder subsystem: thread_local tree-sitter parsers, shared query
//! helpers, and the incrementally updated semantic index.

pub mod builder;
pub mod error_tolerant;
pub mod query;
pub mod semantic;

pub use builder::{Dialect, SourceTree, TreeBuilder};
pub use semantic::{ImportDecl, SemanticContext, SemanticIndex};
