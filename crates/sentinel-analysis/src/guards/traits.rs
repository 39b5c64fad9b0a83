//! The guard contract.

use std::path::Path;

use sentinel_core::errors::GuardError;
use sentinel_core::Violation;

use crate::tree::SourceTree;

/// Trait that every guard must implement.
///
/// Guards are stateless across files: everything a check needs comes from
/// the tree and the guard's own immutable settings.
pub trait Guard: Send + Sync {
    /// Unique name, also the key in `guards_enabled`.
    fn name(&self) -> &'static str;

    /// Cheap path-based pre-filter.
    fn should_process(&self, path: &Path) -> bool;

    /// Run the guard. Must not mutate the tree.
    fn check(&self, tree: &SourceTree, path: &Path) -> Result<Vec<Violation>, GuardError>;
}
