//! Configuration for one compile pass.
//!
//! A [`CompileConfig`] is handed to [`crate::mapper::GraphMapper`] and to
//! [`crate::context::CompileContext::with_config`]. It controls how deep a save
//! traverses, how double deletions are reported, and capacity hints for the
//! per-pass registries.

use crate::errors::GraphWriteError;

/// Horizon value meaning "traverse the whole reachable graph".
pub const UNBOUNDED_HORIZON: i32 = -1;

/// Options for a single save/compile pass.
///
/// # Default Configuration
///
/// ```rust
/// use graphwrite::CompileConfig;
/// let config = CompileConfig::default();
/// assert_eq!(config.horizon, -1);
/// assert!(!config.strict_deletes);
/// assert!(config.skip_unchanged);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileConfig {
    /// Traversal depth used by [`crate::mapper::GraphMapper::save`].
    ///
    /// **Default:** `-1` (unbounded)
    ///
    /// `0` writes only the root entity without expanding its relationships,
    /// `1` also writes its direct neighbours and the edges to them, and so on.
    pub horizon: i32,

    /// Whether a repeated group deletion is an error.
    ///
    /// **Default:** `false`
    ///
    /// When `false` the mapper treats the group as already cleared by the
    /// other end of the mapping and only re-establishes the field's targets.
    /// When `true` it fails with [`GraphWriteError::DoubleDeletion`].
    pub strict_deletes: bool,

    /// Drop node statements for persisted entities that did not change since
    /// they were loaded.
    ///
    /// **Default:** `true`
    pub skip_unchanged: bool,

    /// Optional capacity hint for the visitation ledger and the object log.
    pub reserve_entities: Option<usize>,

    /// Optional capacity hint for the relationship registries.
    pub reserve_relationships: Option<usize>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            horizon: UNBOUNDED_HORIZON,
            strict_deletes: false,
            skip_unchanged: true,
            reserve_entities: None,
            reserve_relationships: None,
        }
    }
}

impl CompileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for a save that only touches the root entity.
    pub fn shallow() -> Self {
        Self::default().with_horizon(0)
    }

    pub fn with_horizon(mut self, horizon: i32) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_strict_deletes(mut self, strict: bool) -> Self {
        self.strict_deletes = strict;
        self
    }

    pub fn with_skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    pub fn with_capacity(mut self, entities: usize, relationships: usize) -> Self {
        self.reserve_entities = Some(entities);
        self.reserve_relationships = Some(relationships);
        self
    }

    pub fn validate(&self) -> Result<(), GraphWriteError> {
        if self.horizon < UNBOUNDED_HORIZON {
            return Err(GraphWriteError::invalid_input(format!(
                "horizon must be >= {UNBOUNDED_HORIZON}, got {}",
                self.horizon
            )));
        }
        Ok(())
    }
}
