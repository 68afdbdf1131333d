//! Compilation context for saving in-memory object graphs to a graph database.
//!
//! A save walks the object graph from a root entity and records, in one
//! [`CompileContext`], which entities were visited at which depth, which
//! relationships are still present, which ones were removed, and how temporary
//! references for new nodes map onto the ids the database hands back. The
//! statement compiler then reads the context to produce a [`WritePlan`].
//!
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod bench_utils;
pub mod compiler;
pub mod config;
pub mod context;
pub mod errors;
pub mod identity;
pub mod ledger;
pub mod mappable;
pub mod mapper;
pub mod object_log;
pub mod plan;
pub mod references;
pub mod registry;
pub mod snapshot;
pub mod transient;
pub mod types;

pub use crate::compiler::{NodeBuilderId, PlanCompiler, StatementCompiler, build_plan};
pub use crate::config::{CompileConfig, UNBOUNDED_HORIZON};
pub use crate::context::CompileContext;
pub use crate::errors::GraphWriteError;
pub use crate::identity::{AsObject, ObjectRef, SrcTargetKey};
pub use crate::mappable::MappedRelationship;
pub use crate::mapper::{GraphMapper, NodeEntity, Related, RelationshipEntity, RelationshipField};
pub use crate::plan::{NodeRef, PlanStats, WritePlan, WriteStatement};
pub use crate::references::{IdResolver, ReferenceTable};
pub use crate::registry::{EndpointType, RelationshipGroup};
pub use crate::snapshot::MappingSnapshot;
pub use crate::types::{Direction, EntityType, NodeSide};
