//! Per-save compilation context.
//!
//! [`CompileContext`] is created for one save, driven by one caller through a
//! single traversal, and dropped afterwards. It owns the visitation ledger, the
//! relationship registries, the transient relationship index, the temporary
//! reference table and the log of every object touched, and it holds the
//! statement compiler it reports unmapped builders to. Nothing here performs
//! I/O; entities are observed through [`ObjectRef`] handles and never mutated.

use tracing::{debug, trace};

use crate::{
    compiler::StatementCompiler,
    config::CompileConfig,
    identity::{ObjectRef, SrcTargetKey},
    ledger::VisitLedger,
    mappable::MappedRelationship,
    object_log::ObjectLog,
    references::{IdResolver, ReferenceTable},
    registry::{EndpointType, RelationshipGroup, RelationshipRegistry},
    transient::TransientIndex,
    types::{EntityType, NodeSide},
};

pub struct CompileContext<C: StatementCompiler> {
    ledger: VisitLedger<C::NodeBuilder>,
    relationships: RelationshipRegistry,
    transient: TransientIndex,
    references: ReferenceTable,
    log: ObjectLog,
    compiler: C,
}

impl<C: StatementCompiler> CompileContext<C> {
    pub fn new(compiler: C) -> Self {
        Self {
            ledger: VisitLedger::new(),
            relationships: RelationshipRegistry::new(),
            transient: TransientIndex::new(),
            references: ReferenceTable::new(),
            log: ObjectLog::new(),
            compiler,
        }
    }

    pub fn with_config(compiler: C, config: &CompileConfig) -> Self {
        let entities = config.reserve_entities.unwrap_or(0);
        let relationships = config.reserve_relationships.unwrap_or(0);
        Self {
            ledger: VisitLedger::with_capacity(entities),
            relationships: RelationshipRegistry::with_capacity(relationships),
            transient: TransientIndex::new(),
            references: ReferenceTable::new(),
            log: ObjectLog::with_capacity(entities),
            compiler,
        }
    }

    pub fn visited(&self, entity: &ObjectRef, horizon: i32) -> bool {
        self.ledger.has_been_visited(entity, horizon)
    }

    pub fn visit(&mut self, entity: ObjectRef, builder: C::NodeBuilder, horizon: i32) {
        trace!(entity = ?entity, horizon, "visit");
        self.ledger.record_visit(entity, builder, horizon);
    }

    pub fn visited_node(&self, entity: &ObjectRef) -> Option<&C::NodeBuilder> {
        self.ledger.builder_for(entity)
    }

    pub fn visited_horizon(&self, entity: &ObjectRef) -> Option<i32> {
        self.ledger.horizon_for(entity)
    }

    pub fn visit_relationship_entity(&mut self, id: i64) -> bool {
        self.ledger.record_relationship_entity(id)
    }

    pub fn visited_relationship_entity(&self, id: i64) -> bool {
        self.ledger.has_relationship_entity(id)
    }

    pub fn register_new_object(&mut self, reference: i64, entity: ObjectRef) {
        self.references.register_new(&mut self.log, reference, entity);
    }

    pub fn get_new_object(&self, reference: i64) -> Option<&ObjectRef> {
        self.references.lookup_by_ref(reference)
    }

    pub fn register_new_id(&mut self, reference: i64, id: i64) {
        self.references.record_real_id(reference, id);
    }

    /// The real id recorded for `reference`, or `reference` itself.
    pub fn get_id(&self, reference: i64) -> i64 {
        self.references.resolve(reference)
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    pub fn register(&mut self, object: ObjectRef) -> bool {
        self.log.insert(object)
    }

    /// Every object logged this pass, in first-logged order.
    pub fn registry(&self) -> &[ObjectRef] {
        self.log.as_slice()
    }

    pub fn register_relationship(&mut self, relationship: MappedRelationship) -> bool {
        self.relationships.register(relationship)
    }

    pub fn remove_registered_relationship(&mut self, relationship: &MappedRelationship) -> bool {
        self.relationships.unregister(relationship)
    }

    pub fn restore_deleted_relationship(&mut self, relationship: &MappedRelationship) -> bool {
        self.relationships.restore(relationship)
    }

    pub fn is_registered_relationship(&self, relationship: &MappedRelationship) -> bool {
        self.relationships.is_registered(relationship)
    }

    /// Marks `(src)-[:relationship_type]->(x:end_node_type)` as deleted before
    /// the mapper re-establishes whichever of them are still present.
    ///
    /// Returns `false` when the group had already been deleted, including the
    /// case where no active descriptor matches but the deleted set holds one
    /// from an earlier request. A group that was never persisted yields `true`.
    /// Callers that walk both ends of a mapping see `false` for the second end
    /// and should still re-establish that end's present edges.
    pub fn deregister_outgoing_relationships(
        &mut self,
        src: i64,
        relationship_type: &str,
        end_node_type: &EntityType,
    ) -> bool {
        self.deregister_relationships(
            &RelationshipGroup::outgoing(src, relationship_type, end_node_type.clone()),
        )
    }

    /// Marks `(x)-[:relationship_type]->(tgt)` as deleted.
    ///
    /// For plain relationships `end_node_type` filters on the start node's
    /// declared type; when `relationship_entity` is set it filters on the end
    /// node's declared type instead.
    pub fn deregister_incoming_relationships(
        &mut self,
        tgt: i64,
        relationship_type: &str,
        end_node_type: &EntityType,
        relationship_entity: bool,
    ) -> bool {
        let compare = if relationship_entity {
            EndpointType::End
        } else {
            EndpointType::Start
        };
        self.deregister_relationships(&RelationshipGroup {
            node_id: tgt,
            side: NodeSide::End,
            relationship_type: relationship_type.to_owned(),
            declared_type: end_node_type.clone(),
            compare,
        })
    }

    pub fn deregister_relationships(&mut self, group: &RelationshipGroup) -> bool {
        self.relationships.deregister_group(group)
    }

    pub fn get_deleted_relationships(&self) -> impl Iterator<Item = &MappedRelationship> {
        self.relationships.deleted()
    }

    pub fn registered_relationships(&self) -> impl Iterator<Item = &MappedRelationship> {
        self.relationships.active()
    }

    pub fn register_transient_relationship(&mut self, key: SrcTargetKey, object: ObjectRef) -> bool {
        self.transient.log_if_new(&mut self.log, key, object)
    }

    pub fn get_transient_relationships(&self, key: &SrcTargetKey) -> &[ObjectRef] {
        self.transient.transient_relationships_for(key)
    }

    /// Tells the compiler a staged builder is no longer needed.
    pub fn deregister(&mut self, builder: &C::NodeBuilder) {
        debug!(builder = ?builder, "unmapping node builder");
        self.compiler.unmap(builder);
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn compiler_mut(&mut self) -> &mut C {
        &mut self.compiler
    }

    pub fn into_compiler(self) -> C {
        self.compiler
    }
}

impl<C: StatementCompiler> IdResolver for CompileContext<C> {
    fn resolve(&self, reference: i64) -> i64 {
        self.references.resolve(reference)
    }

    fn is_resolved(&self, reference: i64) -> bool {
        self.references.is_resolved(reference)
    }
}
