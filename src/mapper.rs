//! Depth-bounded traversal of an object graph into a [`CompileContext`].
//!
//! The mapper is the caller the context is designed for. It walks entities
//! reachable from a root, stages one node statement per entity, clears the
//! relationship groups of persisted entities before re-establishing the edges
//! still present, and stages statements for edges that did not exist when the
//! graph was loaded. The ledger's horizon check is the only cycle guard.

use std::rc::Rc;

use ahash::AHashMap;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::{
    compiler::{PlanCompiler, StatementCompiler, build_plan_filtered},
    config::CompileConfig,
    context::CompileContext,
    errors::GraphWriteError,
    identity::{AsObject, ObjectRef, SrcTargetKey},
    mappable::MappedRelationship,
    plan::{NodeRef, WritePlan},
    registry::RelationshipGroup,
    snapshot::MappingSnapshot,
    types::{Direction, EntityType},
};

pub trait NodeEntity: AsObject {
    fn entity_type(&self) -> EntityType;

    fn labels(&self) -> Vec<String> {
        vec![self.entity_type().0]
    }

    /// Database id, `None` until the entity has been persisted.
    fn id(&self) -> Option<i64>;

    fn properties(&self) -> Value;

    fn relationships(&self) -> Vec<RelationshipField>;
}

/// A relationship carrying its own properties.
///
/// Its type and the declared type of the other end come from the field
/// holding it.
pub trait RelationshipEntity: AsObject {
    fn id(&self) -> Option<i64>;

    fn properties(&self) -> Value;

    fn start_node(&self) -> Rc<dyn NodeEntity>;

    fn end_node(&self) -> Rc<dyn NodeEntity>;
}

#[derive(Clone)]
pub enum Related {
    Node(Rc<dyn NodeEntity>),
    Entity(Rc<dyn RelationshipEntity>),
}

/// One relationship-valued field of an entity.
#[derive(Clone)]
pub struct RelationshipField {
    pub relationship_type: String,
    pub direction: Direction,
    /// Declared type of the entities at the other end.
    pub target_type: EntityType,
    pub targets: Vec<Related>,
}

impl RelationshipField {
    pub fn new(
        relationship_type: impl Into<String>,
        direction: Direction,
        target_type: impl Into<EntityType>,
    ) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            direction,
            target_type: target_type.into(),
            targets: Vec::new(),
        }
    }

    pub fn outgoing(relationship_type: impl Into<String>, target_type: impl Into<EntityType>) -> Self {
        Self::new(relationship_type, Direction::Outgoing, target_type)
    }

    pub fn incoming(relationship_type: impl Into<String>, target_type: impl Into<EntityType>) -> Self {
        Self::new(relationship_type, Direction::Incoming, target_type)
    }

    pub fn with_node(mut self, node: Rc<dyn NodeEntity>) -> Self {
        self.targets.push(Related::Node(node));
        self
    }

    pub fn with_nodes<I>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = Rc<dyn NodeEntity>>,
    {
        self.targets.extend(nodes.into_iter().map(Related::Node));
        self
    }

    pub fn with_entity(mut self, entity: Rc<dyn RelationshipEntity>) -> Self {
        self.targets.push(Related::Entity(entity));
        self
    }

    fn validate(&self) -> Result<(), GraphWriteError> {
        if self.relationship_type.trim().is_empty() {
            return Err(GraphWriteError::invalid_input("relationship type must be set"));
        }
        if self.target_type.as_str().trim().is_empty() {
            return Err(GraphWriteError::invalid_input(format!(
                "target type must be set for {}",
                self.relationship_type
            )));
        }
        Ok(())
    }

    fn group(&self, node_id: i64) -> RelationshipGroup {
        match self.direction {
            Direction::Outgoing => {
                RelationshipGroup::outgoing(node_id, &self.relationship_type, self.target_type.clone())
            }
            Direction::Incoming => {
                RelationshipGroup::incoming(node_id, &self.relationship_type, self.target_type.clone())
            }
        }
    }

    fn descriptor(&self, node_id: i64, node_type: &EntityType, other_id: i64) -> MappedRelationship {
        match self.direction {
            Direction::Outgoing => MappedRelationship::new(
                node_id,
                &self.relationship_type,
                other_id,
                node_type.clone(),
                self.target_type.clone(),
            ),
            Direction::Incoming => MappedRelationship::new(
                other_id,
                &self.relationship_type,
                node_id,
                self.target_type.clone(),
                node_type.clone(),
            ),
        }
    }
}

pub struct GraphMapper<'s, C: StatementCompiler = PlanCompiler> {
    context: CompileContext<C>,
    snapshot: &'s MappingSnapshot,
    config: CompileConfig,
    references: AHashMap<ObjectRef, i64>,
    next_reference: i64,
}

impl<'s> GraphMapper<'s, PlanCompiler> {
    pub fn new(snapshot: &'s MappingSnapshot, config: CompileConfig) -> Result<Self, GraphWriteError> {
        Self::with_compiler(PlanCompiler::new(), snapshot, config)
    }

    /// Write plan for everything mapped so far. Deletions of relationships
    /// that were never persisted are dropped.
    pub fn compile(&self) -> WritePlan {
        build_plan_filtered(&self.context, |relationship| {
            self.snapshot.contains_relationship(relationship)
        })
    }
}

impl<'s, C: StatementCompiler> GraphMapper<'s, C> {
    pub fn with_compiler(
        compiler: C,
        snapshot: &'s MappingSnapshot,
        config: CompileConfig,
    ) -> Result<Self, GraphWriteError> {
        config.validate()?;
        let mut context = CompileContext::with_config(compiler, &config);
        for relationship in snapshot.relationships() {
            context.register_relationship(relationship.clone());
        }
        Ok(Self {
            context,
            snapshot,
            config,
            references: AHashMap::new(),
            next_reference: -1,
        })
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    pub fn context(&self) -> &CompileContext<C> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut CompileContext<C> {
        &mut self.context
    }

    pub fn into_context(self) -> CompileContext<C> {
        self.context
    }

    /// Temporary reference handed to `entity`, if it is new and has been seen.
    pub fn reference_for(&self, entity: &Rc<dyn NodeEntity>) -> Option<i64> {
        self.references.get(&Rc::clone(entity).as_object()).copied()
    }

    /// Maps `entity` using the configured horizon.
    pub fn save(&mut self, entity: &Rc<dyn NodeEntity>) -> Result<C::NodeBuilder, GraphWriteError> {
        self.map(entity, self.config.horizon)
    }

    pub fn map(
        &mut self,
        entity: &Rc<dyn NodeEntity>,
        horizon: i32,
    ) -> Result<C::NodeBuilder, GraphWriteError> {
        let object = Rc::clone(entity).as_object();
        if self.context.visited(&object, horizon) {
            trace!(entity = ?object, horizon, "already visited");
            return self
                .context
                .visited_node(&object)
                .cloned()
                .ok_or_else(|| GraphWriteError::not_found(format!("builder for {object:?}")));
        }

        let expanded_before = self
            .context
            .visited_horizon(&object)
            .is_some_and(|previous| previous != 0);
        let builder = match self.context.visited_node(&object) {
            Some(builder) => builder.clone(),
            None => self.stage_node(entity, &object)?,
        };
        self.context.visit(object.clone(), builder.clone(), horizon);
        self.context.register(object);

        if horizon != 0 {
            self.map_relationships(entity, horizon, expanded_before)?;
        }
        Ok(builder)
    }

    fn identity(&mut self, entity: &Rc<dyn NodeEntity>) -> Result<i64, GraphWriteError> {
        if let Some(id) = entity.id() {
            if id < 0 {
                return Err(GraphWriteError::invalid_input(format!(
                    "persisted id must not be negative, got {id}"
                )));
            }
            return Ok(id);
        }
        let object = Rc::clone(entity).as_object();
        if let Some(&reference) = self.references.get(&object) {
            return Ok(reference);
        }
        let reference = self.next_reference;
        self.next_reference -= 1;
        self.references.insert(object, reference);
        Ok(reference)
    }

    fn stage_node(
        &mut self,
        entity: &Rc<dyn NodeEntity>,
        object: &ObjectRef,
    ) -> Result<C::NodeBuilder, GraphWriteError> {
        if entity.entity_type().as_str().trim().is_empty() {
            return Err(GraphWriteError::invalid_input("entity type must be set"));
        }
        let labels = entity.labels();
        let properties = entity.properties();
        let identity = self.identity(entity)?;

        if entity.id().is_none() {
            let builder = self
                .context
                .compiler_mut()
                .new_node(identity, labels, properties);
            self.context.register_new_object(identity, object.clone());
            return Ok(builder);
        }

        let unchanged = self.config.skip_unchanged
            && self.snapshot.node_unchanged(identity, &labels, &properties);
        let builder = self
            .context
            .compiler_mut()
            .existing_node(identity, labels, properties);
        if unchanged {
            debug!(id = identity, "node unchanged since load");
            self.context.deregister(&builder);
        }
        Ok(builder)
    }

    fn map_relationships(
        &mut self,
        entity: &Rc<dyn NodeEntity>,
        horizon: i32,
        expanded_before: bool,
    ) -> Result<(), GraphWriteError> {
        let node_id = self.identity(entity)?;
        let node_type = entity.entity_type();

        for field in entity.relationships() {
            field.validate()?;
            if entity.id().is_some() && !expanded_before {
                let group = field.group(node_id);
                if !self.context.deregister_relationships(&group) {
                    if self.config.strict_deletes {
                        warn!(
                            node = node_id,
                            relationship_type = %field.relationship_type,
                            "relationship group deleted twice"
                        );
                        return Err(GraphWriteError::double_deletion(
                            node_id,
                            field.relationship_type.as_str(),
                        ));
                    }
                    // The other end already cleared this group; its targets
                    // still have to be re-established.
                    debug!(
                        node = node_id,
                        relationship_type = %field.relationship_type,
                        "relationship group already cleared"
                    );
                }
            }

            for target in &field.targets {
                match target {
                    Related::Node(other) => {
                        let other_id = self.identity(other)?;
                        self.map(other, horizon - 1)?;
                        let relationship = field.descriptor(node_id, &node_type, other_id);
                        self.establish(relationship, Value::Object(Map::new()));
                    }
                    Related::Entity(relationship_entity) => {
                        self.map_relationship_entity(
                            &field,
                            node_id,
                            &node_type,
                            relationship_entity,
                            horizon,
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Keeps a relationship that is still present, staging a create statement
    /// when it was not there at load time.
    fn establish(&mut self, relationship: MappedRelationship, properties: Value) {
        if self.context.restore_deleted_relationship(&relationship) {
            return;
        }
        if !self.context.register_relationship(relationship.clone()) {
            return;
        }
        if self.snapshot.contains_relationship(&relationship) {
            return;
        }
        trace!(relationship = %relationship, "new relationship");
        self.context.compiler_mut().new_relationship(
            NodeRef::from_identity(relationship.start_node_id()),
            NodeRef::from_identity(relationship.end_node_id()),
            relationship.relationship_type(),
            properties,
        );
    }

    fn map_relationship_entity(
        &mut self,
        field: &RelationshipField,
        node_id: i64,
        node_type: &EntityType,
        relationship_entity: &Rc<dyn RelationshipEntity>,
        horizon: i32,
    ) -> Result<(), GraphWriteError> {
        let start = relationship_entity.start_node();
        let end = relationship_entity.end_node();
        let other = match field.direction {
            Direction::Outgoing => &end,
            Direction::Incoming => &start,
        };
        let other_id = self.identity(other)?;
        let relationship = field.descriptor(node_id, node_type, other_id);
        let object = Rc::clone(relationship_entity).as_object();

        match relationship_entity.id() {
            Some(id) => {
                if !self.context.restore_deleted_relationship(&relationship) {
                    self.context.register_relationship(relationship.clone());
                }
                if !self.context.visit_relationship_entity(id) {
                    return Ok(());
                }
                self.context.register(object);
                self.map(&start, horizon - 1)?;
                self.map(&end, horizon - 1)?;

                let properties = relationship_entity.properties();
                if self.snapshot.relationship_entity(id) != Some(&properties) {
                    self.context.compiler_mut().existing_relationship(
                        id,
                        relationship.relationship_type(),
                        properties,
                    );
                }
            }
            None => {
                let key = SrcTargetKey::new(relationship.start_node_id(), relationship.end_node_id());
                // A loaded edge between the same pair belongs to a relationship
                // entity this one replaces, so it stays deleted.
                let persisted = self.snapshot.contains_relationship(&relationship);
                if persisted || !self.context.restore_deleted_relationship(&relationship) {
                    self.context.register_relationship(relationship.clone());
                }
                if self.context.get_transient_relationships(&key).contains(&object) {
                    trace!(key = %key, "relationship entity already produced for pair");
                    return Ok(());
                }
                if !self.context.register_transient_relationship(key, object) {
                    return Ok(());
                }
                self.map(&start, horizon - 1)?;
                self.map(&end, horizon - 1)?;
                trace!(key = %key, "new relationship entity");
                self.context.compiler_mut().new_relationship(
                    NodeRef::from_identity(relationship.start_node_id()),
                    NodeRef::from_identity(relationship.end_node_id()),
                    relationship.relationship_type(),
                    relationship_entity.properties(),
                );
            }
        }
        Ok(())
    }
}
