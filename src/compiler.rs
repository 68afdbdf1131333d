//! Statement compiler seam and the staging compiler that turns a finished
//! [`CompileContext`] into a [`WritePlan`].

use std::fmt;

use ahash::AHashSet;
use serde_json::Value;
use tracing::debug;

use crate::{
    context::CompileContext,
    errors::GraphWriteError,
    mappable::MappedRelationship,
    plan::{NodeRef, WritePlan, WriteStatement},
};

pub trait StatementCompiler {
    type NodeBuilder: Clone + fmt::Debug;

    fn new_node(&mut self, reference: i64, labels: Vec<String>, properties: Value)
    -> Self::NodeBuilder;

    fn existing_node(&mut self, id: i64, labels: Vec<String>, properties: Value)
    -> Self::NodeBuilder;

    fn new_relationship(
        &mut self,
        start: NodeRef,
        end: NodeRef,
        relationship_type: &str,
        properties: Value,
    );

    fn existing_relationship(&mut self, id: i64, relationship_type: &str, properties: Value);

    /// Drops a staged node statement.
    fn unmap(&mut self, builder: &Self::NodeBuilder);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeBuilderId(usize);

#[derive(Debug, Default)]
pub struct PlanCompiler {
    nodes: Vec<Option<WriteStatement>>,
    relationships: Vec<WriteStatement>,
}

impl PlanCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    fn stage(&mut self, statement: WriteStatement) -> NodeBuilderId {
        self.nodes.push(Some(statement));
        NodeBuilderId(self.nodes.len() - 1)
    }

    pub fn node_statement(&self, builder: &NodeBuilderId) -> Option<&WriteStatement> {
        self.nodes.get(builder.0).and_then(Option::as_ref)
    }

    pub fn try_node_statement(
        &self,
        builder: &NodeBuilderId,
    ) -> Result<&WriteStatement, GraphWriteError> {
        self.node_statement(builder)
            .ok_or_else(|| GraphWriteError::not_found(format!("node builder {}", builder.0)))
    }

    pub fn staged_nodes(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn staged_relationships(&self) -> &[WriteStatement] {
        &self.relationships
    }
}

impl StatementCompiler for PlanCompiler {
    type NodeBuilder = NodeBuilderId;

    fn new_node(&mut self, reference: i64, labels: Vec<String>, properties: Value) -> NodeBuilderId {
        self.stage(WriteStatement::CreateNode {
            reference,
            labels,
            properties,
        })
    }

    fn existing_node(&mut self, id: i64, labels: Vec<String>, properties: Value) -> NodeBuilderId {
        self.stage(WriteStatement::UpdateNode {
            id,
            labels,
            properties,
        })
    }

    fn new_relationship(
        &mut self,
        start: NodeRef,
        end: NodeRef,
        relationship_type: &str,
        properties: Value,
    ) {
        self.relationships.push(WriteStatement::CreateRelationship {
            start,
            end,
            relationship_type: relationship_type.to_owned(),
            properties,
        });
    }

    fn existing_relationship(&mut self, id: i64, relationship_type: &str, properties: Value) {
        self.relationships.push(WriteStatement::UpdateRelationship {
            id,
            relationship_type: relationship_type.to_owned(),
            properties,
        });
    }

    fn unmap(&mut self, builder: &NodeBuilderId) {
        if let Some(slot) = self.nodes.get_mut(builder.0) {
            *slot = None;
        }
    }
}

/// Materialises every write the pass produced.
///
/// Node statements follow the order objects were logged in the context, then
/// any remaining staged nodes in staging order. Relationship statements follow
/// in staging order and deletions come last, sorted by descriptor.
pub fn build_plan(context: &CompileContext<PlanCompiler>) -> WritePlan {
    build_plan_filtered(context, |_| true)
}

/// [`build_plan`], emitting only the deletions `keep_deletion` accepts.
pub fn build_plan_filtered<F>(context: &CompileContext<PlanCompiler>, keep_deletion: F) -> WritePlan
where
    F: Fn(&MappedRelationship) -> bool,
{
    let compiler = context.compiler();
    let mut emitted = AHashSet::new();
    let mut statements = Vec::new();

    for object in context.registry() {
        let Some(builder) = context.visited_node(object) else {
            continue;
        };
        if !emitted.insert(*builder) {
            continue;
        }
        if let Some(statement) = compiler.node_statement(builder) {
            statements.push(statement.clone());
        }
    }
    for (index, slot) in compiler.nodes.iter().enumerate() {
        if emitted.contains(&NodeBuilderId(index)) {
            continue;
        }
        if let Some(statement) = slot {
            statements.push(statement.clone());
        }
    }

    statements.extend(compiler.relationships.iter().cloned());

    let mut deleted: Vec<_> = context
        .get_deleted_relationships()
        .filter(|relationship| keep_deletion(relationship))
        .collect();
    deleted.sort_unstable();
    statements.extend(deleted.into_iter().map(|relationship| {
        WriteStatement::DeleteRelationship {
            start: NodeRef::from_identity(relationship.start_node_id()),
            end: NodeRef::from_identity(relationship.end_node_id()),
            relationship_type: relationship.relationship_type().to_owned(),
        }
    }));

    let plan = WritePlan::new(statements);
    let stats = plan.stats();
    debug!(
        nodes_created = stats.nodes_created,
        nodes_updated = stats.nodes_updated,
        relationships_created = stats.relationships_created,
        relationships_updated = stats.relationships_updated,
        relationships_deleted = stats.relationships_deleted,
        "built write plan"
    );
    plan
}
