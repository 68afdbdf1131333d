//! Structured write statements produced by a compile pass.
//!
//! Statements that point at nodes created in the same pass carry
//! [`NodeRef::Pending`] and are resolved lazily, either when parameters are
//! rendered or when the plan is bound after the database has assigned ids.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::trace;

use crate::{errors::GraphWriteError, references::IdResolver};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    Existing(i64),
    Pending(i64),
}

impl NodeRef {
    /// Negative identities are temporary references.
    pub fn from_identity(identity: i64) -> Self {
        if identity < 0 {
            NodeRef::Pending(identity)
        } else {
            NodeRef::Existing(identity)
        }
    }

    pub fn identity(self) -> i64 {
        match self {
            NodeRef::Existing(id) | NodeRef::Pending(id) => id,
        }
    }

    pub fn is_pending(self) -> bool {
        matches!(self, NodeRef::Pending(_))
    }

    pub fn resolve(self, resolver: &dyn IdResolver) -> i64 {
        match self {
            NodeRef::Existing(id) => id,
            NodeRef::Pending(reference) => resolver.resolve(reference),
        }
    }

    fn bind(&mut self, resolver: &dyn IdResolver) -> bool {
        if let NodeRef::Pending(reference) = *self {
            if resolver.is_resolved(reference) {
                *self = NodeRef::Existing(resolver.resolve(reference));
                return true;
            }
        }
        false
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteStatement {
    CreateNode {
        reference: i64,
        labels: Vec<String>,
        properties: Value,
    },
    UpdateNode {
        id: i64,
        labels: Vec<String>,
        properties: Value,
    },
    CreateRelationship {
        start: NodeRef,
        end: NodeRef,
        relationship_type: String,
        properties: Value,
    },
    UpdateRelationship {
        id: i64,
        relationship_type: String,
        properties: Value,
    },
    DeleteRelationship {
        start: NodeRef,
        end: NodeRef,
        relationship_type: String,
    },
}

impl WriteStatement {
    /// Renders statement parameters, resolving node references through
    /// `resolver` at call time.
    pub fn parameters(&self, resolver: &dyn IdResolver) -> Value {
        match self {
            WriteStatement::CreateNode {
                reference,
                labels,
                properties,
            } => json!({ "ref": reference, "labels": labels, "props": properties }),
            WriteStatement::UpdateNode {
                id,
                labels,
                properties,
            } => json!({ "id": id, "labels": labels, "props": properties }),
            WriteStatement::CreateRelationship {
                start,
                end,
                relationship_type,
                properties,
            } => json!({
                "start": start.resolve(resolver),
                "end": end.resolve(resolver),
                "type": relationship_type,
                "props": properties,
            }),
            WriteStatement::UpdateRelationship {
                id,
                relationship_type,
                properties,
            } => json!({ "id": id, "type": relationship_type, "props": properties }),
            WriteStatement::DeleteRelationship {
                start,
                end,
                relationship_type,
            } => json!({
                "start": start.resolve(resolver),
                "end": end.resolve(resolver),
                "type": relationship_type,
            }),
        }
    }

    fn node_refs_mut(&mut self) -> Vec<&mut NodeRef> {
        match self {
            WriteStatement::CreateRelationship { start, end, .. }
            | WriteStatement::DeleteRelationship { start, end, .. } => vec![start, end],
            _ => Vec::new(),
        }
    }

    fn node_refs(&self) -> Vec<NodeRef> {
        match self {
            WriteStatement::CreateRelationship { start, end, .. }
            | WriteStatement::DeleteRelationship { start, end, .. } => vec![*start, *end],
            _ => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub relationships_created: usize,
    pub relationships_updated: usize,
    pub relationships_deleted: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WritePlan {
    statements: Vec<WriteStatement>,
}

impl WritePlan {
    pub fn new(statements: Vec<WriteStatement>) -> Self {
        Self { statements }
    }

    pub fn statements(&self) -> &[WriteStatement] {
        &self.statements
    }

    pub fn into_statements(self) -> Vec<WriteStatement> {
        self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn stats(&self) -> PlanStats {
        let mut stats = PlanStats::default();
        for statement in &self.statements {
            match statement {
                WriteStatement::CreateNode { .. } => stats.nodes_created += 1,
                WriteStatement::UpdateNode { .. } => stats.nodes_updated += 1,
                WriteStatement::CreateRelationship { .. } => stats.relationships_created += 1,
                WriteStatement::UpdateRelationship { .. } => stats.relationships_updated += 1,
                WriteStatement::DeleteRelationship { .. } => stats.relationships_deleted += 1,
            }
        }
        stats
    }

    /// Temporary references still waiting for a real id, sorted and unique.
    pub fn pending_references(&self) -> Vec<i64> {
        let mut pending: Vec<i64> = self
            .statements
            .iter()
            .flat_map(WriteStatement::node_refs)
            .filter(|node| node.is_pending())
            .map(NodeRef::identity)
            .collect();
        pending.sort_unstable();
        pending.dedup();
        pending
    }

    /// Rewrites every pending reference that `resolver` knows about and
    /// returns how many were rewritten.
    pub fn bind(&mut self, resolver: &dyn IdResolver) -> usize {
        let mut bound = 0;
        for statement in &mut self.statements {
            for node in statement.node_refs_mut() {
                if node.bind(resolver) {
                    bound += 1;
                }
            }
        }
        trace!(bound, "bound pending node references");
        bound
    }

    /// Like [`WritePlan::bind`], but fails if any reference is left pending.
    pub fn bind_strict(&mut self, resolver: &dyn IdResolver) -> Result<usize, GraphWriteError> {
        let bound = self.bind(resolver);
        match self.pending_references().first() {
            Some(&reference) => Err(GraphWriteError::UnresolvedReference(reference)),
            None => Ok(bound),
        }
    }

    pub fn parameters(&self, resolver: &dyn IdResolver) -> Vec<Value> {
        self.statements
            .iter()
            .map(|statement| statement.parameters(resolver))
            .collect()
    }
}
