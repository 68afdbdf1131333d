
use std::rc::Rc;

use domain_common::{Hierarchy, LABEL, MOVIE, Movie, NODE, Node, PERSON, Person, Rating, entity};
use graphwrite::{
    CompileConfig, EntityType, GraphMapper, GraphWriteError, MappedRelationship,
    MappingSnapshot, NodeEntity, NodeRef, ObjectRef, RelationshipField, SrcTargetKey,
    WriteStatement,
};
use serde_json::{Value, json};

fn delete(start: i64, end: i64, relationship_type: &str) -> WriteStatement {
    WriteStatement::DeleteRelationship {
        start: NodeRef::Existing(start),
        end: NodeRef::Existing(end),
        relationship_type: relationship_type.into(),
    }
}

fn create_rel(start: NodeRef, end: NodeRef, relationship_type: &str, properties: Value) -> WriteStatement {
    WriteStatement::CreateRelationship {
        start,
        end,
        relationship_type: relationship_type.into(),
        properties,
    }
}

fn object(node: &Rc<Node>) -> ObjectRef {
    ObjectRef::new(node.clone())
}

#[test]
fn test_unchanged_graph_compiles_to_empty_plan() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&hierarchy.root)).unwrap();
    assert!(mapper.compile().is_empty());
    assert_eq!(mapper.context().get_deleted_relationships().count(), 0);
}

#[test]
fn test_cleared_labels_are_deleted() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    hierarchy.loc1_1.labels.borrow_mut().clear();

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&hierarchy.loc1_1)).unwrap();
    let plan = mapper.compile();
    assert_eq!(plan.statements(), &[delete(4, 20, "LABELED")]);
}

#[test]
fn test_change_parent_moves_child_of() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    hierarchy.loc1_1.set_child_of_bidirectional(Some(&hierarchy.loc2));

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&hierarchy.loc1_1)).unwrap();
    let plan = mapper.compile();
    assert_eq!(
        plan.statements(),
        &[
            create_rel(NodeRef::Existing(4), NodeRef::Existing(3), "CHILD_OF", json!({})),
            delete(4, 2, "CHILD_OF"),
        ]
    );

    let context = mapper.context();
    assert!(context.is_registered_relationship(&MappedRelationship::new(4, "CHILD_OF", 3, NODE, NODE)));
    assert!(context.is_registered_relationship(&MappedRelationship::new(5, "CHILD_OF", 2, NODE, NODE)));
    assert!(context.is_registered_relationship(&MappedRelationship::new(2, "HAS_TYPE", 10, NODE, "NodeType")));
}

#[test]
fn test_strict_deletes_reject_repeated_group() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    hierarchy.loc1_1.set_child_of_bidirectional(Some(&hierarchy.loc2));

    let config = CompileConfig::default().with_strict_deletes(true);
    let mut mapper = GraphMapper::new(&snapshot, config).unwrap();
    let err = mapper.save(&entity(&hierarchy.loc1_1)).unwrap_err();
    match err {
        GraphWriteError::DoubleDeletion {
            node,
            relationship_type,
        } => {
            assert_eq!(node, 2);
            assert_eq!(relationship_type, "CHILD_OF");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_strict_deletes_allow_bounded_save() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    hierarchy.loc1_1.labels.borrow_mut().clear();

    let config = CompileConfig::default().with_strict_deletes(true).with_horizon(1);
    let mut mapper = GraphMapper::new(&snapshot, config).unwrap();
    mapper.save(&entity(&hierarchy.loc1_1)).unwrap();
    assert_eq!(mapper.compile().statements(), &[delete(4, 20, "LABELED")]);
}

#[test]
fn test_save_parent_after_new_child_keeps_parent_relationships() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    let loc1_4 = Node::new(None, "loc1_4");
    Node::adopt(&hierarchy.loc1, &loc1_4);

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&loc1_4)).unwrap();
    mapper.save(&entity(&hierarchy.loc1)).unwrap();

    let plan = mapper.compile();
    assert_eq!(
        plan.statements(),
        &[
            WriteStatement::CreateNode {
                reference: -1,
                labels: vec![NODE.into()],
                properties: json!({ "nodeId": "loc1_4" }),
            },
            create_rel(NodeRef::Pending(-1), NodeRef::Existing(2), "CHILD_OF", json!({})),
        ]
    );
    assert!(mapper.context().is_registered_relationship(&MappedRelationship::new(
        2,
        "HAS_TYPE",
        10,
        NODE,
        "NodeType"
    )));
    assert_eq!(mapper.reference_for(&entity(&loc1_4)), Some(-1));
    assert_eq!(mapper.reference_for(&entity(&hierarchy.loc1)), None);
}

#[test]
fn test_new_nodes_bind_to_assigned_ids() {
    let snapshot = MappingSnapshot::new();
    let child = Node::new(None, "child");
    let parent = Node::new(None, "parent");
    Node::adopt(&parent, &child);

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&child)).unwrap();
    let mut plan = mapper.compile();
    assert_eq!(plan.stats().nodes_created, 2);
    assert_eq!(plan.stats().relationships_created, 1);
    assert_eq!(plan.pending_references(), vec![-2, -1]);

    let context = mapper.context_mut();
    assert!(context.get_new_object(-1).is_some_and(|o| o.is(&child)));
    assert!(context.get_new_object(-2).is_some_and(|o| o.is(&parent)));
    context.register_new_id(-1, 57);
    context.register_new_id(-2, 58);
    assert_eq!(context.get_id(-1), 57);

    assert_eq!(plan.bind_strict(mapper.context()).unwrap(), 2);
    assert_eq!(
        plan.statements()[2],
        create_rel(NodeRef::Existing(57), NodeRef::Existing(58), "CHILD_OF", json!({}))
    );
}

#[test]
fn test_bounded_horizon_stops_expansion() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    hierarchy.loc1_1.labels.borrow_mut().clear();

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default().with_horizon(1)).unwrap();
    mapper.save(&entity(&hierarchy.root)).unwrap();
    assert!(mapper.compile().is_empty());

    let context = mapper.context();
    assert_eq!(context.visited_horizon(&object(&hierarchy.root)), Some(1));
    assert_eq!(context.visited_horizon(&object(&hierarchy.loc1)), Some(0));
    assert!(context.visited_node(&object(&hierarchy.loc1_1)).is_none());
}

#[test]
fn test_deeper_request_re_expands_shallow_visit() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    hierarchy.loc1_1.labels.borrow_mut().clear();

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default().with_horizon(1)).unwrap();
    mapper.save(&entity(&hierarchy.root)).unwrap();
    let builder = mapper.context().visited_node(&object(&hierarchy.loc1)).copied();

    mapper.map(&entity(&hierarchy.loc1), 2).unwrap();
    assert_eq!(mapper.context().visited_horizon(&object(&hierarchy.loc1)), Some(2));
    assert_eq!(mapper.context().visited_node(&object(&hierarchy.loc1)).copied(), builder);
    assert!(mapper.context().visited(&object(&hierarchy.loc1_1), 0));
    assert_eq!(mapper.compile().statements(), &[delete(4, 20, "LABELED")]);
}

#[test]
fn test_shallow_save_only_touches_root() {
    let (hierarchy, mut snapshot) = Hierarchy::loaded();
    snapshot.record_node(4, vec![NODE.into()], json!({ "nodeId": "before" }));
    hierarchy.loc1_1.labels.borrow_mut().clear();

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::shallow()).unwrap();
    mapper.save(&entity(&hierarchy.loc1_1)).unwrap();
    assert_eq!(
        mapper.compile().statements(),
        &[WriteStatement::UpdateNode {
            id: 4,
            labels: vec![NODE.into()],
            properties: json!({ "nodeId": "loc1_1" }),
        }]
    );
}

#[test]
fn test_unchanged_nodes_written_when_not_skipping() {
    let (hierarchy, snapshot) = Hierarchy::loaded();
    let config = CompileConfig::shallow().with_skip_unchanged(false);
    let mut mapper = GraphMapper::new(&snapshot, config).unwrap();
    mapper.save(&entity(&hierarchy.loc2)).unwrap();
    let plan = mapper.compile();
    assert_eq!(plan.stats().nodes_updated, 1);
    assert_eq!(plan.len(), 1);
}

#[test]
fn test_new_relationship_entity_is_created_once() {
    let mut snapshot = MappingSnapshot::new();
    snapshot.record_node(100, vec![MOVIE.into()], json!({ "title": "Up" }));
    let person = Person::new(None, "ann");
    let movie = Movie::new(Some(100), "Up");
    Rating::rate(None, &person, &movie, 5);

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&person)).unwrap();
    let plan = mapper.compile();
    assert_eq!(
        plan.statements(),
        &[
            WriteStatement::CreateNode {
                reference: -1,
                labels: vec![PERSON.into()],
                properties: json!({ "name": "ann" }),
            },
            create_rel(NodeRef::Pending(-1), NodeRef::Existing(100), "RATED", json!({ "stars": 5 })),
        ]
    );
    let transient = mapper
        .context()
        .get_transient_relationships(&SrcTargetKey::new(-1, 100));
    assert_eq!(transient.len(), 1);
}

fn rated_snapshot(stars: i64) -> MappingSnapshot {
    let mut snapshot = MappingSnapshot::new();
    snapshot.record_node(7, vec![PERSON.into()], json!({ "name": "bob" }));
    snapshot.record_node(100, vec![MOVIE.into()], json!({ "title": "Up" }));
    snapshot.record_relationship_entity(
        500,
        MappedRelationship::new(7, "RATED", 100, PERSON, MOVIE),
        json!({ "stars": stars }),
    );
    snapshot
}

#[test]
fn test_persisted_relationship_entity_updates_changed_properties() {
    let snapshot = rated_snapshot(2);
    let person = Person::new(Some(7), "bob");
    let movie = Movie::new(Some(100), "Up");
    Rating::rate(Some(500), &person, &movie, 3);

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&person)).unwrap();
    assert_eq!(
        mapper.compile().statements(),
        &[WriteStatement::UpdateRelationship {
            id: 500,
            relationship_type: "RATED".into(),
            properties: json!({ "stars": 3 }),
        }]
    );
    assert!(mapper.context().visited_relationship_entity(500));
}

#[test]
fn test_persisted_relationship_entity_unchanged_from_either_end() {
    let snapshot = rated_snapshot(4);
    let person = Person::new(Some(7), "bob");
    let movie = Movie::new(Some(100), "Up");
    Rating::rate(Some(500), &person, &movie, 4);

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&movie)).unwrap();
    assert!(mapper.compile().is_empty());
}

#[test]
fn test_removed_relationship_entity_is_deleted() {
    let snapshot = rated_snapshot(4);
    let person = Person::new(Some(7), "bob");

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&person)).unwrap();
    assert_eq!(mapper.compile().statements(), &[delete(7, 100, "RATED")]);
}

#[test]
fn test_replaced_relationship_entity_deletes_the_old_one() {
    let snapshot = rated_snapshot(4);
    let person = Person::new(Some(7), "bob");
    let movie = Movie::new(Some(100), "Up");
    Rating::rate(None, &person, &movie, 5);

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&person)).unwrap();
    assert_eq!(
        mapper.compile().statements(),
        &[
            create_rel(NodeRef::Existing(7), NodeRef::Existing(100), "RATED", json!({ "stars": 5 })),
            delete(7, 100, "RATED"),
        ]
    );
    let transient = mapper
        .context()
        .get_transient_relationships(&SrcTargetKey::new(7, 100));
    assert_eq!(transient.len(), 1);
}

fn parent_with_child() -> (Rc<Node>, Rc<Node>, MappingSnapshot) {
    let parent = Node::new(Some(100), "parent");
    let child = Node::new(Some(101), "child");
    Node::adopt(&parent, &child);
    let mut snapshot = MappingSnapshot::new();
    domain_common::load(&mut snapshot, &parent);
    domain_common::load(&mut snapshot, &child);
    (parent, child, snapshot)
}

#[test]
fn test_new_sibling_written_when_saving_from_existing_child() {
    let (parent, child, snapshot) = parent_with_child();
    let sibling = Node::new(None, "sibling");
    Node::adopt(&parent, &sibling);

    let expected = [
        WriteStatement::CreateNode {
            reference: -1,
            labels: vec![NODE.into()],
            properties: json!({ "nodeId": "sibling" }),
        },
        create_rel(NodeRef::Pending(-1), NodeRef::Existing(100), "CHILD_OF", json!({})),
    ];

    let mut from_child = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    from_child.save(&entity(&child)).unwrap();
    assert_eq!(from_child.compile().statements(), &expected);
    assert!(
        from_child
            .context()
            .is_registered_relationship(&MappedRelationship::new(101, "CHILD_OF", 100, NODE, NODE))
    );
    assert_eq!(from_child.context().get_deleted_relationships().count(), 0);

    let mut from_parent = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    from_parent.save(&entity(&parent)).unwrap();
    assert_eq!(from_parent.compile().statements(), &expected);
}

#[test]
fn test_persisted_node_linked_under_cleared_group_is_written() {
    let (parent, child, snapshot) = parent_with_child();
    let mut snapshot = snapshot;
    let stray = Node::new(Some(102), "stray");
    domain_common::load(&mut snapshot, &stray);
    Node::adopt(&parent, &stray);

    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    mapper.save(&entity(&child)).unwrap();
    assert_eq!(
        mapper.compile().statements(),
        &[create_rel(NodeRef::Existing(102), NodeRef::Existing(100), "CHILD_OF", json!({}))]
    );
    assert!(mapper.context().visited(&object(&stray), -10));
}

#[test]
fn test_invalid_horizon_is_rejected() {
    let snapshot = MappingSnapshot::new();
    let result = GraphMapper::new(&snapshot, CompileConfig::default().with_horizon(-2));
    assert!(matches!(result, Err(GraphWriteError::InvalidInput(_))));
}

#[test]
fn test_negative_persisted_id_is_rejected() {
    let snapshot = MappingSnapshot::new();
    let node = Node::new(Some(-4), "bad");
    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    let err = mapper.save(&entity(&node)).unwrap_err();
    assert!(matches!(err, GraphWriteError::InvalidInput(_)));
}

struct Unnamed;

impl NodeEntity for Unnamed {
    fn entity_type(&self) -> EntityType {
        EntityType::from(LABEL)
    }

    fn id(&self) -> Option<i64> {
        Some(1)
    }

    fn properties(&self) -> Value {
        json!({})
    }

    fn relationships(&self) -> Vec<RelationshipField> {
        vec![RelationshipField::outgoing(" ", NODE)]
    }
}

#[test]
fn test_blank_relationship_type_is_rejected() {
    let snapshot = MappingSnapshot::new();
    let mut mapper = GraphMapper::new(&snapshot, CompileConfig::default()).unwrap();
    let unnamed: Rc<dyn NodeEntity> = Rc::new(Unnamed);
    let err = mapper.save(&unnamed).unwrap_err();
    assert!(matches!(err, GraphWriteError::InvalidInput(_)));
}
