use std::{
    cell::RefCell,
    rc::{Rc, Weak},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

use crate::{
    mappable::MappedRelationship,
    mapper::{NodeEntity, RelationshipField},
    snapshot::MappingSnapshot,
    types::EntityType,
};

pub const BENCH_NODE_TYPE: &str = "BenchNode";
pub const BENCH_EDGE_TYPE: &str = "LINK";

/// Object-graph node used by the benches. Edges hold weak references so the
/// cyclic graphs the generators produce are freed with the dataset.
#[derive(Debug)]
pub struct BenchNode {
    pub idx: usize,
    pub id: Option<i64>,
    links: RefCell<Vec<Weak<BenchNode>>>,
}

impl BenchNode {
    fn new(idx: usize, persisted: bool) -> Self {
        Self {
            idx,
            id: persisted.then_some(idx as i64),
            links: RefCell::new(Vec::new()),
        }
    }

    pub fn links(&self) -> Vec<Rc<BenchNode>> {
        self.links.borrow().iter().filter_map(Weak::upgrade).collect()
    }
}

impl NodeEntity for BenchNode {
    fn entity_type(&self) -> EntityType {
        EntityType::from(BENCH_NODE_TYPE)
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn properties(&self) -> Value {
        json!({ "idx": self.idx })
    }

    fn relationships(&self) -> Vec<RelationshipField> {
        vec![
            RelationshipField::outgoing(BENCH_EDGE_TYPE, BENCH_NODE_TYPE).with_nodes(
                self.links()
                    .into_iter()
                    .map(|node| node as Rc<dyn NodeEntity>),
            ),
        ]
    }
}

#[derive(Clone, Debug)]
pub struct GraphDataset {
    pub nodes: Vec<Rc<BenchNode>>,
    pub snapshot: MappingSnapshot,
    pub edges: usize,
}

impl GraphDataset {
    pub fn root(&self) -> Rc<dyn NodeEntity> {
        self.nodes[0].clone()
    }
}

#[derive(Clone, Debug)]
pub enum GraphShape {
    Line,
    Star,
    RandomErdosRenyi { edges: usize },
}

/// Builds an object graph of `node_count` nodes. The first `persisted` nodes
/// carry database ids and appear in the snapshot together with every edge
/// between them; every seventh of those edges is then dropped from the object
/// graph so a save has deletions to find.
pub fn generate_graph(
    shape: GraphShape,
    node_count: usize,
    persisted: usize,
    seed: u64,
) -> GraphDataset {
    assert!(node_count > 1, "node_count must exceed 1");
    let nodes: Vec<Rc<BenchNode>> = (0..node_count)
        .map(|idx| Rc::new(BenchNode::new(idx, idx < persisted)))
        .collect();
    let mut edges = match shape {
        GraphShape::Line => (0..node_count - 1).map(|idx| (idx, idx + 1)).collect(),
        GraphShape::Star => (1..node_count).map(|leaf| (0, leaf)).collect(),
        GraphShape::RandomErdosRenyi { edges } => generate_random_edges(node_count, edges, seed),
    };
    edges.sort_unstable();

    let mut snapshot = MappingSnapshot::new();
    for node in nodes.iter().take(persisted) {
        snapshot.record_node(
            node.idx as i64,
            vec![BENCH_NODE_TYPE.to_string()],
            node.properties(),
        );
    }
    let mut kept = 0;
    for (position, &(from, to)) in edges.iter().enumerate() {
        let persisted_edge = from < persisted && to < persisted;
        if persisted_edge {
            snapshot.record_relationship(MappedRelationship::new(
                from as i64,
                BENCH_EDGE_TYPE,
                to as i64,
                BENCH_NODE_TYPE,
                BENCH_NODE_TYPE,
            ));
            if position % 7 == 0 {
                continue;
            }
        }
        nodes[from].links.borrow_mut().push(Rc::downgrade(&nodes[to]));
        kept += 1;
    }
    GraphDataset {
        nodes,
        snapshot,
        edges: kept,
    }
}

fn generate_random_edges(node_count: usize, edge_count: usize, seed: u64) -> Vec<(usize, usize)> {
    let total_pairs = pair_count(node_count);
    assert!(
        edge_count as u128 <= total_pairs,
        "edge_count exceeds possible pairs"
    );
    let mut rng = StdRng::seed_from_u64(seed);
    let mut edges = Vec::with_capacity(edge_count);
    let mut idx = 0u64;
    let mut remaining_edges = edge_count as u64;
    while remaining_edges > 0 && idx < total_pairs as u64 {
        let remaining_pairs = total_pairs as u64 - idx;
        let p = remaining_edges as f64 / remaining_pairs as f64;
        idx += sample_geometric(&mut rng, p);
        if idx >= total_pairs as u64 {
            break;
        }
        let (from, to) = pair_from_index(idx, node_count as u64);
        edges.push((from as usize, to as usize));
        idx += 1;
        remaining_edges -= 1;
    }
    edges
}

fn pair_count(nodes: usize) -> u128 {
    let n = nodes as u128;
    n * (n - 1) / 2
}

fn sample_geometric(rng: &mut StdRng, p: f64) -> u64 {
    let u = rng.r#gen::<f64>().max(f64::MIN_POSITIVE);
    ((u.ln() / (1.0 - p).ln()).floor().max(0.0)) as u64
}

fn pair_from_index(idx: u64, nodes: u64) -> (u64, u64) {
    let mut left = 0;
    let mut start = 0u64;
    while left < nodes - 1 {
        let remaining = nodes - left - 1;
        if idx < start + remaining {
            return (left, left + 1 + (idx - start));
        }
        start += remaining;
        left += 1;
    }
    (nodes - 2, nodes - 1)
}
