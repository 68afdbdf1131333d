use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a node or relationship entity, used to tell apart
/// relationship groups connecting the same node with different kinds of
/// neighbour.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityType(pub String);

impl EntityType {
    pub fn new<T: Into<String>>(name: T) -> Self {
        EntityType(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityType {
    fn from(value: &str) -> Self {
        EntityType(value.to_owned())
    }
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        EntityType(value)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Which end of a relationship a node sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeSide {
    Start,
    End,
}

impl From<Direction> for NodeSide {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Outgoing => NodeSide::Start,
            Direction::Incoming => NodeSide::End,
        }
    }
}
