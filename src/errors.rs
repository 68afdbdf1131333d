use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphWriteError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("relationship group already deleted: ({node})-[:{relationship_type}]")]
    DoubleDeletion {
        node: i64,
        relationship_type: String,
    },
    #[error("unresolved temporary reference: {0}")]
    UnresolvedReference(i64),
    #[error("not found: {0}")]
    NotFound(String),
}

impl GraphWriteError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GraphWriteError::InvalidInput(msg.into())
    }

    pub fn double_deletion<T: Into<String>>(node: i64, relationship_type: T) -> Self {
        GraphWriteError::DoubleDeletion {
            node,
            relationship_type: relationship_type.into(),
        }
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GraphWriteError::NotFound(msg.into())
    }
}
