use crate::{ConnectionId, NodeId};

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    #[error("invalid input: {message}")]
    Validation { message: String },

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    #[error("nodes {from} and {to} are already connected")]
    Duplicate { from: NodeId, to: NodeId },
}

impl EditorError {
    pub fn validation(message: impl Into<String>) -> Self {
        EditorError::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        EditorError::InvalidDocument {
            message: message.into(),
        }
    }

    /// Stale-id errors; callers are free to treat these as no-ops.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            EditorError::NodeNotFound(_) | EditorError::ConnectionNotFound(_)
        )
    }
}
