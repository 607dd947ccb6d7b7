use thiserror::Error;

use crate::core::types::NodeId;

#[derive(Error, Debug)]
pub enum PopError {
    #[error("Reference error between {from} and {to}: {detail}")]
    Reference {
        from: NodeId,
        to: NodeId,
        detail: String,
    },

    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Generation error: {what} (gave up after {attempts} attempts)")]
    Generation { what: String, attempts: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl PopError {
    pub fn reference(from: impl Into<NodeId>, to: impl Into<NodeId>, detail: impl Into<String>) -> Self {
        PopError::Reference {
            from: from.into(),
            to: to.into(),
            detail: detail.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        PopError::Configuration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, PopError>;
