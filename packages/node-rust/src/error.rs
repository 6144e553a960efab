use devsim_core::ConfigError;

use crate::traits::SinkError;

/// Errors returned by a simulator node and its handles.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("simulator node is stopped")]
    Stopped,
    #[error("emission failed: {0}")]
    Emit(#[from] SinkError),
}

/// Errors returned by administrative operations on registered nodes.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("permission denied: {permission} required")]
    Forbidden { permission: &'static str },
    #[error("node not found: {id}")]
    NotFound { id: String },
    #[error("manual trigger failed: {0}")]
    TriggerFailed(#[source] NodeError),
}
