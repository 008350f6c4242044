use thiserror::Error;

/// Pipeline failure classes.
///
/// Every variant leaves the pipeline not-ready: captures become no-ops
/// until a subsequent `update` succeeds. There are no transient errors; a
/// slow GPU is handled by the update policy, never reported here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("pipeline setup failed: {0}")]
    Setup(String),

    #[error("configuration mismatch: {0}")]
    ConfigMismatch(String),

    #[error("GPU resource allocation failed: {0}")]
    ResourceExhausted(String),

    #[error("persisted artifact rejected: {0}")]
    InvalidArtifact(String),
}

impl Error {
    pub(crate) fn setup(message: impl Into<String>) -> Self {
        Self::Setup(message.into())
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::ConfigMismatch(message.into())
    }

    pub(crate) fn exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted(message.into())
    }

    pub(crate) fn artifact(message: impl Into<String>) -> Self {
        Self::InvalidArtifact(message.into())
    }
}
