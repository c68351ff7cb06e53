/// Convenience result type used across atlasflip.
pub type AtlasflipResult<T> = Result<T, AtlasflipError>;

/// Top-level error taxonomy used by renderer APIs.
#[derive(thiserror::Error, Debug)]
pub enum AtlasflipError {
    /// Invalid caller-provided configuration or descriptor shape.
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed or inconsistent package content (missing symbols, bad regions, cycles).
    #[error("content error: {0}")]
    Content(String),

    /// Memory exhaustion that adaptive batching could not absorb.
    #[error("resource error: {0}")]
    Resource(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AtlasflipError {
    /// Build an [`AtlasflipError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build an [`AtlasflipError::Content`] value.
    pub fn content(msg: impl Into<String>) -> Self {
        Self::Content(msg.into())
    }

    /// Build an [`AtlasflipError::Resource`] value.
    pub fn resource(msg: impl Into<String>) -> Self {
        Self::Resource(msg.into())
    }

    /// Build an [`AtlasflipError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
