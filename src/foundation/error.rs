/// Convenience result type used across framestage.
pub type StageResult<T> = Result<T, StageError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Runtime engine faults (a frame that failed to decode, a paint before the pool is ready,
/// a container with no measured size) are never reported through this type; they are
/// silent skips. `StageError` covers configuration, IO and surface allocation.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    /// Invalid user-provided configuration or descriptor data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while fetching or decoding a source image.
    #[error("asset error: {0}")]
    Asset(String),

    /// Errors while allocating or painting a surface.
    #[error("render error: {0}")]
    Render(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    /// Build a [`StageError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StageError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`StageError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`StageError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
