/// Convenience result type used across cineforge.
pub type CineforgeResult<T> = Result<T, CineforgeError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Degradations (a skipped image, a missing audio track, a less preferred encoding) are not
/// errors; they are logged and reported by the capture driver instead.
#[derive(thiserror::Error, Debug)]
pub enum CineforgeError {
    /// Invalid host-provided inputs or configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Asset bytes that could not be decoded into a renderable form.
    #[error("decode error: {0}")]
    Decode(String),

    /// Failures inside a drawing surface.
    #[error("render error: {0}")]
    Render(String),

    /// Failures while starting, feeding or finishing an encoder.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CineforgeError {
    /// Build a [`CineforgeError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CineforgeError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`CineforgeError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`CineforgeError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`CineforgeError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
