//! Error types for tile compositing and localization

/// Result type alias for tile operations
pub type Result<T> = std::result::Result<T, Error>;

/// Tile operation error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Caller-supplied request is malformed
    #[error("invalid argument: {0}")]
    Validation(String),

    /// Request is well-formed but cannot be satisfied
    #[error("{0}")]
    InvalidRequest(String),

    /// Protocol buffer error
    #[error("protocol buffer error: {0}")]
    Protobuf(#[from] prost::DecodeError),

    /// Malformed tile structure outside the protobuf layer
    #[error("decode error: {0}")]
    Decode(String),

    /// Malformed geometry command stream
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Compression error
    #[error("compression error: {0}")]
    Compression(String),

    /// Decompression error
    #[error("decompression error: {0}")]
    Decompression(String),

    /// Decompressed output would exceed the configured cap
    #[error("decompressed tile would exceed the {limit} byte limit")]
    SizeLimit { limit: usize },

    /// Unexpected failure during serialization
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new invalid-request error
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        Error::InvalidRequest(msg.into())
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Error::Decode(msg.into())
    }

    /// Create a new geometry error
    pub fn geometry<S: Into<String>>(msg: S) -> Self {
        Error::Geometry(msg.into())
    }

    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Error::Compression(msg.into())
    }

    /// Create a new decompression error
    pub fn decompression<S: Into<String>>(msg: S) -> Self {
        Error::Decompression(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }
}
