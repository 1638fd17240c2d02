//! Result type alias for process management operations.

/// A `Result` alias where the error case is [`crate::Error`].
pub type Result<T> = std::result::Result<T, crate::Error>;
