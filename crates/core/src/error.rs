//! Errors raised while interpreting API payloads

/// Standard result type for core operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Errors raised while interpreting product payloads
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, thiserror::Error)]
pub enum CoreError {
    /// The server answered with `isSuccess: false`
    #[error("Request rejected by server: {message}")]
    Rejected {
        code: Option<String>,
        message: String,
    },

    /// The envelope reported success but carried no result
    #[error("Missing result in response envelope")]
    MissingResult,
}

impl CoreError {
    /// Create a rejection error
    pub fn rejected(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            code,
            message: message.into(),
        }
    }
}
