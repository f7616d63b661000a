//! Error types shared by all Byteport transports

use thiserror::Error;

/// Errors surfaced by the Byteport client
///
/// Every failure is reported synchronously from the call that triggered it;
/// nothing is retried internally.
#[derive(Debug, Error)]
pub enum ByteportError {
    /// Network, DNS, or proxy-level failure reaching the service
    #[error("failed to connect to Byteport: {0}")]
    ConnectFailed(String),

    /// Authorization denied (HTTP 403) outside of the login flow
    #[error("you were not allowed to access the requested resource")]
    Forbidden,

    /// HTTP 404, device not registered under the namespace
    #[error("device not found, make sure the device is registered under namespace {namespace}")]
    DeviceNotFound {
        /// Namespace the store call was scoped to
        namespace: String,
    },

    /// Caller requested an unknown compression token
    #[error("unsupported compression method '{0}'")]
    UnsupportedCompression(String),

    /// Timestamp value that cannot be normalized
    #[error("unsupported timestamp value: {0}")]
    UnsupportedTimestamp(String),

    /// Field name violates the naming rule
    #[error("invalid field name '{0}'")]
    InvalidFieldName(String),

    /// Value that has no text representation
    #[error("invalid data value: {0}")]
    InvalidDataType(String),

    /// Credential rejection or missing post-login session cookie
    ///
    /// Callers matching on this variant can re-prompt for username and
    /// password instead of treating it as an authorization failure.
    #[error("failed to login user {0}")]
    LoginFailed(String),

    /// Session/cookie bookkeeping failure (e.g. missing CSRF cookie)
    #[error("session error: {0}")]
    Session(String),

    /// Client configuration problem (e.g. store called without credentials)
    #[error("configuration error: {0}")]
    Config(String),

    /// No candidate broker host accepted the connection
    #[error("no broker host accepted the connection")]
    BrokerUnavailable,

    /// Publish attempted without an established broker connection
    #[error("not connected to a broker")]
    NotConnected,

    /// Broker violated the expected protocol exchange
    #[error("broker protocol error: {0}")]
    Protocol(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unmapped transport failure; not translated into the taxonomy
    #[error("transport failure: {0}")]
    Transport(String),
}

impl ByteportError {
    /// Check if a caller retry can reasonably succeed without changes
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ByteportError::ConnectFailed(_) | ByteportError::BrokerUnavailable
        )
    }

    /// Check if the error indicates bad payload data the caller must fix
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            ByteportError::InvalidFieldName(_)
                | ByteportError::InvalidDataType(_)
                | ByteportError::UnsupportedCompression(_)
                | ByteportError::UnsupportedTimestamp(_)
        )
    }
}

/// Result type for Byteport operations
pub type ByteportResult<T> = Result<T, ByteportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(ByteportError::ConnectFailed("refused".to_string()).is_retryable());
        assert!(ByteportError::BrokerUnavailable.is_retryable());
        assert!(!ByteportError::Forbidden.is_retryable());
        assert!(!ByteportError::LoginFailed("bob".to_string()).is_retryable());
    }

    #[test]
    fn test_is_data_error() {
        assert!(ByteportError::InvalidFieldName("bad name".to_string()).is_data_error());
        assert!(ByteportError::UnsupportedCompression("lzma".to_string()).is_data_error());
        assert!(!ByteportError::NotConnected.is_data_error());
    }

    #[test]
    fn test_device_not_found_message_names_namespace() {
        let err = ByteportError::DeviceNotFound {
            namespace: "acme".to_string(),
        };
        assert!(err.to_string().contains("acme"));
    }
}
