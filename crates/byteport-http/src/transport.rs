//! `Transport` implementation backed by the HTTP client
//!
//! POST and GET submission are one implementation with a swappable payload
//! placement strategy, selected through `HttpConfig::placement`.

use async_trait::async_trait;

use byteport_core::error::{ByteportError, ByteportResult};
use byteport_core::transport::Transport;
use byteport_core::value::DataPoint;

use crate::client::ByteportHttpClient;

/// HTTP submission transport
///
/// Wraps a store-enabled [`ByteportHttpClient`]; construction fails when the
/// client carries no namespace or API key.
pub struct HttpTransport {
    client: ByteportHttpClient,
    namespace: String,
}

impl HttpTransport {
    /// Create a transport from a store-enabled client
    pub fn new(client: ByteportHttpClient) -> ByteportResult<Self> {
        let namespace = client
            .config()
            .namespace
            .clone()
            .filter(|_| client.config().store_enabled())
            .ok_or_else(|| {
                ByteportError::Config(
                    "HTTP transport requires a namespace and an API key".to_string(),
                )
            })?;

        Ok(Self { client, namespace })
    }

    /// Access the wrapped client, e.g. for the query API
    pub fn client_mut(&mut self) -> &mut ByteportHttpClient {
        &mut self.client
    }

    /// Unwrap back into the client
    pub fn into_inner(self) -> ByteportHttpClient {
        self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn submit(&mut self, device_uid: &str, point: &DataPoint) -> ByteportResult<()> {
        self.client.store(point, Some(device_uid)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;

    #[test]
    fn test_requires_store_credentials() {
        let client = ByteportHttpClient::new(HttpConfig::default()).unwrap();
        assert!(matches!(
            HttpTransport::new(client),
            Err(ByteportError::Config(_))
        ));
    }

    #[test]
    fn test_exposes_namespace() {
        let config = HttpConfig::new("http://localhost:1", "myns", "secret");
        let client = ByteportHttpClient::new(config).unwrap();
        let transport = HttpTransport::new(client).unwrap();
        assert_eq!(transport.namespace(), "myns");
    }
}
