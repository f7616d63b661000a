//! Configuration for the Byteport HTTP client
//!
//! All endpoint and credential knobs are immutable values injected at
//! construction; nothing is read from process-global state after that.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default API endpoint
pub const DEFAULT_API_ENDPOINT: &str = "http://api.byteport.se";

/// User-Agent sent on direct (non-proxied) requests
///
/// The API sits behind an edge/CDN layer that rejects requests without a
/// browser-identifying agent string.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Where the encoded payload is placed in the store request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadPlacement {
    /// Form-encoded POST body
    #[default]
    FormBody,

    /// URL query parameters on a GET request
    ///
    /// Bounded in practice by the ~2KB URL-length ceiling of intermediaries;
    /// keeping payloads small is the caller's responsibility, the client
    /// performs no size check.
    QueryString,
}

/// SOCKS proxy settings, e.g. for tunneling over `ssh -D`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocksProxy {
    /// Proxy host
    pub addr: String,

    /// Proxy port
    pub port: u16,

    /// Optional proxy username
    pub username: Option<String>,

    /// Optional proxy password
    pub password: Option<String>,
}

impl SocksProxy {
    /// Render the proxy URL understood by the HTTP stack
    pub(crate) fn url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("socks5://{}:{}@{}:{}", user, pass, self.addr, self.port)
            }
            _ => format!("socks5://{}:{}", self.addr, self.port),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// API endpoint, scheme and host
    pub endpoint: String,

    /// Namespace scoping devices and credentials
    ///
    /// Store operations are disabled when absent; the read-side query API
    /// remains available.
    pub namespace: Option<String>,

    /// API key attached to every stored payload
    pub api_key: Option<String>,

    /// Device uid used when a store call does not supply one
    pub default_device_uid: Option<String>,

    /// Payload placement strategy for store calls
    pub placement: PayloadPlacement,

    /// Optional SOCKS proxy
    pub proxy: Option<SocksProxy>,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,

    /// Send an empty store call on connect to verify the credentials
    pub initial_heartbeat: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_API_ENDPOINT.to_string(),
            namespace: None,
            api_key: None,
            default_device_uid: None,
            placement: PayloadPlacement::FormBody,
            proxy: None,
            timeout_ms: 30_000,
            initial_heartbeat: true,
        }
    }
}

impl HttpConfig {
    /// Create a store-enabled configuration
    pub fn new(
        endpoint: impl Into<String>,
        namespace: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespace: Some(namespace.into()),
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("BYTEPORT_API_ENDPOINT") {
            config.endpoint = val;
        }
        if let Ok(val) = std::env::var("BYTEPORT_NAMESPACE") {
            config.namespace = Some(val);
        }
        if let Ok(val) = std::env::var("BYTEPORT_API_KEY") {
            config.api_key = Some(val);
        }
        if let Ok(val) = std::env::var("BYTEPORT_DEVICE_UID") {
            config.default_device_uid = Some(val);
        }

        config
    }

    /// Set the default device uid, builder style
    pub fn default_device_uid(mut self, uid: impl Into<String>) -> Self {
        self.default_device_uid = Some(uid.into());
        self
    }

    /// Select the payload placement strategy, builder style
    pub fn placement(mut self, placement: PayloadPlacement) -> Self {
        self.placement = placement;
        self
    }

    /// Route requests through a SOCKS proxy, builder style
    pub fn proxy(mut self, proxy: SocksProxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Disable the connect-time heartbeat, builder style
    pub fn without_initial_heartbeat(mut self) -> Self {
        self.initial_heartbeat = false;
        self
    }

    /// Whether store operations can be used
    pub fn store_enabled(&self) -> bool {
        self.namespace.is_some() && self.api_key.is_some()
    }

    /// Get the request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
