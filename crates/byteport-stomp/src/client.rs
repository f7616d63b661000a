//! STOMP client with ordered host failover
//!
//! Candidate broker hosts are tried in list order; the first one that
//! accepts the connection wins and per-host failures are logged and
//! swallowed. When no candidate accepts, construction fails fast with
//! `BrokerUnavailable` rather than deferring the error to the first
//! publish.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use byteport_core::error::{ByteportError, ByteportResult};
use byteport_core::transport::Transport;
use byteport_core::value::DataPoint;

use crate::connection::BrokerConnection;

/// Default candidate broker hosts, tried in order
pub const DEFAULT_BROKER_HOSTS: [&str; 4] = [
    "broker.igw.se",
    "broker1.igw.se",
    "broker2.igw.se",
    "broker3.igw.se",
];

/// Default STOMP port, appended to hosts given without one
pub const DEFAULT_BROKER_PORT: u16 = 61613;

/// Queue destination every data message is published to
pub const QUEUE_NAME: &str = "/queue/simple_string_dev_message";

/// STOMP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StompConfig {
    /// Candidate broker hosts, `host` or `host:port`
    pub broker_hosts: Vec<String>,

    /// Namespace; doubles as the broker virtual host
    pub namespace: String,

    /// Broker login
    pub login: String,

    /// Broker passcode
    pub passcode: String,

    /// Per-host connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl StompConfig {
    /// Configuration with the default broker host list
    pub fn new(
        namespace: impl Into<String>,
        login: impl Into<String>,
        passcode: impl Into<String>,
    ) -> Self {
        Self {
            broker_hosts: DEFAULT_BROKER_HOSTS.iter().map(|h| h.to_string()).collect(),
            namespace: namespace.into(),
            login: login.into(),
            passcode: passcode.into(),
            connect_timeout_ms: 10_000,
        }
    }

    /// Replace the candidate host list, builder style
    pub fn broker_hosts(mut self, hosts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.broker_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Get the per-host connect timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Message-queue submission transport
pub struct StompClient {
    namespace: String,
    connection: Option<BrokerConnection>,
}

impl StompClient {
    /// Connect to the first candidate broker host that accepts
    pub async fn connect(config: StompConfig) -> ByteportResult<Self> {
        for host in &config.broker_hosts {
            let addr = if host.contains(':') {
                host.clone()
            } else {
                format!("{host}:{DEFAULT_BROKER_PORT}")
            };

            match BrokerConnection::open(
                &addr,
                &config.namespace,
                &config.login,
                &config.passcode,
                config.connect_timeout(),
            )
            .await
            {
                Ok(connection) => {
                    info!("connected to broker {addr}");
                    return Ok(Self {
                        namespace: config.namespace,
                        connection: Some(connection),
                    });
                }
                Err(e) => {
                    warn!("broker {addr} not usable: {e}");
                }
            }
        }

        Err(ByteportError::BrokerUnavailable)
    }

    /// Host of the active connection
    pub fn connected_host(&self) -> Option<&str> {
        self.connection.as_ref().map(BrokerConnection::host)
    }

    /// Tear down the broker connection
    pub async fn disconnect(&mut self) -> ByteportResult<()> {
        let connection = self
            .connection
            .take()
            .ok_or(ByteportError::NotConnected)?;
        connection.disconnect().await
    }

    /// Publish one data point to the queue destination
    ///
    /// The message is a JSON array holding exactly one object with string
    /// values: the device uid, the namespace, the encoded fields as
    /// semicolon-delimited `key=value` pairs, and the normalized timestamp
    /// (current whole epoch seconds when the point carries none).
    pub async fn store(&mut self, point: &DataPoint, device_uid: &str) -> ByteportResult<()> {
        let encoded = point.encode()?;
        let data = encoded
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join(";");

        let timestamp = match point.timestamp() {
            Some(ts) => ts.normalize()?,
            None => Utc::now().timestamp().to_string(),
        };

        let message = serde_json::json!([{
            "uid": device_uid,
            "namespace": self.namespace,
            "data": data,
            "timestamp": timestamp,
        }]);
        let body = serde_json::to_vec(&message)?;

        let connection = self
            .connection
            .as_mut()
            .ok_or(ByteportError::NotConnected)?;
        connection.send(QUEUE_NAME, &body).await
    }
}

#[async_trait]
impl Transport for StompClient {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn submit(&mut self, device_uid: &str, point: &DataPoint) -> ByteportResult<()> {
        self.store(point, device_uid).await
    }
}
