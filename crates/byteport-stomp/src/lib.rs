//! Byteport STOMP - message-queue transport over a persistent broker link
//!
//! Publishes single data items to a fixed queue destination on the first
//! broker host of an ordered candidate list that accepts the connection.
//! The broker virtual host is the namespace by convention, so a consumer
//! must be running on that vhost.
//!
//! ## Quick Start
//!
//! ```no_run
//! use byteport_core::DataPoint;
//! use byteport_stomp::{StompClient, StompConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StompConfig::new("myns", "user", "pass");
//!     let mut client = StompClient::connect(config).await?;
//!
//!     let point = DataPoint::new().field("temperature", 21.5);
//!     client.store(&point, "dev1").await?;
//!     client.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod connection;
pub mod frame;

// Re-exports for convenience
pub use client::{StompClient, StompConfig, DEFAULT_BROKER_HOSTS, DEFAULT_BROKER_PORT, QUEUE_NAME};
pub use connection::BrokerConnection;
pub use frame::Frame;
