//! Byteport HTTP - store transports, session login, and query API
//!
//! This crate talks to the Byteport REST API:
//!
//! - **Client**: store submissions, the cookie login flow, read-side queries
//! - **Transport**: [`Transport`](byteport_core::Transport) implementation
//!   with a swappable POST-body / GET-query payload placement
//! - **Watch**: directory polling helper submitting content changes
//!
//! ## Quick Start
//!
//! ```no_run
//! use byteport_core::DataPoint;
//! use byteport_http::{ByteportHttpClient, HttpConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = HttpConfig::new("http://api.byteport.se", "myns", "api-key")
//!         .default_device_uid("dev1");
//!     let mut client = ByteportHttpClient::connect(config).await?;
//!
//!     let point = DataPoint::new().field("temperature", 21.5);
//!     client.store(&point, None).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod session;
pub mod transport;
pub mod watch;

// Re-exports for convenience
pub use client::ByteportHttpClient;
pub use config::{HttpConfig, PayloadPlacement, SocksProxy, DEFAULT_API_ENDPOINT};
pub use session::{Session, SessionState};
pub use transport::HttpTransport;
pub use watch::DirectoryWatch;
