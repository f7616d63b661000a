//! Byteport Core - Data model, validation, and transport abstractions
//!
//! This crate provides the foundation shared by every Byteport transport:
//!
//! - **Values**: the closed set of scalar kinds a data point may carry
//! - **Timestamps**: normalization to the canonical epoch-seconds form
//! - **Fields**: the field naming rule enforced before submission
//! - **Encoding**: UTF-8 text encoding, compression, base64 blobs
//! - **Transport**: the trait implemented by the HTTP and STOMP clients

pub mod encode;
pub mod error;
pub mod fields;
pub mod timestamp;
pub mod transport;
pub mod value;

// Re-export commonly used types
pub use encode::{compress, encode_blob, Compression};
pub use error::{ByteportError, ByteportResult};
pub use fields::{ensure_valid_field_name, is_valid_field_name};
pub use timestamp::Timestamp;
pub use transport::{Transport, RESERVED_KEY_FIELD, RESERVED_TIMESTAMP_FIELD};
pub use value::{DataPoint, Value};

/// Client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
