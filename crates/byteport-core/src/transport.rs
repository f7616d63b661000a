//! Transport trait implemented by every submission protocol

use async_trait::async_trait;

use crate::error::ByteportResult;
use crate::value::DataPoint;

/// Reserved payload field carrying the API key
pub const RESERVED_KEY_FIELD: &str = "_key";

/// Reserved payload field carrying the normalized timestamp
pub const RESERVED_TIMESTAMP_FIELD: &str = "_ts";

/// A protocol-specific mechanism for delivering a data point
///
/// Submission is a single attempt: on failure the typed error surfaces
/// immediately and nothing is retried or queued. Mutating calls take
/// `&mut self`; one transport instance must not be shared across concurrent
/// submits.
#[async_trait]
pub trait Transport: Send {
    /// Namespace this transport submits into
    fn namespace(&self) -> &str;

    /// Deliver a single data point for a device
    async fn submit(&mut self, device_uid: &str, point: &DataPoint) -> ByteportResult<()>;
}
