//! Payload compression and binary encoding
//!
//! Compressed (or deliberately uncompressed) blobs are always base64-encoded
//! before being placed into a single designated payload field, so the result
//! survives form and URL encoding unchanged.

use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::{ByteportError, ByteportResult};

/// Compression applied to a blob before base64 encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// Pass the payload through unchanged
    #[default]
    None,

    /// DEFLATE in a zlib container; selected by the `gzip` token
    Deflate,

    /// Burrows-Wheeler compression; selected by the `bzip2` token
    Bzip2,
}

impl Compression {
    /// Parse a compression token
    ///
    /// Fails with `UnsupportedCompression` for any token outside `none`,
    /// `gzip`, `bzip2`.
    pub fn from_token(token: &str) -> ByteportResult<Self> {
        match token {
            "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Deflate),
            "bzip2" => Ok(Compression::Bzip2),
            other => Err(ByteportError::UnsupportedCompression(other.to_string())),
        }
    }

    /// The wire token for this algorithm
    pub fn token(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Deflate => "gzip",
            Compression::Bzip2 => "bzip2",
        }
    }
}

/// Compress a payload with the selected algorithm
///
/// `Compression::None` returns the input unchanged.
pub fn compress(data: &[u8], compression: Compression) -> ByteportResult<Vec<u8>> {
    match compression {
        Compression::None => Ok(data.to_vec()),
        Compression::Deflate => Ok(miniz_oxide::deflate::compress_to_vec_zlib(data, 6)),
        Compression::Bzip2 => {
            let mut encoder = bzip2::read::BzEncoder::new(data, bzip2::Compression::best());
            let mut out = Vec::new();
            encoder.read_to_end(&mut out)?;
            Ok(out)
        }
    }
}

/// Compress a payload and render the base64 text placed into the designated
/// payload field
pub fn encode_blob(data: &[u8], compression: Compression) -> ByteportResult<String> {
    let compressed = compress(data, compression)?;
    Ok(BASE64.encode(compressed))
}
