//! STOMP 1.2 frame codec
//!
//! Only the small client subset the broker exchange needs: CONNECT, SEND,
//! and DISCONNECT outbound; CONNECTED, ERROR, and RECEIPT inbound. A frame
//! is a command line, header lines, a blank line, and a NUL-terminated
//! body. Header values are escaped on every frame except CONNECT and
//! CONNECTED, per the protocol.

use byteport_core::error::{ByteportError, ByteportResult};

/// A single STOMP frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command, e.g. `CONNECT`
    pub command: String,

    /// Headers in write order; lookups return the first match
    pub headers: Vec<(String, String)>,

    /// Frame body; empty for control frames
    pub body: Vec<u8>,
}

impl Frame {
    /// Create a bodyless frame
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Append a header, builder style
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body, builder style
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// First value of a header, if present
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether header values of this command are escaped on the wire
    fn escaped(command: &str) -> bool {
        !matches!(command, "CONNECT" | "CONNECTED" | "STOMP")
    }

    /// Serialize to wire bytes, including the NUL terminator
    pub fn encode(&self) -> Vec<u8> {
        let escape = Self::escaped(&self.command);
        let mut out = Vec::with_capacity(self.body.len() + 64);

        out.extend_from_slice(self.command.as_bytes());
        out.push(b'\n');
        for (name, value) in &self.headers {
            let line = if escape {
                format!("{}:{}", escape_header(name), escape_header(value))
            } else {
                format!("{name}:{value}")
            };
            out.extend_from_slice(line.as_bytes());
            out.push(b'\n');
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }

    /// Parse wire bytes without the NUL terminator
    pub fn decode(raw: &[u8]) -> ByteportResult<Self> {
        let (header_end, body_start) = find_blank_line(raw)
            .ok_or_else(|| ByteportError::Protocol("frame without header terminator".to_string()))?;

        let head = std::str::from_utf8(&raw[..header_end])
            .map_err(|_| ByteportError::Protocol("frame head is not UTF-8".to_string()))?;
        let mut lines = head.lines().map(|l| l.trim_end_matches('\r'));

        let command = lines
            .next()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ByteportError::Protocol("frame without command".to_string()))?
            .to_string();
        let escape = Self::escaped(&command);

        let mut headers = Vec::new();
        for line in lines {
            let (name, value) = line.split_once(':').ok_or_else(|| {
                ByteportError::Protocol(format!("malformed header line '{line}'"))
            })?;
            if escape {
                headers.push((unescape_header(name)?, unescape_header(value)?));
            } else {
                headers.push((name.to_string(), value.to_string()));
            }
        }

        let body = raw.get(body_start..).unwrap_or_default().to_vec();

        Ok(Self {
            command,
            headers,
            body,
        })
    }
}

/// Locate the blank line separating headers from body
///
/// Returns the head length and the body offset. The earliest candidate
/// wins, so a body containing blank lines cannot shift the split.
fn find_blank_line(raw: &[u8]) -> Option<(usize, usize)> {
    let lf = raw
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|p| (p, p + 2));
    let crlf = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .map(|p| (p, p + 4));

    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

fn escape_header(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(value: &str) -> ByteportResult<String> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some('c') => out.push(':'),
            other => {
                return Err(ByteportError::Protocol(format!(
                    "invalid header escape sequence '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )))
            }
        }
    }
    Ok(out)
}
