//! Broker connection handling
//!
//! One established STOMP link to one broker host, bound to a virtual host
//! equal to the namespace by convention. The consumer side of that vhost is
//! expected to be a message-boss instance.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use byteport_core::error::{ByteportError, ByteportResult};

use crate::frame::Frame;

/// An established link to one message-queue broker host
pub struct BrokerConnection {
    stream: BufReader<TcpStream>,
    host: String,
}

impl BrokerConnection {
    /// Connect to one broker host and complete the STOMP handshake
    pub async fn open(
        host: &str,
        vhost: &str,
        login: &str,
        passcode: &str,
        connect_timeout: Duration,
    ) -> ByteportResult<Self> {
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(host))
            .await
            .map_err(|_| {
                ByteportError::ConnectFailed(format!("connection to {host} timed out"))
            })?
            .map_err(|e| ByteportError::ConnectFailed(format!("failed to reach {host}: {e}")))?;

        let mut connection = Self {
            stream: BufReader::new(stream),
            host: host.to_string(),
        };

        let connect = Frame::new("CONNECT")
            .header("accept-version", "1.2")
            .header("host", vhost)
            .header("login", login)
            .header("passcode", passcode)
            .header("heart-beat", "0,0");
        connection.write_frame(&connect).await?;

        let reply = connection.read_frame().await?;
        match reply.command.as_str() {
            "CONNECTED" => {
                debug!(
                    "connected to {} using protocol version {}",
                    connection.host,
                    reply.header_value("version").unwrap_or("unknown")
                );
                Ok(connection)
            }
            "ERROR" => Err(ByteportError::ConnectFailed(format!(
                "broker {} refused the connection: {}",
                connection.host,
                reply.header_value("message").unwrap_or("no reason given")
            ))),
            other => Err(ByteportError::Protocol(format!(
                "unexpected frame '{other}' during handshake"
            ))),
        }
    }

    /// The broker host this connection is bound to
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Publish a message body to a destination
    pub async fn send(&mut self, destination: &str, body: &[u8]) -> ByteportResult<()> {
        let frame = Frame::new("SEND")
            .header("destination", destination)
            .header("content-type", "application/json")
            .header("content-length", body.len().to_string())
            .body(body.to_vec());
        self.write_frame(&frame).await
    }

    /// Tear the link down explicitly
    pub async fn disconnect(mut self) -> ByteportResult<()> {
        self.write_frame(&Frame::new("DISCONNECT")).await?;
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    async fn write_frame(&mut self, frame: &Frame) -> ByteportResult<()> {
        self.stream.get_mut().write_all(&frame.encode()).await?;
        self.stream.get_mut().flush().await?;
        Ok(())
    }

    /// Read one frame off the wire
    ///
    /// Frames are NUL-delimited; every body this client exchanges is
    /// NUL-free JSON or empty, so delimiter reads are unambiguous.
    async fn read_frame(&mut self) -> ByteportResult<Frame> {
        let mut raw = Vec::new();
        loop {
            raw.clear();
            let read = self.stream.read_until(0, &mut raw).await?;
            if read == 0 {
                return Err(ByteportError::ConnectFailed(format!(
                    "broker {} closed the connection",
                    self.host
                )));
            }
            if raw.last() == Some(&0) {
                raw.pop();
            }
            // Skip keep-alive newlines between frames
            while raw.first().is_some_and(|b| *b == b'\n' || *b == b'\r') {
                raw.remove(0);
            }
            if !raw.is_empty() {
                return Frame::decode(&raw);
            }
        }
    }
}
