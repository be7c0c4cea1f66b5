//! Sample endpoints.
//!
//! Small protocol state machines with well-known behaviour, for driving a
//! pump in tests.

use bytes::{Bytes, BytesMut};
use iosim::{DisconnectReason, Endpoint, SimTransport};
use thiserror::Error;

/// Errors raised by harness endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    /// The endpoint refused a line it was sent.
    #[error("rejected line: {line}")]
    Rejected {
        /// The offending line, lossily decoded.
        line: String,
    },

    /// The endpoint was used before `connection_made`.
    #[error("endpoint not connected")]
    NotConnected,
}

/// Endpoint that records everything it is told.
///
/// Test code writes through it with [`send`](Self::send) and requests a
/// close with [`close`](Self::close).
#[derive(Debug, Default)]
pub struct Recorder {
    transport: Option<SimTransport>,
    received: Vec<u8>,
    chunks: usize,
    lost: Vec<DisconnectReason>,
}

impl Recorder {
    /// Create an unconnected recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the peer.
    pub fn send(&self, data: &[u8]) -> Result<(), HarnessError> {
        self.transport()?.write(data);
        Ok(())
    }

    /// Ask for the connection to be closed.
    pub fn close(&self) -> Result<(), HarnessError> {
        self.transport()?.lose_connection();
        Ok(())
    }

    /// This endpoint's transport.
    pub fn transport(&self) -> Result<&SimTransport, HarnessError> {
        self.transport.as_ref().ok_or(HarnessError::NotConnected)
    }

    /// Every byte received, in arrival order.
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Number of `data_received` calls.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Reasons passed to `connection_lost`, in order.
    pub fn lost(&self) -> &[DisconnectReason] {
        &self.lost
    }
}

impl Endpoint for Recorder {
    type Error = HarnessError;

    fn connection_made(&mut self, transport: SimTransport) -> Result<(), HarnessError> {
        self.transport = Some(transport);
        Ok(())
    }

    fn data_received(&mut self, data: Bytes) -> Result<(), HarnessError> {
        self.chunks += 1;
        self.received.extend_from_slice(&data);
        Ok(())
    }

    fn connection_lost(&mut self, reason: DisconnectReason) -> Result<(), HarnessError> {
        self.lost.push(reason);
        Ok(())
    }
}

/// Line-oriented echo server.
///
/// Lines end in `\r\n`. `PING` is answered with `PONG`, `QUIT` with `BYE`
/// followed by a close, and anything else is echoed back. Partial lines are
/// buffered until complete.
#[derive(Debug, Default)]
pub struct LineEcho {
    transport: Option<SimTransport>,
    greeting: Option<Bytes>,
    partial: BytesMut,
    lines: Vec<Bytes>,
    lost: Vec<DisconnectReason>,
}

impl LineEcho {
    /// Echo server with no greeting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Echo server that sends `greeting` as soon as it is connected.
    pub fn with_greeting(greeting: &'static [u8]) -> Self {
        Self { greeting: Some(Bytes::from_static(greeting)), ..Self::default() }
    }

    /// Complete lines received so far, without terminators.
    pub fn lines(&self) -> &[Bytes] {
        &self.lines
    }

    /// Reasons passed to `connection_lost`, in order.
    pub fn lost(&self) -> &[DisconnectReason] {
        &self.lost
    }

    fn respond(&self, line: &[u8]) -> Result<(), HarnessError> {
        let transport = self.transport.as_ref().ok_or(HarnessError::NotConnected)?;
        tracing::trace!(line = %String::from_utf8_lossy(line), "echo");
        match line {
            b"PING" => transport.write(b"PONG\r\n"),
            b"QUIT" => {
                transport.write(b"BYE\r\n");
                transport.lose_connection();
            },
            other => transport.write_sequence([other, b"\r\n".as_slice()]),
        }
        Ok(())
    }
}

impl Endpoint for LineEcho {
    type Error = HarnessError;

    fn connection_made(&mut self, transport: SimTransport) -> Result<(), HarnessError> {
        if let Some(greeting) = &self.greeting {
            transport.write(greeting);
        }
        self.transport = Some(transport);
        Ok(())
    }

    fn data_received(&mut self, data: Bytes) -> Result<(), HarnessError> {
        self.partial.extend_from_slice(&data);

        while let Some(end) = self.partial.windows(2).position(|w| w == b"\r\n") {
            let mut line = self.partial.split_to(end + 2);
            line.truncate(end);
            let line = line.freeze();
            self.respond(&line)?;
            self.lines.push(line);
        }
        Ok(())
    }

    fn connection_lost(&mut self, reason: DisconnectReason) -> Result<(), HarnessError> {
        self.lost.push(reason);
        Ok(())
    }
}

/// Endpoint that answers every delivery with another message.
///
/// Two of these never go quiet, which is exactly the runaway ping-pong a
/// flush ceiling exists to catch.
#[derive(Debug, Default)]
pub struct Chatter {
    transport: Option<SimTransport>,
    opening: bool,
    deliveries: usize,
}

impl Chatter {
    /// Chatter that waits for the peer to speak first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Chatter that speaks as soon as it is connected.
    pub fn opening() -> Self {
        Self { opening: true, ..Self::default() }
    }

    /// Number of deliveries answered.
    pub fn deliveries(&self) -> usize {
        self.deliveries
    }
}

impl Endpoint for Chatter {
    type Error = HarnessError;

    fn connection_made(&mut self, transport: SimTransport) -> Result<(), HarnessError> {
        if self.opening {
            transport.write(b"hello?\r\n");
        }
        self.transport = Some(transport);
        Ok(())
    }

    fn data_received(&mut self, _data: Bytes) -> Result<(), HarnessError> {
        self.deliveries += 1;
        let transport = self.transport.as_ref().ok_or(HarnessError::NotConnected)?;
        transport.write(b"again\r\n");
        Ok(())
    }

    fn connection_lost(&mut self, _reason: DisconnectReason) -> Result<(), HarnessError> {
        Ok(())
    }
}

/// Endpoint that rejects any data it receives.
#[derive(Debug, Default)]
pub struct Failing {
    transport: Option<SimTransport>,
}

impl Failing {
    /// Create an unconnected failing endpoint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the peer.
    pub fn send(&self, data: &[u8]) -> Result<(), HarnessError> {
        self.transport.as_ref().ok_or(HarnessError::NotConnected)?.write(data);
        Ok(())
    }
}

impl Endpoint for Failing {
    type Error = HarnessError;

    fn connection_made(&mut self, transport: SimTransport) -> Result<(), HarnessError> {
        self.transport = Some(transport);
        Ok(())
    }

    fn data_received(&mut self, data: Bytes) -> Result<(), HarnessError> {
        Err(HarnessError::Rejected { line: String::from_utf8_lossy(&data).into_owned() })
    }

    fn connection_lost(&mut self, _reason: DisconnectReason) -> Result<(), HarnessError> {
        Ok(())
    }
}
