//! Simulated transport handle shared by an endpoint and the pump.
//!
//! A [`SimTransport`] is what the endpoint sees instead of a socket: it
//! buffers output, records the endpoint's wish to disconnect, and hosts an
//! optional [`Producer`] that is nudged once per pump step.
//!
//! # Invariants
//!
//! - `disconnected` is only ever set by the pump, after the close has been
//!   delivered to the peer
//! - At most one producer is registered at a time
//! - The producer is never borrowed while its own callback runs, so it may
//!   write to, or unregister from, the transport it is called with

use std::{cell::RefCell, fmt, rc::Rc};

use bytes::Bytes;

use crate::{buffer::DuplexBuffer, error::TransportError};

/// Which end of the simulated connection a transport belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The connecting end.
    Client,
    /// The accepting end.
    Server,
}

impl Side {
    /// The opposite end.
    pub fn peer(self) -> Self {
        match self {
            Self::Client => Self::Server,
            Self::Server => Self::Client,
        }
    }

    /// One-letter tag used in traffic logs.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Client => "C",
            Self::Server => "S",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::Server => write!(f, "server"),
        }
    }
}

/// Address of one end of a simulated connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimAddress {
    /// End the address names.
    pub side: Side,
}

impl fmt::Display for SimAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sim:{}", self.side)
    }
}

/// Source of data attached to a transport for flow control.
///
/// The pump calls [`SimTransport::check_producer`] at every step, which in
/// turn asks a registered producer to resume. The producer writes through
/// the transport it is handed.
pub trait Producer {
    /// Produce more data.
    fn resume_producing(&mut self, transport: &SimTransport);

    /// Stop producing for good. Called when the consumer goes away.
    fn stop_producing(&mut self) {}
}

/// Producer slot. `Running` marks a producer lent out to its own callback.
enum ProducerSlot {
    Empty,
    Idle { producer: Box<dyn Producer>, streaming: bool },
    Running { streaming: bool, unregistered: bool },
}

struct TransportState {
    side: Side,
    output: DuplexBuffer,
    disconnecting: bool,
    disconnected: bool,
    producer: ProducerSlot,
}

/// Cloneable single-threaded handle to one side's transport.
///
/// Clones share state: the endpoint writes through its clone and the pump
/// drains through its own.
#[derive(Clone)]
pub struct SimTransport {
    state: Rc<RefCell<TransportState>>,
}

impl SimTransport {
    /// Create an open transport for `side`.
    pub fn new(side: Side) -> Self {
        let state = TransportState {
            side,
            output: DuplexBuffer::new(),
            disconnecting: false,
            disconnected: false,
            producer: ProducerSlot::Empty,
        };
        Self { state: Rc::new(RefCell::new(state)) }
    }

    /// Which end this transport belongs to.
    pub fn side(&self) -> Side {
        self.state.borrow().side
    }

    /// Address of this end.
    pub fn host(&self) -> SimAddress {
        SimAddress { side: self.side() }
    }

    /// Address of the other end.
    pub fn peer(&self) -> SimAddress {
        SimAddress { side: self.side().peer() }
    }

    /// Queue bytes for the peer. Never fails.
    pub fn write(&self, data: &[u8]) {
        self.state.borrow_mut().output.write(data);
    }

    /// Queue several chunks for the peer, in order.
    pub fn write_sequence<'a, I>(&self, chunks: I)
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut state = self.state.borrow_mut();
        for chunk in chunks {
            state.output.write(chunk);
        }
    }

    /// Ask for the connection to be closed once pending output is delivered.
    pub fn lose_connection(&self) {
        let mut state = self.state.borrow_mut();
        tracing::trace!(side = %state.side, "lose_connection");
        state.disconnecting = true;
    }

    /// True once a close has been requested by, or propagated to, this side.
    pub fn is_disconnecting(&self) -> bool {
        self.state.borrow().disconnecting
    }

    /// True once the pump has delivered this side's close to the peer.
    pub fn is_disconnected(&self) -> bool {
        self.state.borrow().disconnected
    }

    /// Mark this side as closing (peer-initiated close).
    pub fn set_disconnecting(&self) {
        self.state.borrow_mut().disconnecting = true;
    }

    /// Mark this side's close as delivered.
    pub fn set_disconnected(&self) {
        self.state.borrow_mut().disconnected = true;
    }

    /// Attach a producer.
    ///
    /// A non-streaming (pull) producer is resumed immediately. A producer
    /// that has unregistered itself from inside its own callback may hand
    /// over to a replacement registered in that same callback.
    pub fn register_producer(
        &self,
        producer: Box<dyn Producer>,
        streaming: bool,
    ) -> Result<(), TransportError> {
        {
            let mut state = self.state.borrow_mut();
            match state.producer {
                ProducerSlot::Empty | ProducerSlot::Running { unregistered: true, .. } => {},
                ProducerSlot::Idle { .. } | ProducerSlot::Running { unregistered: false, .. } => {
                    return Err(TransportError::ProducerAlreadyRegistered { side: state.side });
                },
            }
            state.producer = ProducerSlot::Idle { producer, streaming };
        }

        if !streaming {
            self.check_producer();
        }
        Ok(())
    }

    /// Detach the producer, if any.
    pub fn unregister_producer(&self) {
        drop(self.detach_producer());
    }

    /// Empty the slot, handing back an idle producer.
    ///
    /// A running producer is only marked; `check_producer` drops it once its
    /// callback returns.
    fn detach_producer(&self) -> Option<Box<dyn Producer>> {
        let mut state = self.state.borrow_mut();
        match std::mem::replace(&mut state.producer, ProducerSlot::Empty) {
            ProducerSlot::Idle { producer, .. } => Some(producer),
            ProducerSlot::Running { streaming, .. } => {
                state.producer = ProducerSlot::Running { streaming, unregistered: true };
                None
            },
            ProducerSlot::Empty => None,
        }
    }

    /// True if a producer is attached.
    pub fn has_producer(&self) -> bool {
        match &self.state.borrow().producer {
            ProducerSlot::Empty => false,
            ProducerSlot::Idle { .. } => true,
            ProducerSlot::Running { unregistered, .. } => !unregistered,
        }
    }

    /// Detach the producer and request a close.
    ///
    /// An idle producer is told to stop. A producer calling this from its own
    /// callback is only detached.
    pub fn stop_consuming(&self) {
        if let Some(mut producer) = self.detach_producer() {
            producer.stop_producing();
        }
        self.lose_connection();
    }

    /// Flow-control hook, called by the pump once per step.
    ///
    /// Resumes the registered producer. No-op without one, and no-op when
    /// called from inside the producer's own callback.
    pub fn check_producer(&self) {
        let taken = {
            let mut state = self.state.borrow_mut();
            match std::mem::replace(&mut state.producer, ProducerSlot::Empty) {
                ProducerSlot::Idle { producer, streaming } => {
                    state.producer = ProducerSlot::Running { streaming, unregistered: false };
                    Some(producer)
                },
                other => {
                    state.producer = other;
                    None
                },
            }
        };

        let Some(mut producer) = taken else {
            return;
        };

        producer.resume_producing(self);

        let mut state = self.state.borrow_mut();
        let slot = std::mem::replace(&mut state.producer, ProducerSlot::Empty);
        state.producer = match slot {
            ProducerSlot::Running { streaming, unregistered: false } => {
                ProducerSlot::Idle { producer, streaming }
            },
            ProducerSlot::Running { unregistered: true, .. } => ProducerSlot::Empty,
            other => other,
        };
    }

    /// Drain everything queued for the peer.
    pub fn drain_output(&self) -> Bytes {
        self.state.borrow_mut().output.read_and_clear()
    }

    /// Number of queued output bytes.
    pub fn pending_output(&self) -> usize {
        self.state.borrow().output.len()
    }

    /// Release the output buffer. Later writes are discarded and drains
    /// return empty.
    pub fn close_output(&self) {
        let mut state = self.state.borrow_mut();
        tracing::trace!(side = %state.side, "output buffer released");
        state.output.close();
    }

    /// True once [`close_output`](Self::close_output) has been called.
    pub fn is_output_closed(&self) -> bool {
        self.state.borrow().output.is_closed()
    }
}

impl fmt::Debug for SimTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SimTransport")
            .field("side", &state.side)
            .field("pending", &state.output.len())
            .field("disconnecting", &state.disconnecting)
            .field("disconnected", &state.disconnected)
            .finish_non_exhaustive()
    }
}
