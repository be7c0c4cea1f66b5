//! Step-wise transfer between two endpoints.
//!
//! Each [`Pump::step`] does at most one category of work: move data, or
//! deliver one close. Tests can therefore assert between individual
//! exchanges, and [`Pump::flush`] is just `step` until nothing happens.
//!
//! # Step order
//!
//! 1. Drain server output, then client output
//! 2. Run both transports' flow-control hook (client, then server)
//! 3. If anything was drained, deliver server→client then client→server and
//!    stop
//! 4. Otherwise deliver at most one pending close, server-initiated first
//!
//! The server-first tie-break in (4) makes a simultaneous close resolve the
//! same way on every run.

use bytes::Bytes;

use crate::{
    config::PumpConfig,
    endpoint::{DisconnectReason, Endpoint, EndpointRef},
    error::PumpError,
    transport::{Side, SimTransport},
};

/// Traffic logging: `debug` when the pump is in debug mode, `trace` otherwise.
macro_rules! traffic {
    ($debug:expr, $($arg:tt)+) => {
        if $debug {
            tracing::debug!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    };
}

/// Moves bytes and close signals between a client and a server endpoint.
///
/// The pump shares the endpoints and transports with the caller; it keeps no
/// state of its own beyond its configuration.
pub struct Pump<C: Endpoint, S: Endpoint> {
    client: EndpointRef<C>,
    server: EndpointRef<S>,
    client_transport: SimTransport,
    server_transport: SimTransport,
    config: PumpConfig,
}

impl<C: Endpoint, S: Endpoint> Pump<C, S> {
    /// Wire a pump between two connected endpoints and their transports.
    pub fn new(
        client: EndpointRef<C>,
        server: EndpointRef<S>,
        client_transport: SimTransport,
        server_transport: SimTransport,
        config: PumpConfig,
    ) -> Self {
        Self { client, server, client_transport, server_transport, config }
    }

    /// The client endpoint.
    pub fn client(&self) -> &EndpointRef<C> {
        &self.client
    }

    /// The server endpoint.
    pub fn server(&self) -> &EndpointRef<S> {
        &self.server
    }

    /// The client's transport.
    pub fn client_transport(&self) -> &SimTransport {
        &self.client_transport
    }

    /// The server's transport.
    pub fn server_transport(&self) -> &SimTransport {
        &self.server_transport
    }

    /// Current configuration.
    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    /// Toggle traffic logging at `debug` level for every step.
    pub fn set_debug(&mut self, debug: bool) {
        self.config.debug = debug;
    }

    /// True if a step right now would do nothing.
    ///
    /// Does not consult producers: a registered producer may still write
    /// when the next step runs its flow-control hook.
    pub fn is_quiescent(&self) -> bool {
        self.client_transport.pending_output() == 0
            && self.server_transport.pending_output() == 0
            && !close_pending(&self.client_transport)
            && !close_pending(&self.server_transport)
    }

    /// Perform one transfer round.
    ///
    /// Returns `true` if data moved or a close was delivered. Endpoint errors
    /// abort the step and are returned tagged with the failing side.
    pub fn step(&mut self, debug: bool) -> Result<bool, PumpError> {
        let debug = self.config.debug || debug;
        traffic!(debug, "-- GLUG --");

        let server_data = self.server_transport.drain_output();
        let client_data = self.client_transport.drain_output();

        self.client_transport.check_producer();
        self.server_transport.check_producer();

        log_lines(debug, Side::Client, &client_data);
        log_lines(debug, Side::Server, &server_data);

        let moved = !server_data.is_empty() || !client_data.is_empty();

        if !server_data.is_empty() {
            self.client
                .borrow_mut()
                .data_received(server_data)
                .map_err(|e| PumpError::endpoint(Side::Client, e))?;
        }
        if !client_data.is_empty() {
            self.server
                .borrow_mut()
                .data_received(client_data)
                .map_err(|e| PumpError::endpoint(Side::Server, e))?;
        }
        if moved {
            return Ok(true);
        }

        if close_pending(&self.server_transport) {
            traffic!(debug, "* C");
            self.server_transport.set_disconnected();
            self.client_transport.set_disconnecting();
            self.client
                .borrow_mut()
                .connection_lost(DisconnectReason::ConnectionDone)
                .map_err(|e| PumpError::endpoint(Side::Client, e))?;
            return Ok(true);
        }

        if close_pending(&self.client_transport) {
            traffic!(debug, "* S");
            self.client_transport.set_disconnected();
            self.server_transport.set_disconnecting();
            self.server
                .borrow_mut()
                .connection_lost(DisconnectReason::ConnectionDone)
                .map_err(|e| PumpError::endpoint(Side::Server, e))?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Step until quiescent.
    ///
    /// Returns whether any step moved data or delivered a close. Fails with
    /// [`PumpError::NoQuiescence`] if the configured ceiling is reached.
    pub fn flush(&mut self, debug: bool) -> Result<bool, PumpError> {
        let iterations = self.config.max_flush_iterations;
        let mut moved = false;

        for _ in 0..iterations {
            if !self.step(debug)? {
                return Ok(moved);
            }
            moved = true;
        }

        tracing::error!(iterations, "pump did not reach quiescence");
        Err(PumpError::NoQuiescence { iterations })
    }
}

/// Close requested on this side but not yet delivered to the peer.
fn close_pending(transport: &SimTransport) -> bool {
    transport.is_disconnecting() && !transport.is_disconnected()
}

fn log_lines(debug: bool, side: Side, data: &Bytes) {
    if data.is_empty() {
        return;
    }
    traffic!(debug, side = %side, bytes = data.len(), "drained");
    for line in String::from_utf8_lossy(data).split("\r\n") {
        traffic!(debug, "{}: {}", side.tag(), line);
    }
}
