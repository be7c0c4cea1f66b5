//! Building a connected client/server pair.

use std::{cell::RefCell, rc::Rc};

use crate::{
    config::PumpConfig,
    endpoint::{Endpoint, EndpointRef},
    error::PumpError,
    pump::Pump,
    transport::{Side, SimTransport},
};

/// Connect `client` to `server` and flush once.
///
/// Transports are created for both sides, `connection_made` is called on
/// the client and then the server, and a first flush delivers anything
/// written during connection setup (server greetings, handshakes).
///
/// The caller owns teardown. Use [`with_connected_pair`] for a scope that
/// always releases the buffers.
#[allow(clippy::type_complexity)]
pub fn connect<C, S>(
    client: C,
    server: S,
    config: PumpConfig,
) -> Result<(EndpointRef<C>, EndpointRef<S>, Pump<C, S>), PumpError>
where
    C: Endpoint,
    S: Endpoint,
{
    let client = Rc::new(RefCell::new(client));
    let server = Rc::new(RefCell::new(server));
    let client_transport = SimTransport::new(Side::Client);
    let server_transport = SimTransport::new(Side::Server);

    client
        .borrow_mut()
        .connection_made(client_transport.clone())
        .map_err(|e| PumpError::endpoint(Side::Client, e))?;
    server
        .borrow_mut()
        .connection_made(server_transport.clone())
        .map_err(|e| PumpError::endpoint(Side::Server, e))?;

    let mut pump = Pump::new(
        Rc::clone(&client),
        Rc::clone(&server),
        client_transport,
        server_transport,
        config,
    );
    pump.flush(false)?;

    tracing::debug!("simulated connection established");
    Ok((client, server, pump))
}

/// Run `body` against a freshly connected pair, then tear it down.
///
/// Both output buffers are released when the scope ends, whether `body`
/// returns `Ok`, returns an error, or unwinds. Errors from connection setup
/// are converted into the body's error type.
pub fn with_connected_pair<C, S, T, E, F>(
    client: C,
    server: S,
    config: PumpConfig,
    body: F,
) -> Result<T, E>
where
    C: Endpoint,
    S: Endpoint,
    E: From<PumpError>,
    F: FnOnce(&EndpointRef<C>, &EndpointRef<S>, &mut Pump<C, S>) -> Result<T, E>,
{
    let (client, server, pump) = connect(client, server, config)?;
    let mut guard = Teardown { pump };
    body(&client, &server, &mut guard.pump)
}

/// Releases both output buffers on drop.
struct Teardown<C: Endpoint, S: Endpoint> {
    pump: Pump<C, S>,
}

impl<C: Endpoint, S: Endpoint> Drop for Teardown<C, S> {
    fn drop(&mut self) {
        self.pump.client_transport().close_output();
        self.pump.server_transport().close_output();
        tracing::debug!("simulated connection torn down");
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use bytes::Bytes;
    use thiserror::Error;

    use super::*;
    use crate::endpoint::DisconnectReason;

    /// Sends a banner on connect and remembers what it receives.
    #[derive(Default)]
    struct Banner {
        transport: Option<SimTransport>,
        received: Vec<u8>,
    }

    impl Endpoint for Banner {
        type Error = Infallible;

        fn connection_made(&mut self, transport: SimTransport) -> Result<(), Infallible> {
            transport.write(b"220 ready\r\n");
            self.transport = Some(transport);
            Ok(())
        }

        fn data_received(&mut self, data: Bytes) -> Result<(), Infallible> {
            self.received.extend_from_slice(&data);
            Ok(())
        }

        fn connection_lost(&mut self, _reason: DisconnectReason) -> Result<(), Infallible> {
            Ok(())
        }
    }

    #[derive(Debug, Error)]
    #[error("refused")]
    struct Refused;

    struct Refusing;

    impl Endpoint for Refusing {
        type Error = Refused;

        fn connection_made(&mut self, _transport: SimTransport) -> Result<(), Refused> {
            Err(Refused)
        }

        fn data_received(&mut self, _data: Bytes) -> Result<(), Refused> {
            Ok(())
        }

        fn connection_lost(&mut self, _reason: DisconnectReason) -> Result<(), Refused> {
            Ok(())
        }
    }

    #[derive(Debug, Error)]
    enum TestError {
        #[error(transparent)]
        Pump(#[from] PumpError),
        #[error("body bailed")]
        Bailed,
    }

    #[test]
    fn connect_delivers_greetings() {
        let (client, server, pump) =
            connect(Banner::default(), Banner::default(), PumpConfig::default()).expect("connect");

        assert_eq!(client.borrow().received, b"220 ready\r\n");
        assert_eq!(server.borrow().received, b"220 ready\r\n");
        assert!(pump.is_quiescent());
    }

    #[test]
    fn connect_reports_failing_side() {
        let Err(err) = connect(Banner::default(), Refusing, PumpConfig::default()) else {
            panic!("server refused the connection");
        };
        assert_eq!(err.side(), Some(Side::Server));
    }

    #[test]
    fn scope_releases_buffers_on_success() {
        let mut kept = None;
        let result: Result<(), TestError> = with_connected_pair(
            Banner::default(),
            Banner::default(),
            PumpConfig::default(),
            |_, _, pump| {
                kept = Some(pump.client_transport().clone());
                Ok(())
            },
        );

        result.expect("body succeeded");
        let transport = kept.expect("body ran");
        assert!(transport.is_output_closed());
    }

    #[test]
    fn scope_releases_buffers_on_error() {
        let mut kept = None;
        let result: Result<(), TestError> = with_connected_pair(
            Banner::default(),
            Banner::default(),
            PumpConfig::default(),
            |_, _, pump| {
                kept = Some(pump.server_transport().clone());
                Err(TestError::Bailed)
            },
        );

        assert!(matches!(result, Err(TestError::Bailed)));
        assert!(kept.expect("body ran").is_output_closed());
    }

    #[test]
    fn scope_releases_buffers_on_panic() {
        let kept = Rc::new(RefCell::new(None));
        let inner = Rc::clone(&kept);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<(), TestError> = with_connected_pair(
                Banner::default(),
                Banner::default(),
                PumpConfig::default(),
                |_, _, pump| {
                    *inner.borrow_mut() = Some(pump.client_transport().clone());
                    panic!("assertion inside test body");
                },
            );
        }));

        assert!(outcome.is_err());
        let transport = kept.borrow_mut().take().expect("body ran");
        assert!(transport.is_output_closed());
    }

    #[test]
    fn late_writes_after_teardown_are_harmless() {
        let (client, _server, client_transport) = {
            let mut parts = None;
            let _: Result<(), TestError> = with_connected_pair(
                Banner::default(),
                Banner::default(),
                PumpConfig::default(),
                |client, server, pump| {
                    parts = Some((
                        Rc::clone(client),
                        Rc::clone(server),
                        pump.client_transport().clone(),
                    ));
                    Ok(())
                },
            );
            parts.expect("body ran")
        };

        if let Some(transport) = client.borrow().transport.as_ref() {
            transport.write(b"too late");
        }
        assert_eq!(client_transport.pending_output(), 0);
        assert!(client_transport.drain_output().is_empty());
    }
}
