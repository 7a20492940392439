//! Bridge RPC server.
//!
//! This module implements the transport server lifecycle:
//!
//! 1. **Start**: bind the listening socket on the caller's thread, then run
//!    the accept loop on one background thread
//! 2. **Operation**: decode each call, hand it to the [`Dispatcher`], and
//!    answer with the resulting envelope
//! 3. **Stop**: signal the loop, wait a bounded time for the thread, and
//!    detach it if it does not finish
//!
//! Connections are served concurrently, but every command goes through the
//! one executor queue behind the dispatcher.

use std::io;
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use crate::bridge::{Command, Dispatcher, Envelope};
use crate::config::ServerConfig;
use crate::error::TransportError;
use crate::rpc::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
};
use crate::rpc::transport::{Frame, TcpTransport};

/// Name of the accept-loop thread.
pub const SERVER_THREAD_NAME: &str = "cad-bridge-rpc";

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// How often `stop()` checks whether the loop thread has finished.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Externally visible server state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No socket is bound.
    Stopped,
    /// Listening and serving calls.
    Running,
}

/// Resources owned while the server is running.
struct RunningServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    thread: JoinHandle<()>,
}

/// The bridge RPC server.
pub struct BridgeServer {
    config: ServerConfig,
    dispatcher: Dispatcher,
    running: Option<RunningServer>,
}

impl BridgeServer {
    /// Creates a stopped server that will feed calls to `dispatcher`.
    #[must_use]
    pub const fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            dispatcher,
            running: None,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        if self.running.is_some() {
            ServerState::Running
        } else {
            ServerState::Stopped
        }
    }

    /// Returns the bound address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Binds the listener and starts the background loop.
    ///
    /// Does nothing if the server is already running.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the socket cannot be bound or the loop
    /// cannot be started. The server stays stopped in that case.
    pub fn start(&mut self) -> Result<(), TransportError> {
        if self.running.is_some() {
            tracing::debug!("RPC server already running");
            return Ok(());
        }

        let host = self.config.host.clone();
        let port = self.config.port;
        let bind_error = |source| TransportError::Bind {
            host: host.clone(),
            port,
            source,
        };

        let std_listener =
            std::net::TcpListener::bind((host.as_str(), port)).map_err(bind_error)?;
        let local_addr = std_listener.local_addr().map_err(bind_error)?;
        std_listener
            .set_nonblocking(true)
            .map_err(|source| TransportError::Listener {
                addr: local_addr,
                source,
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Runtime)?;

        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(std_listener).map_err(|source| TransportError::Listener {
                addr: local_addr,
                source,
            })?
        };

        let (shutdown, shutdown_rx) = oneshot::channel();
        let dispatcher = self.dispatcher.clone();
        let thread = thread::Builder::new()
            .name(SERVER_THREAD_NAME.to_string())
            .spawn(move || {
                runtime.block_on(serve(listener, dispatcher, shutdown_rx));
            })
            .map_err(TransportError::Thread)?;

        tracing::info!(%local_addr, "RPC server listening");

        self.running = Some(RunningServer {
            local_addr,
            shutdown,
            thread,
        });
        Ok(())
    }

    /// Stops the background loop and closes the listening socket.
    ///
    /// Does nothing if the server is already stopped. Waits at most
    /// `shutdown_timeout_ms` for the loop thread; problems during shutdown
    /// are logged and never prevent the server from reaching `Stopped`.
    pub fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            tracing::debug!("RPC server already stopped");
            return;
        };

        if running.shutdown.send(()).is_err() {
            tracing::warn!("RPC server loop had already exited");
        }

        let timeout = self.config.shutdown_timeout();
        let deadline = Instant::now() + timeout;
        while !running.thread.is_finished() && Instant::now() < deadline {
            thread::sleep(JOIN_POLL_INTERVAL);
        }

        if running.thread.is_finished() {
            if running.thread.join().is_err() {
                tracing::warn!("RPC server loop panicked");
            }
        } else {
            tracing::warn!(
                timeout_ms = self.config.shutdown_timeout_ms,
                "RPC server loop did not stop in time, detaching it"
            );
        }

        tracing::info!(addr = %running.local_addr, "RPC server stopped");
    }
}

impl Drop for BridgeServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Accept loop. Returns when `shutdown` fires or its sender is dropped.
async fn serve(
    listener: TcpListener,
    dispatcher: Dispatcher,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::debug!("RPC server loop shutting down");
                break;
            }

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(%peer, "Connection accepted");
                    let dispatcher = dispatcher.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, dispatcher).await {
                            tracing::warn!(%peer, error = %e, "Connection error");
                        }
                        tracing::debug!(%peer, "Connection closed");
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }
}

/// Serves one connection until the peer closes it.
async fn handle_connection(stream: TcpStream, dispatcher: Dispatcher) -> io::Result<()> {
    let mut transport = TcpTransport::from_stream(stream);

    while let Some(frame) = transport.read_frame().await? {
        let line = match frame {
            Frame::Line(line) => line,
            Frame::Malformed(reason) => {
                tracing::debug!(%reason, "Rejected malformed line");
                transport.write_message(&JsonRpcError::parse_error()).await?;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_message(&line) {
            Ok(IncomingMessage::Request(req)) => match handle_request(&dispatcher, req).await {
                Ok(response) => transport.write_message(&response).await?,
                Err(error) => transport.write_message(&error).await?,
            },
            Ok(IncomingMessage::Notification(notif)) => {
                tracing::debug!(method = %notif.method, "Ignoring notification");
            }
            Err(error) => transport.write_message(&error).await?,
        }
    }

    Ok(())
}

/// Decodes, dispatches and answers one request.
///
/// # Errors
///
/// Returns a JSON-RPC fault for unknown methods, bad arguments, or a stopped
/// executor. Command failures are not faults; they come back as an
/// unsuccessful envelope.
pub async fn handle_request(
    dispatcher: &Dispatcher,
    req: JsonRpcRequest,
) -> Result<JsonRpcResponse, JsonRpcError> {
    tracing::debug!(id = %req.id, method = %req.method, "Request received");

    let command = Command::decode(&req.method, req.params).map_err(|e| {
        tracing::debug!(id = %req.id, error = %e, "Rejected call");
        JsonRpcError::from_call_error(req.id.clone(), &e)
    })?;

    let result = dispatcher.call(command).await.map_err(|e| {
        tracing::error!(error = %e, "Command could not be dispatched");
        JsonRpcError::internal_error(req.id.clone(), e.to_string())
    })?;

    let envelope = Envelope::from(result);
    let value = serde_json::to_value(&envelope).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialise envelope");
        JsonRpcError::internal_error(req.id.clone(), "failed to serialise result")
    })?;

    Ok(JsonRpcResponse::success(req.id, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::channel;
    use crate::engine::MemoryHost;
    use crate::rpc::protocol::{ErrorCode, RequestId};
    use serde_json::json;

    fn local_config(port: u16) -> ServerConfig {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            shutdown_timeout_ms: 1000,
        }
    }

    /// Ends the accept loop behind the server's back, leaving a dead
    /// shutdown sender in its place.
    fn end_loop(server: &mut BridgeServer) {
        let running = server.running.as_mut().unwrap();
        let (dead, _) = oneshot::channel();
        std::mem::replace(&mut running.shutdown, dead).send(()).unwrap();
        while !running.thread.is_finished() {
            thread::sleep(JOIN_POLL_INTERVAL);
        }
    }

    fn request(method: &str, params: serde_json::Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .unwrap()
    }

    #[test]
    fn server_initial_state() {
        let (dispatcher, _executor) = channel(MemoryHost::with_empty_design());
        let server = BridgeServer::new(local_config(0), dispatcher);
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (dispatcher, _executor) = channel(MemoryHost::with_empty_design());
        let mut server = BridgeServer::new(local_config(0), dispatcher);

        server.start().unwrap();
        let addr = server.local_addr().unwrap();
        server.start().unwrap();
        assert_eq!(server.local_addr(), Some(addr));
        assert_eq!(server.state(), ServerState::Running);

        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[test]
    fn restart_after_stop() {
        let (dispatcher, _executor) = channel(MemoryHost::with_empty_design());
        let mut server = BridgeServer::new(local_config(0), dispatcher);

        server.start().unwrap();
        server.stop();
        server.start().unwrap();
        assert_eq!(server.state(), ServerState::Running);
    }

    #[test]
    fn stop_after_loop_already_exited() {
        let (dispatcher, _executor) = channel(MemoryHost::with_empty_design());
        let mut server = BridgeServer::new(local_config(0), dispatcher);

        server.start().unwrap();
        end_loop(&mut server);

        server.stop();
        assert_eq!(server.state(), ServerState::Stopped);
        assert!(server.local_addr().is_none());
    }

    #[test]
    fn stop_detaches_a_stuck_loop_thread() {
        let (dispatcher, _executor) = channel(MemoryHost::with_empty_design());
        let mut config = local_config(0);
        config.shutdown_timeout_ms = 20;
        let mut server = BridgeServer::new(config, dispatcher);

        server.start().unwrap();
        end_loop(&mut server);
        let running = server.running.as_mut().unwrap();
        let stuck = thread::spawn(|| thread::sleep(Duration::from_millis(500)));
        std::mem::replace(&mut running.thread, stuck).join().unwrap();

        let started = Instant::now();
        server.stop();
        assert!(started.elapsed() < Duration::from_millis(400));
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[test]
    fn bind_failure_propagates() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let (dispatcher, _executor) = channel(MemoryHost::with_empty_design());
        let mut server = BridgeServer::new(local_config(port), dispatcher);

        let err = server.start().unwrap_err();
        assert!(matches!(err, TransportError::Bind { .. }));
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn handle_request_wraps_outcome_in_envelope() {
        let (dispatcher, executor) = channel(MemoryHost::with_empty_design());
        let _executor = executor.spawn().unwrap();

        let response = handle_request(&dispatcher, request("ping", json!([])))
            .await
            .unwrap();
        assert_eq!(response.id, RequestId::Number(1));
        assert_eq!(response.result, json!({"success": true, "message": "Pong"}));

        let response = handle_request(
            &dispatcher,
            request("extrude_profile", json!(["nope", 1.0])),
        )
        .await
        .unwrap();
        assert_eq!(response.result["success"], json!(false));
    }

    #[tokio::test]
    async fn handle_request_faults() {
        let (dispatcher, executor) = channel(MemoryHost::with_empty_design());

        let err = handle_request(&dispatcher, request("unknown_method", json!([])))
            .await
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::MethodNotFound.code());

        let err = handle_request(&dispatcher, request("create_cylinder", json!([0, 0])))
            .await
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidParams.code());

        drop(executor);
        let err = handle_request(&dispatcher, request("ping", json!([])))
            .await
            .unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InternalError.code());
    }
}
