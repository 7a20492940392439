//! Client for the bridge RPC server.
//!
//! Each call opens its own connection, sends one request and waits for one
//! reply, all bounded by the configured timeout.

use std::sync::atomic::{AtomicI64, Ordering};

use serde_json::{json, Value};
use tokio::net::TcpStream;

use crate::bridge::{Envelope, Method};
use crate::config::ClientConfig;
use crate::engine::Point3;
use crate::error::ClientError;
use crate::rpc::protocol::{JsonRpcReply, JsonRpcRequest, RequestId};
use crate::rpc::transport::{Frame, TcpTransport};

/// RPC client for a running bridge.
#[derive(Debug)]
pub struct RpcClient {
    config: ClientConfig,
    next_id: AtomicI64,
}

impl RpcClient {
    /// Creates a client. No connection is made until the first call.
    #[must_use]
    pub const fn new(config: ClientConfig) -> Self {
        Self {
            config,
            next_id: AtomicI64::new(1),
        }
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Calls `method` with positional `params` and returns its envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the server cannot be reached, does not
    /// answer in time, answers with a JSON-RPC fault, or answers with
    /// something that is not an envelope.
    pub async fn call(&self, method: &str, params: Vec<Value>) -> Result<Envelope, ClientError> {
        tracing::debug!(%method, addr = %self.config.address(), "Calling bridge");

        tokio::time::timeout(self.config.timeout(), self.exchange(method, params))
            .await
            .map_err(|_| ClientError::Timeout {
                method: method.to_string(),
                timeout_ms: self.config.timeout_ms,
            })?
    }

    async fn exchange(&self, method: &str, params: Vec<Value>) -> Result<Envelope, ClientError> {
        let addr = self.config.address();
        let stream = TcpStream::connect(addr.as_str())
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.clone(),
                source,
            })?;
        let mut transport = TcpTransport::from_stream(stream);

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let request = JsonRpcRequest::new(id, method, params);
        transport.write_message(&request).await?;

        let line = match transport.read_frame().await? {
            Some(Frame::Line(line)) => line,
            Some(Frame::Malformed(reason)) => return Err(ClientError::Protocol(reason.to_string())),
            None => {
                return Err(ClientError::Protocol(
                    "connection closed before reply".to_string(),
                ))
            }
        };

        let reply: JsonRpcReply =
            serde_json::from_str(&line).map_err(|e| ClientError::Protocol(e.to_string()))?;

        if let Some(error) = reply.error {
            tracing::debug!(%method, code = error.code, "Call faulted");
            return Err(ClientError::Fault {
                code: error.code,
                message: error.message,
            });
        }

        if reply.id.as_ref() != Some(&request.id) {
            return Err(ClientError::Protocol(format!(
                "reply id does not match request id {}",
                request.id
            )));
        }

        let result = reply.result.ok_or_else(|| {
            ClientError::Protocol("reply has neither result nor error".to_string())
        })?;

        Envelope::from_value(result)
            .ok_or_else(|| ClientError::Protocol("result is not a response envelope".to_string()))
    }

    /// Checks that the bridge is alive.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn ping(&self) -> Result<Envelope, ClientError> {
        self.call(Method::Ping.as_str(), Vec::new()).await
    }

    /// Creates a sketch with one circle.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn create_sketch_circle(
        &self,
        plane: &str,
        coords: &[f64],
        radius: f64,
        name: Option<&str>,
    ) -> Result<Envelope, ClientError> {
        let mut params = vec![json!(plane), json!(coords), json!(radius)];
        if let Some(name) = name {
            params.push(json!(name));
        }
        self.call(Method::CreateSketchCircle.as_str(), params).await
    }

    /// Creates a sketch with one two-point rectangle.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn create_sketch_rectangle(
        &self,
        plane: &str,
        point_one: &[f64],
        point_two: &[f64],
        name: Option<&str>,
    ) -> Result<Envelope, ClientError> {
        let mut params = vec![json!(plane), json!(point_one), json!(point_two)];
        if let Some(name) = name {
            params.push(json!(name));
        }
        self.call(Method::CreateSketchRectangle.as_str(), params).await
    }

    /// Extrudes the first profile of a sketch into a new body.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn extrude_profile(
        &self,
        sketch_name: &str,
        distance: f64,
    ) -> Result<Envelope, ClientError> {
        self.call(
            Method::ExtrudeProfile.as_str(),
            vec![json!(sketch_name), json!(distance)],
        )
        .await
    }

    /// Creates a cylinder standing on the XY plane.
    ///
    /// # Errors
    ///
    /// See [`RpcClient::call`].
    pub async fn create_cylinder(
        &self,
        center: Point3,
        radius: f64,
        height: f64,
    ) -> Result<Envelope, ClientError> {
        self.call(
            Method::CreateCylinder.as_str(),
            vec![
                json!(center.x),
                json!(center.y),
                json!(center.z),
                json!(radius),
                json!(height),
            ],
        )
        .await
    }
}
