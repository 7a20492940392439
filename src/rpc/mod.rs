//! Bridge RPC server and client.
//!
//! The bridge speaks JSON-RPC 2.0 over TCP, one message per line. Every
//! method answers with a `{success, message}` envelope as its `result`;
//! only undecodable calls get a JSON-RPC error object.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Bridge Server                        │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │   │  Transport  │───▶│   Server    │───▶│  Dispatcher │     │
//! │   │   (lines)   │    │ (lifecycle) │    │   (queue)   │     │
//! │   └─────────────┘    └─────────────┘    └─────────────┘     │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────────────────────────────────────────┐       │
//! │   │              JSON-RPC Messages                  │       │
//! │   └─────────────────────────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                              │ TCP
//!                         RpcClient
//! ```

pub mod client;
pub mod protocol;
pub mod server;
pub mod transport;

pub use client::RpcClient;
pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, SERVER_NAME};
pub use server::{BridgeServer, ServerState};
pub use transport::{Frame, LineTransport, MalformedLine, TcpTransport};
