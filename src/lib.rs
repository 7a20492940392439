//! cad-bridge-mcp: RPC bridge between AI assistants and a CAD document
//!
//! This library exposes a small set of geometry commands (sketches, circles,
//! rectangles, extrusions, cylinders) to an external process over a local
//! JSON-RPC socket, while keeping every mutation of the document on a
//! single execution context.
//!
//! # Architecture
//!
//! The bridge provides low-level geometry primitives. The caller handles the
//! intelligence:
//!
//! - **Transport**: a background TCP server with a start/stop lifecycle
//! - **Dispatch**: calls from any connection are queued to one executor
//! - **Commands**: planes and sketches are resolved by name, results come
//!   back as a `{success, message}` envelope
//!
//! # Modules
//!
//! - [`bridge`]: Commands, envelope, and single-writer dispatch
//! - [`config`]: Configuration loading and validation
//! - [`engine`]: Document model interface and the in-memory engine
//! - [`error`]: Error types
//! - [`rpc`]: Wire protocol, server, and client

pub mod bridge;
pub mod config;
pub mod engine;
pub mod error;
pub mod rpc;
