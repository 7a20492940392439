//! The command bridge between RPC calls and the CAD document.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  accept/connection tasks (any number)                        │
//! │      │ Command::decode ──▶ CallError ──▶ JSON-RPC fault      │
//! │      ▼                                                       │
//! │  Dispatcher ──── mpsc queue ────▶ Executor (one context)     │
//! │      ▲                               │ resolve ──▶ geometry  │
//! │      └──── oneshot reply ◀───────────┘      (owns the Host)  │
//! │      │                                                       │
//! │      ▼ Envelope::from(result)                                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`envelope`]: the `{success, message}` wire contract
//! - [`resolve`]: plane and sketch lookup
//! - [`geometry`]: sketch, circle, rectangle, extrude, cylinder
//! - [`command`]: the typed method table
//! - [`dispatch`]: single-writer execution

pub mod command;
pub mod dispatch;
pub mod envelope;
pub mod geometry;
pub mod resolve;

pub use command::{Command, Method, Outcome};
pub use dispatch::{channel, Dispatcher, Executor};
pub use envelope::{Envelope, Message};
