//! Error types for cad-bridge-mcp.
//!
//! Command-layer errors ([`CommandError`]) never cross the RPC boundary as
//! faults: the server folds them into the response envelope. Transport and
//! configuration errors propagate to the embedding process instead.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Coarse classification of command failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed argument: bad plane name, non-positive size, wrong coordinate count.
    Validation,
    /// A named object (or a usable profile) does not exist.
    NotFound,
    /// The engine returned no usable result.
    EngineFailure,
    /// There is no open design to operate on.
    NoActiveDesign,
}

/// Errors raised by the geometry command set and reference resolver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// Plane name is not one of xy, yz, xz.
    #[error("Invalid plane '{name}'. Use 'xy', 'yz', or 'xz'.")]
    InvalidPlane {
        /// The name as supplied by the caller.
        name: String,
    },

    /// Argument failed validation before any mutation was attempted.
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Argument name.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// Caller-supplied sketch name is already taken.
    #[error("Sketch '{name}' already exists")]
    DuplicateSketch {
        /// The conflicting name.
        name: String,
    },

    /// No sketch with this name exists in the active component.
    #[error("Sketch '{name}' not found")]
    SketchNotFound {
        /// Name that was looked up.
        name: String,
    },

    /// The sketch exists but has no closed profile to extrude.
    #[error("Profile {index} not found in sketch '{sketch}'")]
    ProfileNotFound {
        /// Name of the sketch.
        sketch: String,
        /// Requested profile index.
        index: usize,
    },

    /// The engine call yielded nothing.
    #[error("Failed to {action}")]
    Engine {
        /// What was being attempted, phrased as a verb clause.
        action: &'static str,
    },

    /// No design is open in the host application.
    #[error("No active design")]
    NoActiveDesign,
}

impl CommandError {
    /// Creates a validation error for the named argument.
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Creates an engine failure for the given action.
    #[must_use]
    pub const fn engine(action: &'static str) -> Self {
        Self::Engine { action }
    }

    /// Returns the taxonomy class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPlane { .. } | Self::Validation { .. } | Self::DuplicateSketch { .. } => {
                ErrorKind::Validation
            }
            Self::SketchNotFound { .. } | Self::ProfileNotFound { .. } => ErrorKind::NotFound,
            Self::Engine { .. } => ErrorKind::EngineFailure,
            Self::NoActiveDesign => ErrorKind::NoActiveDesign,
        }
    }
}

/// Result type for command operations.
pub type CommandResult<T> = Result<T, CommandError>;

/// Fatal errors raised while bringing the transport server up.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The listening socket could not be bound.
    #[error("Failed to start RPC server: cannot bind {host}:{port}")]
    Bind {
        /// Configured host.
        host: String,
        /// Configured port.
        port: u16,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Socket setup after bind failed.
    #[error("Failed to start RPC server: listener setup failed on {addr}")]
    Listener {
        /// Bound address.
        addr: SocketAddr,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// The async runtime for the accept loop could not be built.
    #[error("Failed to start RPC server: runtime creation failed")]
    Runtime(#[source] io::Error),

    /// The background loop thread could not be spawned.
    #[error("Failed to start RPC server: cannot spawn server thread")]
    Thread(#[source] io::Error),
}

/// Errors raised while turning a wire call into a typed command.
///
/// These are transport-level faults, not envelope failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// The method name is not in the method table.
    #[error("Method not found: {0}")]
    UnknownMethod(String),

    /// The argument list does not match the method's signature.
    #[error("Invalid params for '{method}': {message}")]
    InvalidParams {
        /// Method being called.
        method: &'static str,
        /// What is wrong with the arguments.
        message: String,
    },
}

/// Errors raised when handing a command to the executor.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The executor has stopped; nothing will run the command.
    #[error("command executor is not running")]
    ExecutorClosed,
}

/// Errors raised by the RPC client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Could not connect to the bridge server.
    #[error("failed to connect to CAD bridge at {addr}: {source}")]
    Connect {
        /// Address that was dialled.
        addr: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Reading or writing the connection failed.
    #[error("connection error: {0}")]
    Io(#[from] io::Error),

    /// The server did not answer in time.
    #[error("timed out after {timeout_ms} ms waiting for '{method}'")]
    Timeout {
        /// Method that was called.
        method: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The reply could not be understood.
    #[error("malformed reply: {0}")]
    Protocol(String),

    /// The server rejected the call at the transport level.
    #[error("RPC fault {code}: {message}")]
    Fault {
        /// JSON-RPC error code.
        code: i32,
        /// Error message from the server.
        message: String,
    },
}
