//! Remote shell sessions for the cmdferry command channel.
//!
//! A [`Session`] owns one remote execution context for the lifetime of an
//! operation: open it, run commands through it, close it. Two variants
//! exist: [`CommandShell`] for one-shot command execution and
//! [`PipelineShell`] for a pooled interactive host that is kept warm with
//! periodic keepalive pings. Both sit on top of the narrow [`Transport`]
//! trait, which is all the wire layer has to provide.

mod cmd;
mod keepalive;
mod pool;
mod state;
mod transport;

pub use cmd::CommandShell;
pub use pool::PipelineShell;
pub use state::SessionState;
pub use transport::{RawOutput, ShellHandle, ShellKind, Transport, TransportError, TransportFuture};

use std::future::Future;
use std::pin::Pin;

use cmdferry_protocol::{CommandResult, DecodeError};

/// Boxed future returned by [`Session`] methods.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + Send + 'a>>;

/// Errors from session lifecycle and command execution.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to open remote shell: {0}")]
    Open(String),

    #[error("session was already opened")]
    AlreadyOpen,

    #[error("session is not open")]
    NotOpen,

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("output decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One remote execution context.
///
/// State machine: `Unopened → Open → Closed`, with no transition out of
/// `Closed`. `execute` is only valid while `Open` and fails fast with
/// [`SessionError::NotOpen`] otherwise. `close` is idempotent-safe: closing
/// a session that never opened (or one already closed) is a no-op `Ok`.
/// Callers that open a session are responsible for closing it on every
/// exit path, including error paths.
pub trait Session: Send + Sync {
    /// Requests a new remote execution context from the transport.
    fn open(&self) -> SessionFuture<'_, ()>;

    /// Runs one command and blocks until its result is available.
    fn execute(&self, command: &str, args: &[String]) -> SessionFuture<'_, CommandResult>;

    /// Releases the remote execution context.
    fn close(&self) -> SessionFuture<'_, ()>;

    /// Current lifecycle state.
    fn state(&self) -> SessionState;
}
