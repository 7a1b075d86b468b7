//! The wire-layer contract consumed by sessions.
//!
//! The actual substrate (SOAP/HTTP, a message bus, an in-memory fake) is
//! not this crate's concern; anything that can open a shell, run one
//! command in it and report the captured output qualifies.

use std::future::Future;
use std::pin::Pin;

use cmdferry_protocol::{CommandResult, DecodeError, OutputDecoder, OutputRecord};

/// Boxed future returned by [`Transport`] methods.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Errors surfaced by the wire layer.
///
/// Timeouts and connection faults arrive here too; the protocol layer
/// never sees silent data loss.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("remote refused the shell: {0}")]
    Rejected(String),

    #[error("transport fault: {0}")]
    Fault(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which kind of remote execution context to allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// One-shot command execution shell.
    Command,
    /// Reusable execution pool for an interactive scripting host.
    Pipeline,
}

/// Opaque identity of an allocated remote shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShellHandle(String);

impl ShellHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

/// Raw captured output of one command round trip.
#[derive(Debug, Clone)]
pub enum RawOutput {
    /// Flat text output, produced by one-shot command shells.
    Flat {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },
    /// Structured record frames, produced by pipeline shells.
    Records(Vec<OutputRecord>),
}

impl RawOutput {
    /// Normalizes into a [`CommandResult`], decoding record frames with
    /// the given decoder.
    pub fn into_result(self, decoder: &dyn OutputDecoder) -> Result<CommandResult, DecodeError> {
        match self {
            RawOutput::Flat {
                exit_code,
                stdout,
                stderr,
            } => Ok(CommandResult {
                exit_code,
                stdout,
                stderr,
            }),
            RawOutput::Records(records) => decoder.decode(&records),
        }
    }
}

/// Executes commands in remote shells on behalf of a session.
pub trait Transport: Send + Sync {
    /// Allocates a remote shell of the given kind.
    fn open_shell(&self, kind: ShellKind) -> TransportFuture<'_, ShellHandle>;

    /// Runs one command in the shell and returns its captured output.
    fn send_command(
        &self,
        shell: &ShellHandle,
        command: &str,
        args: &[String],
    ) -> TransportFuture<'_, RawOutput>;

    /// Re-touches the shell so it does not expire while idle.
    fn keep_alive(&self, shell: &ShellHandle) -> TransportFuture<'_, ()>;

    /// Releases the remote shell.
    fn close_shell(&self, shell: &ShellHandle) -> TransportFuture<'_, ()>;
}
