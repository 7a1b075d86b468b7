//! Remote scripting dialects.
//!
//! The transfer protocol never depends on a specific remote scripting
//! syntax. Everything it needs from the remote side (resolving the
//! destination, appending encoded chunks, materializing the final file)
//! is expressed through [`ScriptDialect`], and each dialect builds the
//! concrete command lines for its target shell.

mod powershell;

pub use powershell::PowerShellDialect;

/// A single ready-to-send command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    pub command: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// A bare command with no arguments.
    pub fn bare(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    /// Total characters this invocation puts on the command channel.
    pub fn len(&self) -> usize {
        self.args
            .iter()
            .fold(self.command.len(), |n, a| n + 1 + a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the remote-side operations of a transfer for one scripting
/// dialect.
///
/// Implementations are pure command builders: they never talk to the
/// remote host themselves, which keeps every dialect independently
/// testable against the same contract.
pub trait ScriptDialect: Send + Sync {
    /// Remote semantics: resolve the real destination path; if it exists
    /// and its content fingerprint equals `fingerprint`, print nothing;
    /// otherwise allocate and print a fresh writable temp file path.
    fn resolve_destination(&self, dest_path: &str, fingerprint: &str) -> CommandLine;

    /// Appends one encoded chunk to the temp file. Must stay a bare
    /// single-line command; this is the hot path of the transfer.
    fn append_chunk(&self, temp_path: &str, chunk: &str) -> CommandLine;

    /// Creates a zero-length marker at the temp path (zero-length source).
    fn create_empty_target(&self, temp_path: &str) -> CommandLine;

    /// Remote semantics: decode the temp file's content, create the
    /// destination's parent directories, and write the decoded bytes to
    /// the destination. Absent temp content yields an empty destination
    /// file.
    fn finalize(&self, temp_path: &str, dest_path: &str) -> CommandLine;

    /// Exact per-append framing overhead in characters for the given temp
    /// path. The transfer layer subtracts this from the command budget
    /// when sizing chunks.
    fn command_overhead(&self, temp_path: &str) -> usize {
        self.append_chunk(temp_path, "").len()
    }
}
