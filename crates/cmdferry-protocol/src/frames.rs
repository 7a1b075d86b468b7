use serde::{Deserialize, Serialize};

use crate::result::CommandResult;

/// One frame of pooled-shell output.
///
/// A pipeline shell does not return flat text; the remote side streams a
/// sequence of typed records that are demultiplexed into the normalized
/// [`CommandResult`] by an [`OutputDecoder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputRecord {
    /// A piece of standard output text.
    Stdout { text: String },
    /// A remote error record.
    ErrorRecord { text: String },
    /// Pipeline completion with the final exit code. Terminates the stream.
    Done { exit_code: i32 },
}

/// Errors produced while decoding an output record stream.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("output stream ended without a completion record")]
    MissingCompletion,
}

/// Converts a stream of output records into a [`CommandResult`].
///
/// Session variants that receive structured frames hold one of these; the
/// default [`RecordDecoder`] suits any transport that delivers records in
/// pipeline order.
pub trait OutputDecoder: Send + Sync {
    fn decode(&self, records: &[OutputRecord]) -> Result<CommandResult, DecodeError>;
}

/// Default decoder: concatenates stdout and error text in arrival order,
/// takes the exit code from the completion record.
pub struct RecordDecoder;

impl OutputDecoder for RecordDecoder {
    fn decode(&self, records: &[OutputRecord]) -> Result<CommandResult, DecodeError> {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = None;

        for record in records {
            match record {
                OutputRecord::Stdout { text } => stdout.push_str(text),
                OutputRecord::ErrorRecord { text } => stderr.push_str(text),
                OutputRecord::Done { exit_code: code } => exit_code = Some(*code),
            }
        }

        let exit_code = exit_code.ok_or(DecodeError::MissingCompletion)?;
        Ok(CommandResult {
            exit_code,
            stdout,
            stderr,
        })
    }
}
