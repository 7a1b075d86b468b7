//! The change-aware upload algorithm.

use std::path::PathBuf;

use tracing::{debug, warn};

use cmdferry_protocol::CommandResult;
use cmdferry_protocol::constants::MAX_COMMAND_LENGTH;
use cmdferry_scripting::{CommandLine, ScriptDialect};
use cmdferry_session::Session;

use crate::progress::ProgressEvent;
use crate::{UploadError, checksum, encode};

/// One local file bound for one remote destination.
///
/// `upload` owns the whole protocol exchange: it opens the session, runs
/// the resolve step, streams chunks if the destination is stale, runs the
/// finalize step, and closes the session on every exit path.
pub struct RemoteFile<'a> {
    session: &'a dyn Session,
    dialect: &'a dyn ScriptDialect,
    local_path: PathBuf,
    remote_path: String,
    max_command_length: usize,
}

impl<'a> RemoteFile<'a> {
    pub fn new(
        session: &'a dyn Session,
        dialect: &'a dyn ScriptDialect,
        local_path: impl Into<PathBuf>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            session,
            dialect,
            local_path: local_path.into(),
            remote_path: remote_path.into(),
            max_command_length: MAX_COMMAND_LENGTH,
        }
    }

    /// Overrides the per-command character budget.
    pub fn with_command_budget(mut self, max_command_length: usize) -> Self {
        self.max_command_length = max_command_length;
        self
    }

    /// Uploads without progress reporting.
    pub async fn upload(&self) -> Result<u64, UploadError> {
        self.upload_with_progress(|_| {}).await
    }

    /// Uploads, invoking `progress` with running totals after each chunk
    /// append. Returns the number of encoded characters transferred, or 0
    /// when the destination was already current.
    pub async fn upload_with_progress<F>(&self, progress: F) -> Result<u64, UploadError>
    where
        F: Fn(ProgressEvent),
    {
        // Cheap fail before any remote resource is allocated.
        if !self.local_path.exists() {
            return Err(UploadError::SourceNotFound(self.local_path.clone()));
        }

        debug!(
            local = %self.local_path.display(),
            remote = %self.remote_path,
            "uploading file"
        );

        self.session.open().await?;

        let result = self.transfer(&progress).await;

        // The session is closed no matter how the transfer went. The first
        // error wins: a close failure after a transfer failure is reported
        // but never replaces it.
        match self.session.close().await {
            Ok(()) => result,
            Err(close_err) => match result {
                Ok(_) => Err(UploadError::Session(close_err)),
                Err(first) => {
                    warn!(error = %close_err, "session close failed after upload error");
                    Err(first)
                }
            },
        }
    }

    async fn transfer<F>(&self, progress: &F) -> Result<u64, UploadError>
    where
        F: Fn(ProgressEvent),
    {
        let content = tokio::fs::read(&self.local_path).await?;
        let fingerprint = checksum::fingerprint_bytes(&content);

        let resolve = self
            .dialect
            .resolve_destination(&self.remote_path, &fingerprint);
        let resolved = self.run(&resolve).await?;
        let temp_path = resolved.stdout.trim().to_string();

        if temp_path.is_empty() {
            debug!(
                local = %self.local_path.display(),
                remote = %self.remote_path,
                "destination is current, not copying"
            );
            return Ok(0);
        }

        let encoded = encode::encode_content(&content);
        if encoded.contains(['\n', '\r']) {
            // Append commands are single-line; a wrapped encoding cannot
            // cross the channel intact.
            return Err(UploadError::Encoding(
                "encoded payload contains line breaks".into(),
            ));
        }
        let total = encoded.len() as u64;

        if encoded.is_empty() {
            let cmd = self.dialect.create_empty_target(&temp_path);
            self.run(&cmd).await?;
        } else {
            let overhead = self.dialect.command_overhead(&temp_path);
            let size = encode::chunk_size(self.max_command_length, overhead)?;
            debug!(temp = %temp_path, chunk_size = size, total, "streaming chunks");

            let mut copied = 0u64;
            for chunk in encode::Chunker::new(&encoded, size) {
                let cmd = self.dialect.append_chunk(&temp_path, chunk);
                self.run(&cmd).await?;
                copied += chunk.len() as u64;
                progress(ProgressEvent {
                    bytes_copied: copied,
                    total_bytes: total,
                    local_path: self.local_path.display().to_string(),
                    remote_path: self.remote_path.clone(),
                });
            }
        }

        let finalize = self.dialect.finalize(&temp_path, &self.remote_path);
        self.run(&finalize).await?;

        Ok(total)
    }

    /// Runs one command and enforces the hard-failure contract: nonzero
    /// exit or any error-stream text aborts the upload.
    async fn run(&self, cmd: &CommandLine) -> Result<CommandResult, UploadError> {
        let result = self.session.execute(&cmd.command, &cmd.args).await?;
        if !result.success() {
            return Err(UploadError::Command {
                from: self.local_path.display().to_string(),
                to: self.remote_path.clone(),
                message: result.output(),
            });
        }
        Ok(result)
    }
}
