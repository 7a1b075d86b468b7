//! Change-aware file upload over a length-limited command channel.
//!
//! The upload never streams bytes natively: the local content is
//! fingerprinted, base64-encoded, split into command-sized chunks and
//! appended to a remote temp file one command round trip at a time, then
//! reassembled into the real destination by a finalize command. When the
//! destination already carries the same content, nothing is transferred
//! at all.

mod checksum;
mod encode;
mod progress;
mod upload;

pub use checksum::{fingerprint_bytes, fingerprint_file};
pub use encode::{Chunker, chunk_size, encode_content};
pub use progress::ProgressEvent;
pub use upload::RemoteFile;

use std::path::PathBuf;

use cmdferry_session::SessionError;

/// Errors produced by an upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("cannot find path: {0}")]
    SourceNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("upload of {from} to {to} failed: {message}")]
    Command {
        from: String,
        to: String,
        message: String,
    },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("command budget exhausted: {0}")]
    ChunkBudget(String),
}
