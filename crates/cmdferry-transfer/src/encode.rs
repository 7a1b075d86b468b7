//! Transport-safe payload encoding and chunking.
//!
//! The command channel carries single-line text only, so payloads travel
//! as newline-free base64 split into slices that fit the per-command
//! budget. Chunks are produced strictly left to right; appending them in
//! order and decoding the concatenation reproduces the original bytes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use cmdferry_protocol::constants::MIN_CHUNK_LENGTH;

use crate::UploadError;

/// Encodes content into the printable, newline-free transfer form.
pub fn encode_content(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Computes the usable chunk size for a command budget and a per-command
/// framing overhead.
///
/// Fails when less than [`MIN_CHUNK_LENGTH`] remains, which only happens
/// when the temp path (or other framing) has eaten nearly the whole
/// command budget.
pub fn chunk_size(max_command_length: usize, overhead: usize) -> Result<usize, UploadError> {
    let available = max_command_length.saturating_sub(overhead);
    if available < MIN_CHUNK_LENGTH {
        return Err(UploadError::ChunkBudget(format!(
            "framing overhead {overhead} leaves {available} of {max_command_length} characters"
        )));
    }
    Ok(available)
}

/// Iterator over ordered, bounded slices of an encoded payload.
pub struct Chunker<'a> {
    encoded: &'a str,
    chunk_size: usize,
    offset: usize,
}

impl<'a> Chunker<'a> {
    pub fn new(encoded: &'a str, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0);
        Self {
            encoded,
            chunk_size,
            offset: 0,
        }
    }
}

impl<'a> Iterator for Chunker<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.offset >= self.encoded.len() {
            return None;
        }
        let end = usize::min(self.offset + self.chunk_size, self.encoded.len());
        let chunk = &self.encoded[self.offset..end];
        self.offset = end;
        Some(chunk)
    }
}
