/// Progress notification emitted after each chunk append.
///
/// Purely observational; counts are in encoded characters, matching the
/// transferred size the upload returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub bytes_copied: u64,
    pub total_bytes: u64,
    pub local_path: String,
    pub remote_path: String,
}
