pub mod constants;
pub mod frames;
pub mod pipeline;
pub mod result;

// Re-export primary types for convenience.
pub use frames::{DecodeError, OutputDecoder, OutputRecord, RecordDecoder};
pub use pipeline::PipelineRequest;
pub use result::CommandResult;
