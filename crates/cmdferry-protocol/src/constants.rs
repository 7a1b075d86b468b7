use std::time::Duration;

/// Upper bound on the characters a single remote command invocation may
/// carry, including the command name and all framing.
///
/// Remote command shells reject longer lines outright, so the transfer
/// layer sizes its chunks against this budget.
pub const MAX_COMMAND_LENGTH: usize = 8000;

/// Smallest chunk the transfer layer will emit.
///
/// If the per-command framing overhead leaves less room than this (for
/// example with an absurdly long temp path), chunk construction fails
/// instead of producing a command that exceeds [`MAX_COMMAND_LENGTH`].
pub const MIN_CHUNK_LENGTH: usize = 64;

/// How often an open pipeline shell re-touches its remote execution pool
/// so the pool does not expire while idle.
pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(30);
