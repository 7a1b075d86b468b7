//! Keepalive pump — periodic re-touch of a pooled remote shell.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::transport::{ShellHandle, Transport};

/// Pings the remote shell on an interval until cancelled.
///
/// The pump shares the session's serialized command channel: a ping is
/// never interleaved between a command and its response.
pub(crate) async fn keepalive_pump(
    transport: Arc<dyn Transport>,
    shell: ShellHandle,
    channel: Arc<tokio::sync::Mutex<()>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    // Ticks missed while a long transfer holds the channel collapse into
    // one delayed ping instead of a burst.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // Skip immediate first tick.

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let _permit = channel.lock().await;
                if let Err(e) = transport.keep_alive(&shell).await {
                    warn!(shell = %shell.id(), error = %e, "keepalive failed");
                    break;
                }
            }
        }
    }
}
