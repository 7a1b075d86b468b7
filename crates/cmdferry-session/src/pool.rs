//! Pooled interactive shell with keepalive.
//!
//! Models a richer remote scripting host: `open` establishes a reusable
//! execution pool, commands are wrapped into structured pipeline-create
//! requests, and output arrives as record frames demultiplexed by an
//! [`OutputDecoder`]. While the session is open a background pump pings
//! the pool so it does not expire idle.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use cmdferry_protocol::constants::KEEPALIVE_PERIOD;
use cmdferry_protocol::{CommandResult, OutputDecoder, PipelineRequest, RecordDecoder};

use crate::keepalive::keepalive_pump;
use crate::transport::{ShellHandle, ShellKind, Transport};
use crate::{Session, SessionError, SessionFuture, SessionState};

/// A session backed by a remote execution pool.
///
/// The contract is identical to [`CommandShell`](crate::CommandShell);
/// only the realization differs. Keepalive pings and commands share one
/// serialized channel, so a ping never lands between a command and its
/// response.
pub struct PipelineShell {
    transport: Arc<dyn Transport>,
    decoder: Arc<dyn OutputDecoder>,
    keepalive_period: Duration,
    inner: Mutex<Inner>,
    channel: Arc<tokio::sync::Mutex<()>>,
    cancel: CancellationToken,
}

struct Inner {
    state: SessionState,
    handle: Option<ShellHandle>,
}

impl PipelineShell {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            decoder: Arc::new(RecordDecoder),
            keepalive_period: KEEPALIVE_PERIOD,
            inner: Mutex::new(Inner {
                state: SessionState::Unopened,
                handle: None,
            }),
            channel: Arc::new(tokio::sync::Mutex::new(())),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the default [`RecordDecoder`].
    pub fn with_decoder(mut self, decoder: Arc<dyn OutputDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    /// Overrides the keepalive interval.
    pub fn with_keepalive_period(mut self, period: Duration) -> Self {
        self.keepalive_period = period;
        self
    }

    fn open_handle(&self) -> Result<ShellHandle, SessionError> {
        let inner = self.inner.lock().unwrap();
        if inner.state != SessionState::Open {
            return Err(SessionError::NotOpen);
        }
        inner.handle.clone().ok_or(SessionError::NotOpen)
    }
}

impl Session for PipelineShell {
    fn open(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            if self.inner.lock().unwrap().state != SessionState::Unopened {
                return Err(SessionError::AlreadyOpen);
            }

            let handle = self
                .transport
                .open_shell(ShellKind::Pipeline)
                .await
                .map_err(|e| SessionError::Open(e.to_string()))?;

            // Register the pool with the remote keepalive machinery before
            // anything else runs in it.
            self.transport
                .keep_alive(&handle)
                .await
                .map_err(|e| SessionError::Open(e.to_string()))?;

            info!(shell = %handle.id(), "opened pipeline shell");

            tokio::spawn(keepalive_pump(
                self.transport.clone(),
                handle.clone(),
                self.channel.clone(),
                self.keepalive_period,
                self.cancel.clone(),
            ));

            let mut inner = self.inner.lock().unwrap();
            inner.state = SessionState::Open;
            inner.handle = Some(handle);
            Ok(())
        })
    }

    fn execute(&self, command: &str, args: &[String]) -> SessionFuture<'_, CommandResult> {
        let script = if args.is_empty() {
            command.to_string()
        } else {
            format!("{command} {}", args.join(" "))
        };
        Box::pin(async move {
            let handle = self.open_handle()?;

            let request = PipelineRequest::new(uuid::Uuid::new_v4().to_string(), script);
            let body = serde_json::to_string(&request)?;

            let raw = {
                let _permit = self.channel.lock().await;
                self.transport.send_command(&handle, &body, &[]).await?
            };

            let result = raw.into_result(self.decoder.as_ref())?;
            debug!(
                shell = %handle.id(),
                pipeline = %request.pipeline_id,
                exit = result.exit_code,
                "pipeline completed"
            );
            Ok(result)
        })
    }

    fn close(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            self.cancel.cancel();

            let handle = {
                let mut inner = self.inner.lock().unwrap();
                let was_open = inner.state == SessionState::Open;
                inner.state = SessionState::Closed;
                if was_open { inner.handle.take() } else { None }
            };

            if let Some(handle) = handle {
                // Serialize with any in-flight ping before releasing.
                let _permit = self.channel.lock().await;
                self.transport.close_shell(&handle).await?;
                debug!(shell = %handle.id(), "released execution pool");
            }
            Ok(())
        })
    }

    fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }
}

impl Drop for PipelineShell {
    fn drop(&mut self) {
        // Session release stays an explicit close call; dropping only
        // stops the keepalive task so it cannot outlive the owner.
        self.cancel.cancel();
        if let Ok(inner) = self.inner.lock()
            && inner.state == SessionState::Open
        {
            debug!("pipeline shell dropped while open; pool not released");
        }
    }
}
