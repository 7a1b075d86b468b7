//! One-shot command execution shell.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use cmdferry_protocol::{CommandResult, RecordDecoder};

use crate::transport::{ShellHandle, ShellKind, Transport};
use crate::{Session, SessionError, SessionFuture, SessionState};

/// A session backed by a plain remote command shell.
///
/// Commands map one-to-one onto the transport; output is flat text.
pub struct CommandShell {
    transport: Arc<dyn Transport>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: SessionState,
    handle: Option<ShellHandle>,
}

impl CommandShell {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            inner: Mutex::new(Inner {
                state: SessionState::Unopened,
                handle: None,
            }),
        }
    }

    fn open_handle(&self) -> Result<ShellHandle, SessionError> {
        let inner = self.inner.lock().unwrap();
        if inner.state != SessionState::Open {
            return Err(SessionError::NotOpen);
        }
        inner.handle.clone().ok_or(SessionError::NotOpen)
    }
}

impl Session for CommandShell {
    fn open(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            if self.inner.lock().unwrap().state != SessionState::Unopened {
                return Err(SessionError::AlreadyOpen);
            }

            let handle = self
                .transport
                .open_shell(ShellKind::Command)
                .await
                .map_err(|e| SessionError::Open(e.to_string()))?;
            info!(shell = %handle.id(), "opened command shell");

            let mut inner = self.inner.lock().unwrap();
            inner.state = SessionState::Open;
            inner.handle = Some(handle);
            Ok(())
        })
    }

    fn execute(&self, command: &str, args: &[String]) -> SessionFuture<'_, CommandResult> {
        let command = command.to_string();
        let args = args.to_vec();
        Box::pin(async move {
            let handle = self.open_handle()?;
            let raw = self.transport.send_command(&handle, &command, &args).await?;
            let result = raw.into_result(&RecordDecoder)?;
            debug!(shell = %handle.id(), exit = result.exit_code, "command completed");
            Ok(result)
        })
    }

    fn close(&self) -> SessionFuture<'_, ()> {
        Box::pin(async move {
            let handle = {
                let mut inner = self.inner.lock().unwrap();
                let was_open = inner.state == SessionState::Open;
                inner.state = SessionState::Closed;
                if was_open { inner.handle.take() } else { None }
            };

            if let Some(handle) = handle {
                self.transport.close_shell(&handle).await?;
                debug!(shell = %handle.id(), "closed command shell");
            }
            Ok(())
        })
    }

    fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state
    }
}
