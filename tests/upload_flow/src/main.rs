fn main() {
    println!("Run `cargo test -p upload-flow` to execute the end-to-end upload scenarios.");
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;

    use cmdferry_protocol::{OutputRecord, PipelineRequest};
    use cmdferry_scripting::{CommandLine, ScriptDialect};
    use cmdferry_session::{
        CommandShell, PipelineShell, RawOutput, ShellHandle, ShellKind, Transport, TransportFuture,
    };
    use cmdferry_transfer::{RemoteFile, UploadError, fingerprint_bytes};

    // -----------------------------------------------------------------------
    // Test dialect: a plain line protocol the fake remote interprets.
    // -----------------------------------------------------------------------

    struct LineDialect;

    impl ScriptDialect for LineDialect {
        fn resolve_destination(&self, dest_path: &str, fingerprint: &str) -> CommandLine {
            CommandLine::bare(format!("RESOLVE {dest_path} {fingerprint}"))
        }

        fn append_chunk(&self, temp_path: &str, chunk: &str) -> CommandLine {
            CommandLine::bare(format!("APPEND {temp_path} {chunk}"))
        }

        fn create_empty_target(&self, temp_path: &str) -> CommandLine {
            CommandLine::bare(format!("EMPTY {temp_path}"))
        }

        fn finalize(&self, temp_path: &str, dest_path: &str) -> CommandLine {
            CommandLine::bare(format!("FINALIZE {temp_path} {dest_path}"))
        }
    }

    // -----------------------------------------------------------------------
    // In-memory remote host.
    // -----------------------------------------------------------------------

    #[derive(Default)]
    struct RemoteState {
        /// Materialized destination files.
        files: HashMap<String, Vec<u8>>,
        /// Encoded text buffered in temp files.
        temp_files: HashMap<String, String>,
        next_temp: usize,
        shell_kinds: HashMap<String, ShellKind>,
        next_shell: usize,
        commands: Vec<String>,
        longest_command: usize,
        shells_closed: usize,
        pings: usize,
        /// When set, the Nth command (0-based) reports a remote failure.
        fail_at: Option<usize>,
    }

    /// Fake remote host: allocates shells, interprets the line protocol
    /// against an in-memory filesystem, and answers pipeline requests with
    /// record frames.
    #[derive(Default)]
    struct MemoryRemote {
        state: Mutex<RemoteState>,
    }

    impl MemoryRemote {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn failing_at(index: usize) -> Arc<Self> {
            let remote = Self::default();
            remote.state.lock().unwrap().fail_at = Some(index);
            Arc::new(remote)
        }

        fn seed_file(&self, path: &str, data: &[u8]) {
            self.state
                .lock()
                .unwrap()
                .files
                .insert(path.into(), data.to_vec());
        }

        fn file(&self, path: &str) -> Option<Vec<u8>> {
            self.state.lock().unwrap().files.get(path).cloned()
        }

        fn appends(&self) -> Vec<String> {
            self.state
                .lock()
                .unwrap()
                .commands
                .iter()
                .filter(|c| c.starts_with("APPEND"))
                .cloned()
                .collect()
        }

        fn shells_closed(&self) -> usize {
            self.state.lock().unwrap().shells_closed
        }

        fn command_count(&self) -> usize {
            self.state.lock().unwrap().commands.len()
        }

        fn longest_command(&self) -> usize {
            self.state.lock().unwrap().longest_command
        }

        fn pings(&self) -> usize {
            self.state.lock().unwrap().pings
        }

        /// Interprets one protocol line. Returns (exit_code, stdout, stderr).
        fn run_line(state: &mut RemoteState, line: &str) -> (i32, String, String) {
            let parts: Vec<&str> = line.split_whitespace().collect();
            match parts.as_slice() {
                ["RESOLVE", dest, fingerprint] => {
                    if let Some(existing) = state.files.get(*dest)
                        && fingerprint_bytes(existing) == *fingerprint
                    {
                        return (0, String::new(), String::new());
                    }
                    let temp = format!("remote-tmp-{}", state.next_temp);
                    state.next_temp += 1;
                    state.temp_files.insert(temp.clone(), String::new());
                    (0, temp, String::new())
                }
                ["APPEND", temp, chunk] => {
                    state
                        .temp_files
                        .entry((*temp).to_string())
                        .or_default()
                        .push_str(chunk);
                    (0, String::new(), String::new())
                }
                ["EMPTY", temp] => {
                    state.temp_files.insert((*temp).to_string(), String::new());
                    (0, String::new(), String::new())
                }
                ["FINALIZE", temp, dest] => {
                    let encoded = state.temp_files.get(*temp).cloned().unwrap_or_default();
                    match BASE64.decode(encoded) {
                        Ok(bytes) => {
                            state.files.insert((*dest).to_string(), bytes);
                            (0, String::new(), String::new())
                        }
                        Err(e) => (1, String::new(), format!("decode failed: {e}")),
                    }
                }
                _ => (1, String::new(), format!("unknown command: {line}")),
            }
        }
    }

    impl Transport for MemoryRemote {
        fn open_shell(&self, kind: ShellKind) -> TransportFuture<'_, ShellHandle> {
            Box::pin(async move {
                let mut state = self.state.lock().unwrap();
                let id = format!("shell-{}", state.next_shell);
                state.next_shell += 1;
                state.shell_kinds.insert(id.clone(), kind);
                Ok(ShellHandle::new(id))
            })
        }

        fn send_command(
            &self,
            shell: &ShellHandle,
            command: &str,
            args: &[String],
        ) -> TransportFuture<'_, RawOutput> {
            let shell_id = shell.id().to_string();
            let command = command.to_string();
            let args = args.to_vec();
            Box::pin(async move {
                let mut state = self.state.lock().unwrap();

                let full_len = args
                    .iter()
                    .fold(command.len(), |n, a| n + 1 + a.len());
                state.longest_command = state.longest_command.max(full_len);

                let index = state.commands.len();
                let kind = state.shell_kinds[&shell_id];

                // Pipeline shells ship a structured envelope; unwrap it to
                // the script line before interpreting.
                let line = match kind {
                    ShellKind::Command => command.clone(),
                    ShellKind::Pipeline => {
                        let request: PipelineRequest = serde_json::from_str(&command).unwrap();
                        request.script
                    }
                };
                state.commands.push(line.clone());

                let (exit_code, stdout, stderr) = if state.fail_at == Some(index) {
                    (1, String::new(), "injected remote failure".to_string())
                } else {
                    Self::run_line(&mut state, &line)
                };

                Ok(match kind {
                    ShellKind::Command => RawOutput::Flat {
                        exit_code,
                        stdout,
                        stderr,
                    },
                    ShellKind::Pipeline => {
                        let mut records = vec![OutputRecord::Stdout { text: stdout }];
                        if !stderr.is_empty() {
                            records.push(OutputRecord::ErrorRecord { text: stderr });
                        }
                        records.push(OutputRecord::Done { exit_code });
                        RawOutput::Records(records)
                    }
                })
            })
        }

        fn keep_alive(&self, _shell: &ShellHandle) -> TransportFuture<'_, ()> {
            Box::pin(async move {
                self.state.lock().unwrap().pings += 1;
                Ok(())
            })
        }

        fn close_shell(&self, _shell: &ShellHandle) -> TransportFuture<'_, ()> {
            Box::pin(async move {
                self.state.lock().unwrap().shells_closed += 1;
                Ok(())
            })
        }
    }

    fn local_file(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    async fn upload_once(
        remote: &Arc<MemoryRemote>,
        local: &PathBuf,
        dest: &str,
        budget: Option<usize>,
    ) -> Result<u64, UploadError> {
        let session = CommandShell::new(remote.clone());
        let mut file = RemoteFile::new(&session, &LineDialect, local, dest);
        if let Some(budget) = budget {
            file = file.with_command_budget(budget);
        }
        file.upload().await
    }

    // -----------------------------------------------------------------------
    // Scenarios
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn first_upload_materializes_the_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = local_file(&dir, "a.txt", b"hi");
        let remote = MemoryRemote::new();

        let size = upload_once(&remote, &local, "C:/tmp/a.txt", None)
            .await
            .unwrap();

        // base64("hi") == "aGk=": one chunk, four encoded characters.
        assert_eq!(size, 4);
        let appends = remote.appends();
        assert_eq!(appends, vec!["APPEND remote-tmp-0 aGk="]);
        assert_eq!(remote.file("C:/tmp/a.txt").unwrap(), b"hi");
        assert_eq!(remote.shells_closed(), 1);
    }

    #[tokio::test]
    async fn unchanged_reupload_transfers_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = local_file(&dir, "a.txt", b"hi");
        let remote = MemoryRemote::new();

        let first = upload_once(&remote, &local, "C:/tmp/a.txt", None)
            .await
            .unwrap();
        assert_eq!(first, 4);
        let appends_after_first = remote.appends().len();

        let second = upload_once(&remote, &local, "C:/tmp/a.txt", None)
            .await
            .unwrap();
        assert_eq!(second, 0);
        assert_eq!(remote.appends().len(), appends_after_first);
        assert_eq!(remote.shells_closed(), 2);
    }

    #[tokio::test]
    async fn changed_content_is_detected_and_replaces_the_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = local_file(&dir, "a.txt", b"old content");
        let remote = MemoryRemote::new();
        remote.seed_file("C:/tmp/a.txt", b"something else entirely");

        let size = upload_once(&remote, &local, "C:/tmp/a.txt", None)
            .await
            .unwrap();

        assert!(size > 0);
        assert_eq!(remote.file("C:/tmp/a.txt").unwrap(), b"old content");
    }

    #[tokio::test]
    async fn zero_length_source_creates_an_empty_destination() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = local_file(&dir, "empty.bin", b"");
        let remote = MemoryRemote::new();

        let size = upload_once(&remote, &local, "C:/tmp/empty.bin", None)
            .await
            .unwrap();

        assert_eq!(size, 0);
        assert!(remote.appends().is_empty());
        assert_eq!(remote.file("C:/tmp/empty.bin").unwrap(), b"");
    }

    #[tokio::test]
    async fn multi_chunk_stream_reproduces_the_exact_bytes() {
        let dir = tempfile::TempDir::new().unwrap();
        let content: Vec<u8> = (0u8..=255).cycle().take(2000).collect();
        let local = local_file(&dir, "big.bin", &content);
        let remote = MemoryRemote::new();

        let size = upload_once(&remote, &local, "C:/tmp/big.bin", Some(100))
            .await
            .unwrap();

        assert!(remote.appends().len() > 10, "expected many chunk appends");
        assert_eq!(size as usize, content.len().div_ceil(3) * 4);
        assert_eq!(remote.file("C:/tmp/big.bin").unwrap(), content);
    }

    #[tokio::test]
    async fn no_command_exceeds_the_budget() {
        let dir = tempfile::TempDir::new().unwrap();
        let content = vec![0x5Au8; 1500];
        let local = local_file(&dir, "bound.bin", &content);
        let remote = MemoryRemote::new();

        let budget = 120;
        upload_once(&remote, &local, "C:/d/bound.bin", Some(budget))
            .await
            .unwrap();

        assert!(
            remote.longest_command() <= budget,
            "longest command {} exceeds budget {budget}",
            remote.longest_command()
        );
        assert_eq!(remote.file("C:/d/bound.bin").unwrap(), content);
    }

    #[tokio::test]
    async fn every_injected_failure_still_closes_the_session_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let content = vec![0x42u8; 400];
        let local = local_file(&dir, "f.bin", &content);

        // Count the commands of a clean run, then fail each one in turn.
        let clean = MemoryRemote::new();
        upload_once(&clean, &local, "C:/tmp/f.bin", Some(200))
            .await
            .unwrap();
        let total_commands = clean.command_count();
        assert!(total_commands >= 3); // resolve + appends + finalize

        for index in 0..total_commands {
            let remote = MemoryRemote::failing_at(index);
            let result = upload_once(&remote, &local, "C:/tmp/f.bin", Some(200)).await;

            assert!(
                matches!(result, Err(UploadError::Command { .. })),
                "failure at command {index} was not surfaced"
            );
            assert_eq!(
                remote.shells_closed(),
                1,
                "failure at command {index} leaked the session"
            );
            assert!(
                remote.file("C:/tmp/f.bin").is_none(),
                "failure at command {index} left a partial destination"
            );
        }
    }

    #[tokio::test]
    async fn pipeline_shell_runs_the_same_protocol() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = local_file(&dir, "a.txt", b"hi");
        let remote = MemoryRemote::new();

        let session = PipelineShell::new(remote.clone());
        let size = RemoteFile::new(&session, &LineDialect, &local, "C:/tmp/a.txt")
            .upload()
            .await
            .unwrap();

        assert_eq!(size, 4);
        assert_eq!(remote.file("C:/tmp/a.txt").unwrap(), b"hi");
        // The pool registration ping fired during open.
        assert!(remote.pings() >= 1);
        assert_eq!(remote.shells_closed(), 1);
    }

    #[tokio::test]
    async fn pipeline_error_records_abort_the_upload() {
        let dir = tempfile::TempDir::new().unwrap();
        let local = local_file(&dir, "a.txt", b"hi");
        // Command index 1 is the first append.
        let remote = MemoryRemote::failing_at(1);

        let session = PipelineShell::new(remote.clone());
        let result = RemoteFile::new(&session, &LineDialect, &local, "C:/tmp/a.txt")
            .upload()
            .await;

        assert!(matches!(result, Err(UploadError::Command { .. })));
        assert_eq!(remote.shells_closed(), 1);
    }

    #[tokio::test]
    async fn progress_is_reported_per_chunk() {
        let dir = tempfile::TempDir::new().unwrap();
        let content = vec![9u8; 600];
        let local = local_file(&dir, "p.bin", &content);
        let remote = MemoryRemote::new();

        let session = CommandShell::new(remote.clone());
        let events = Mutex::new(Vec::new());
        let size = RemoteFile::new(&session, &LineDialect, &local, "C:/tmp/p.bin")
            .with_command_budget(150)
            .upload_with_progress(|e| events.lock().unwrap().push(e))
            .await
            .unwrap();

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), remote.appends().len());
        assert_eq!(events.last().unwrap().bytes_copied, size);
        assert!(events.windows(2).all(|w| w[0].bytes_copied < w[1].bytes_copied));
    }

    #[tokio::test]
    async fn concurrent_uploads_do_not_interfere() {
        let dir = tempfile::TempDir::new().unwrap();
        let local_a = local_file(&dir, "a.bin", &vec![1u8; 500]);
        let local_b = local_file(&dir, "b.bin", &vec![2u8; 500]);
        let remote = MemoryRemote::new();

        let (ra, rb) = tokio::join!(
            upload_once(&remote, &local_a, "C:/tmp/a.bin", Some(150)),
            upload_once(&remote, &local_b, "C:/tmp/b.bin", Some(150)),
        );
        ra.unwrap();
        rb.unwrap();

        assert_eq!(remote.file("C:/tmp/a.bin").unwrap(), vec![1u8; 500]);
        assert_eq!(remote.file("C:/tmp/b.bin").unwrap(), vec![2u8; 500]);
        assert_eq!(remote.shells_closed(), 2);
    }
}
