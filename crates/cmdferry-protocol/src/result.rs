use serde::{Deserialize, Serialize};

/// Normalized output of one remote command invocation.
///
/// Both session variants produce this shape: the one-shot shell maps the
/// transport's flat output onto it directly, the pooled shell assembles it
/// from decoded output records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// Returns `true` when the command is considered successful.
    ///
    /// A nonzero exit code *or* any text on the error stream counts as a
    /// hard failure; remote scripts signal problems through either channel.
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.stderr.is_empty()
    }

    /// Combined diagnostic text, used to build error messages.
    pub fn output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}
