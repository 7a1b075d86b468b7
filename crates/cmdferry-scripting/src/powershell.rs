//! PowerShell realization of the transfer's remote-side operations.
//!
//! Multi-line scripts are shipped through the single-line command
//! primitive as `powershell -EncodedCommand <base64(UTF-16LE(script))>`,
//! so no quoting or newline rules of the outer shell apply to the script
//! body. Chunk appends stay bare `echo` redirects; an encoded script per
//! chunk would burn most of the command budget.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::{CommandLine, ScriptDialect};

/// Builds PowerShell command lines for resolve, append and finalize.
#[derive(Debug, Clone, Default)]
pub struct PowerShellDialect;

impl PowerShellDialect {
    pub fn new() -> Self {
        Self
    }

    /// Wraps a script into a single `-EncodedCommand` invocation.
    fn wrap_script(&self, script: &str) -> CommandLine {
        CommandLine {
            command: "powershell".into(),
            args: vec!["-EncodedCommand".into(), encode_script(script)],
        }
    }
}

/// Encodes a script the way `powershell -EncodedCommand` expects:
/// UTF-16LE bytes, then standard base64.
pub fn encode_script(script: &str) -> String {
    let mut bytes = Vec::with_capacity(script.len() * 2);
    for unit in script.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Escapes a value for interpolation into a single-quoted PowerShell
/// string literal.
fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

impl ScriptDialect for PowerShellDialect {
    fn resolve_destination(&self, dest_path: &str, fingerprint: &str) -> CommandLine {
        let script = format!(
            r#"$destFile = $ExecutionContext.SessionState.Path.GetUnresolvedProviderPathFromPSPath('{dest}')

if (Test-Path $destFile) {{
  $sha = [System.Security.Cryptography.SHA256]::Create()

  $file = [System.IO.File]::Open($destFile,
    [System.IO.FileMode]::Open, [System.IO.FileAccess]::Read)
  $destHash = ([System.BitConverter]::ToString($sha.ComputeHash($file)))
  $destHash = $destHash.Replace('-', '').ToLower()
  $file.Close()

  if ($destHash -eq '{fingerprint}') {{
    return ''
  }}
}}

return [System.IO.Path]::GetTempFileName()"#,
            dest = quote(dest_path),
            fingerprint = quote(fingerprint),
        );
        self.wrap_script(&script)
    }

    fn append_chunk(&self, temp_path: &str, chunk: &str) -> CommandLine {
        CommandLine::bare(format!("echo {chunk} >> \"{temp_path}\""))
    }

    fn create_empty_target(&self, temp_path: &str) -> CommandLine {
        let script = format!(
            r#"$tempFile = $ExecutionContext.SessionState.Path.GetUnresolvedProviderPathFromPSPath('{temp}')
New-Item $tempFile -ItemType file -Force | Out-Null
Clear-Content $tempFile"#,
            temp = quote(temp_path),
        );
        self.wrap_script(&script)
    }

    fn finalize(&self, temp_path: &str, dest_path: &str) -> CommandLine {
        let script = format!(
            r#"$tempFile = $ExecutionContext.SessionState.Path.GetUnresolvedProviderPathFromPSPath('{temp}')
$destFile = $ExecutionContext.SessionState.Path.GetUnresolvedProviderPathFromPSPath('{dest}')

$destDir = ([System.IO.Path]::GetDirectoryName($destFile))
if (!(Test-Path $destDir)) {{
  New-Item -ItemType directory -Force -Path $destDir | Out-Null
}}

$base64Content = Get-Content $tempFile
if ($base64Content -eq $null) {{
  New-Item -ItemType file -Force $destFile | Out-Null
}} else {{
  $bytes = [System.Convert]::FromBase64String($base64Content)
  [System.IO.File]::WriteAllBytes($destFile, $bytes) | Out-Null
}}"#,
            temp = quote(temp_path),
            dest = quote(dest_path),
        );
        self.wrap_script(&script)
    }
}
