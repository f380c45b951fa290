//! Remote access to the guest over SSH.

use crate::error::{DriverError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Options passed to every ssh invocation.
///
/// Guests are recreated freely, so host keys are never pinned.
const SSH_OPTIONS: &[&str] = &[
    "IdentitiesOnly=yes",
    "StrictHostKeyChecking=no",
    "UserKnownHostsFile=/dev/null",
    "LogLevel=quiet",
];

/// A fully-resolved SSH invocation against the guest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshCommand {
    /// Guest address
    pub host: String,
    /// Guest SSH port
    pub port: u16,
    /// Guest user
    pub user: String,
    /// Private key used for authentication
    pub key_path: PathBuf,
    /// Remote command and its arguments
    pub args: Vec<String>,
}

impl SshCommand {
    /// Arguments passed to the `ssh` binary.
    pub fn ssh_args(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(SSH_OPTIONS.len() * 2 + 5 + self.args.len());
        for option in SSH_OPTIONS {
            out.push("-o".to_string());
            out.push((*option).to_string());
        }
        out.push("-p".to_string());
        out.push(self.port.to_string());
        out.push("-i".to_string());
        out.push(self.key_path.to_string_lossy().into_owned());
        out.push(format!("{}@{}", self.user, self.host));
        out.extend(self.args.iter().cloned());
        out
    }

    /// Build an executable `ssh` process for this invocation.
    ///
    /// With no remote arguments this yields an interactive session.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(self.ssh_args());
        cmd
    }
}

/// Key pair generation and command execution against the guest.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Generate a private/public key pair at `path` and `path.pub`.
    async fn generate_key_pair(&self, path: &Path) -> Result<()>;

    /// Run a command in the guest, failing on a non-zero exit status.
    async fn run(&self, command: &SshCommand) -> Result<()>;
}

/// [`RemoteShell`] backed by the system OpenSSH client.
#[derive(Debug, Clone, Default)]
pub struct OpenSsh;

#[async_trait]
impl RemoteShell for OpenSsh {
    async fn generate_key_pair(&self, path: &Path) -> Result<()> {
        tracing::debug!(path = %path.display(), "Generating SSH key pair");

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DriverError::KeyGeneration(format!("{}: {e}", parent.display())))?;
        }
        // ssh-keygen refuses to overwrite without a prompt.
        for existing in [path.to_path_buf(), public_key_path(path)] {
            match tokio::fs::remove_file(&existing).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(DriverError::KeyGeneration(format!(
                        "{}: {e}",
                        existing.display()
                    )))
                }
            }
        }

        let output = Command::new("ssh-keygen")
            .args(["-t", "rsa", "-b", "2048", "-N", "", "-q", "-f"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DriverError::KeyGeneration(format!("failed to run ssh-keygen: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DriverError::KeyGeneration(format!(
                "ssh-keygen exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }

    async fn run(&self, command: &SshCommand) -> Result<()> {
        tracing::debug!(host = %command.host, args = ?command.args, "Running remote command");

        let output = command
            .to_command()
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DriverError::RemoteCommand(format!("failed to run ssh: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!(host = %command.host, status = %output.status, "Remote command failed");
            return Err(DriverError::RemoteCommand(format!(
                "`{}` exited with {}: {}",
                command.args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Path of the public half of a key pair.
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = private_key.as_os_str().to_owned();
    path.push(".pub");
    PathBuf::from(path)
}

/// Quote a string for a POSIX shell.
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
