//! Real implementations of the installer guard's side effects.

use std::io::Write as _;
use std::path::Path;

use async_trait::async_trait;
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use super::{ArtifactDownloader, BinaryLocator, Confirmation, PackageInstaller};
use crate::error::{ProvisionerError, ProvisionerResult};

/// Resolves binaries with `which`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhichLocator;

impl BinaryLocator for WhichLocator {
    fn is_installed(&self, binary: &str) -> bool {
        match which::which(binary) {
            Ok(path) => {
                log::debug!("Found {binary} at: {path:?}");
                true
            }
            Err(_) => false,
        }
    }
}

/// Only a single `y`, in either case, approves.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// Yes/no prompt on stderr, answer read from stdin.
///
/// Stdout stays reserved for the program's output (a dry-run document or the
/// created policy ARN).
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmation;

#[async_trait]
impl Confirmation for TerminalConfirmation {
    fn report_missing(&self, binary: &str) {
        eprintln!("{}", format!("\n \t `{binary}` is not installed").red());
    }

    async fn confirm_install(&self, _binary: &str) -> ProvisionerResult<bool> {
        eprint!("{}", "\t Would you like to install ? (y/n)  ".bright_black());
        std::io::stderr()
            .flush()
            .map_err(|e| ProvisionerError::io("write prompt", e))?;

        let mut answer = String::new();
        let read = BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await
            .map_err(|e| ProvisionerError::io("read answer from stdin", e))?;

        // EOF counts as "no".
        Ok(read > 0 && is_affirmative(&answer))
    }
}

/// Streams the installer over HTTPS into a file.
#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactDownloader for HttpDownloader {
    async fn download(&self, url: &str, destination: &Path) -> ProvisionerResult<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ProvisionerError::download(url, e))?;

        let write_failed = |action: &str, e: std::io::Error| {
            ProvisionerError::download(url, format!("{action} {}: {e}", destination.display()))
        };

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| write_failed("create", e))?;

        let mut written = 0usize;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProvisionerError::download(url, e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| write_failed("write", e))?;
            written += chunk.len();
        }
        file.flush().await.map_err(|e| write_failed("flush", e))?;

        log::debug!("Downloaded {written} bytes to {}", destination.display());
        Ok(())
    }
}

/// Runs `sudo installer -pkg <artifact> -target /`.
#[derive(Debug, Clone)]
pub struct NativePackageInstaller {
    program: String,
}

impl NativePackageInstaller {
    pub fn new() -> Self {
        Self::with_program("sudo")
    }

    /// Use a different launcher in place of `sudo`.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for NativePackageInstaller {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageInstaller for NativePackageInstaller {
    async fn install(&self, artifact: &Path) -> ProvisionerResult<()> {
        let status = Command::new(&self.program)
            .arg("installer")
            .arg("-pkg")
            .arg(artifact)
            .arg("-target")
            .arg("/")
            .status()
            .await
            .map_err(|e| {
                ProvisionerError::InstallerRunFailed(format!(
                    "failed to spawn `{} installer`: {e}",
                    self.program
                ))
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ProvisionerError::InstallerRunFailed(format!(
                "installer exited with {status}"
            )))
        }
    }
}
