//! Installer guard: makes sure the AWS CLI is on `PATH` before anything else runs.
//!
//! When the binary is missing the user is asked whether to install it. On
//! approval the package is downloaded into the base directory, handed to the
//! native installer and removed again. Each side effect sits behind a trait so
//! the sequence can be driven with fakes.

mod system;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use indicatif::ProgressBar;

use crate::config::InstallerSettings;
use crate::error::ProvisionerResult;

pub use system::{
    is_affirmative, HttpDownloader, NativePackageInstaller, TerminalConfirmation, WhichLocator,
};

/// How [`InstallerGuard::ensure_installed`] finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The binary was already on `PATH`.
    AlreadyInstalled,
    /// The binary was missing and has been installed.
    Installed,
    /// The binary was missing and the user declined the install.
    Cancelled,
}

/// Checks whether a binary resolves on the executable search path.
pub trait BinaryLocator: Send + Sync {
    fn is_installed(&self, binary: &str) -> bool;
}

/// Tells the user a binary is missing and asks whether it should be installed.
#[async_trait]
pub trait Confirmation: Send + Sync {
    /// Shown whenever the binary is absent, auto-approved or not.
    fn report_missing(&self, binary: &str);

    async fn confirm_install(&self, binary: &str) -> ProvisionerResult<bool>;
}

/// Fetches the installer package to a local file.
#[async_trait]
pub trait ArtifactDownloader: Send + Sync {
    async fn download(&self, url: &str, destination: &Path) -> ProvisionerResult<()>;
}

/// Runs the platform package installer against a downloaded artifact.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    async fn install(&self, artifact: &Path) -> ProvisionerResult<()>;
}

pub struct InstallerGuard {
    settings: InstallerSettings,
    artifact_path: PathBuf,
    locator: Box<dyn BinaryLocator>,
    confirmation: Box<dyn Confirmation>,
    downloader: Box<dyn ArtifactDownloader>,
    installer: Box<dyn PackageInstaller>,
}

impl InstallerGuard {
    /// Guard wired to `PATH`, the terminal, HTTPS and `sudo installer`.
    pub fn system(settings: InstallerSettings, artifact_path: impl Into<PathBuf>) -> Self {
        Self::with_components(
            settings,
            artifact_path,
            Box::new(WhichLocator),
            Box::new(TerminalConfirmation),
            Box::new(HttpDownloader::new()),
            Box::new(NativePackageInstaller::new()),
        )
    }

    pub fn with_components(
        settings: InstallerSettings,
        artifact_path: impl Into<PathBuf>,
        locator: Box<dyn BinaryLocator>,
        confirmation: Box<dyn Confirmation>,
        downloader: Box<dyn ArtifactDownloader>,
        installer: Box<dyn PackageInstaller>,
    ) -> Self {
        Self {
            settings,
            artifact_path: artifact_path.into(),
            locator,
            confirmation,
            downloader,
            installer,
        }
    }

    /// Ensure the configured binary is installed.
    ///
    /// Returns without any prompt, download or subprocess when the binary is
    /// already present. A declined prompt yields [`InstallOutcome::Cancelled`]
    /// rather than an error.
    pub async fn ensure_installed(&self) -> ProvisionerResult<InstallOutcome> {
        let binary = &self.settings.binary;
        if self.locator.is_installed(binary) {
            log::debug!("`{binary}` found on PATH, skipping installation");
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        log::debug!("`{binary}` not found on PATH");
        self.confirmation.report_missing(binary);

        let approved = if self.settings.auto_approve {
            log::info!("Installing `{binary}` without confirmation (auto-approve)");
            true
        } else {
            self.confirmation.confirm_install(binary).await?
        };

        if !approved {
            log::debug!("Installation of `{binary}` declined");
            return Ok(InstallOutcome::Cancelled);
        }

        self.download().await?;

        log::debug!("Running installer on {}", self.artifact_path.display());
        self.installer.install(&self.artifact_path).await?;

        self.remove_artifact().await;
        log::info!("Installed `{binary}`");
        Ok(InstallOutcome::Installed)
    }

    // Spinner covers the download only; sudo may prompt on the terminal.
    async fn download(&self) -> ProvisionerResult<()> {
        log::debug!(
            "Downloading installer from {} to {}",
            self.settings.url,
            self.artifact_path.display()
        );

        let spinner = ProgressBar::new_spinner();
        spinner.set_message("downloading installer...");
        spinner.enable_steady_tick(Duration::from_millis(120));

        let result = self
            .downloader
            .download(&self.settings.url, &self.artifact_path)
            .await;
        spinner.finish_and_clear();
        result
    }

    async fn remove_artifact(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.artifact_path).await {
            log::warn!(
                "Failed to remove installer artifact {}: {e}",
                self.artifact_path.display()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisionerError;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    type Events = Arc<Mutex<Vec<&'static str>>>;

    struct FakeLocator {
        installed: bool,
        events: Events,
    }

    impl BinaryLocator for FakeLocator {
        fn is_installed(&self, _binary: &str) -> bool {
            self.events.lock().unwrap().push("lookup");
            self.installed
        }
    }

    struct FakeConfirmation {
        answer: bool,
        events: Events,
    }

    #[async_trait]
    impl Confirmation for FakeConfirmation {
        fn report_missing(&self, _binary: &str) {
            self.events.lock().unwrap().push("notice");
        }

        async fn confirm_install(&self, _binary: &str) -> ProvisionerResult<bool> {
            self.events.lock().unwrap().push("prompt");
            Ok(self.answer)
        }
    }

    struct FakeDownloader {
        events: Events,
    }

    #[async_trait]
    impl ArtifactDownloader for FakeDownloader {
        async fn download(&self, _url: &str, destination: &Path) -> ProvisionerResult<()> {
            self.events.lock().unwrap().push("download");
            tokio::fs::write(destination, b"pkg").await.unwrap();
            Ok(())
        }
    }

    struct FakeInstaller {
        succeed: bool,
        events: Events,
    }

    #[async_trait]
    impl PackageInstaller for FakeInstaller {
        async fn install(&self, artifact: &Path) -> ProvisionerResult<()> {
            self.events.lock().unwrap().push("install");
            assert!(artifact.exists(), "artifact must be downloaded before install");
            if self.succeed {
                Ok(())
            } else {
                Err(ProvisionerError::InstallerRunFailed("exit status: 1".into()))
            }
        }
    }

    fn guard(
        dir: &TempDir,
        installed: bool,
        answer: bool,
        install_succeeds: bool,
        settings: InstallerSettings,
    ) -> (InstallerGuard, Events) {
        let events: Events = Arc::default();
        let guard = InstallerGuard::with_components(
            settings,
            dir.path().join("installer.pkg"),
            Box::new(FakeLocator {
                installed,
                events: events.clone(),
            }),
            Box::new(FakeConfirmation {
                answer,
                events: events.clone(),
            }),
            Box::new(FakeDownloader {
                events: events.clone(),
            }),
            Box::new(FakeInstaller {
                succeed: install_succeeds,
                events: events.clone(),
            }),
        );
        (guard, events)
    }

    #[tokio::test]
    async fn test_present_binary_has_no_side_effects() {
        let dir = TempDir::new().unwrap();
        let (guard, events) = guard(&dir, true, true, true, InstallerSettings::default());

        let outcome = guard.ensure_installed().await.unwrap();

        assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        assert_eq!(*events.lock().unwrap(), vec!["lookup"]);
        assert!(!dir.path().join("installer.pkg").exists());
    }

    #[tokio::test]
    async fn test_declined_prompt_cancels_without_download() {
        let dir = TempDir::new().unwrap();
        let (guard, events) = guard(&dir, false, false, true, InstallerSettings::default());

        let outcome = guard.ensure_installed().await.unwrap();

        assert_eq!(outcome, InstallOutcome::Cancelled);
        assert_eq!(*events.lock().unwrap(), vec!["lookup", "notice", "prompt"]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_approved_install_runs_in_order_and_removes_artifact() {
        let dir = TempDir::new().unwrap();
        let (guard, events) = guard(&dir, false, true, true, InstallerSettings::default());

        let outcome = guard.ensure_installed().await.unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["lookup", "notice", "prompt", "download", "install"]
        );
        assert!(!dir.path().join("installer.pkg").exists());
    }

    #[tokio::test]
    async fn test_failed_install_propagates_and_keeps_artifact() {
        let dir = TempDir::new().unwrap();
        let (guard, _events) = guard(&dir, false, true, false, InstallerSettings::default());

        let result = guard.ensure_installed().await;

        assert!(matches!(result, Err(ProvisionerError::InstallerRunFailed(_))));
        assert!(dir.path().join("installer.pkg").exists());
    }

    #[tokio::test]
    async fn test_auto_approve_skips_prompt_but_reports_missing_binary() {
        let dir = TempDir::new().unwrap();
        let settings = InstallerSettings {
            auto_approve: true,
            ..InstallerSettings::default()
        };
        let (guard, events) = guard(&dir, false, false, true, settings);

        let outcome = guard.ensure_installed().await.unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        assert_eq!(
            *events.lock().unwrap(),
            vec!["lookup", "notice", "download", "install"]
        );
    }
}
