use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use iam_policy_provisioner_core::config::{
    ENV_ACCESS_KEY_ID, ENV_ACCOUNT_ID, ENV_REGION, ENV_SECRET_ACCESS_KEY,
};
use iam_policy_provisioner_core::{
    InstallerSettings, PolicyRequest, Provisioner, ProvisionerConfig, ProvisionerError, RunOutcome,
};

/// Workspace root, where the bundled `policies/` directory lives.
const DEFAULT_BASE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/..");

/// Make sure the AWS CLI is installed, then create an IAM managed policy from
/// a JSON template with `${Region}` and `${AccountId}` placeholders.
///
/// Placeholders are filled from AWS_REGION and AWS_ACCOUNT_ID; the policy is
/// created with the credentials in AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY.
#[derive(Parser, Debug)]
#[command(name = "iam-policy-provisioner", version, about, long_about)]
struct Cli {
    /// Name of the policy to create
    #[arg(long, default_value = "test")]
    name: String,

    /// Policy description; pass an empty string to omit it
    #[arg(long, default_value = "test")]
    description: String,

    /// Policy template, relative to the base directory
    #[arg(long, default_value = "policies/deployment.policy.json")]
    template: PathBuf,

    /// Base directory for the template and the downloaded installer
    #[arg(long, env = "POLICY_PROVISIONER_BASE_DIR", default_value = DEFAULT_BASE_DIR)]
    base_dir: PathBuf,

    /// Install the AWS CLI without asking when it is missing
    #[arg(short = 'y', long)]
    yes: bool,

    /// Do not check whether the AWS CLI is installed
    #[arg(long)]
    skip_install_check: bool,

    /// Print the resolved policy document instead of creating the policy
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<ProvisionerConfig> {
        let request = PolicyRequest::new(self.name, Some(self.description), self.template)?;

        let mut config = ProvisionerConfig::new(request, self.base_dir);
        config.installer = InstallerSettings {
            auto_approve: self.yes,
            ..InstallerSettings::default()
        };
        config.skip_install_check = self.skip_install_check;
        config.dry_run = self.dry_run;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.into_config()?;
    log::debug!("Configuration: {config:?}");

    let provisioner = Provisioner::new(config);
    match provisioner.run().await? {
        RunOutcome::Cancelled => {
            eprintln!("{}", "Canceled".yellow());
        }
        RunOutcome::Resolved(document) => {
            println!("{document}");
        }
        RunOutcome::Created(policy) => {
            eprintln!(
                "{}",
                format!("Created policy '{}'", provisioner.config().request.name()).green()
            );
            if let Some(arn) = policy.arn {
                println!("{arn}");
            }
        }
    }
    Ok(())
}

fn report(error: &anyhow::Error) {
    eprintln!("{}", format!("{error:#}").red());

    if let Some(provisioner_error) = error.downcast_ref::<ProvisionerError>() {
        if let ProvisionerError::PolicySubmissionFailed {
            code: Some(code), ..
        } = provisioner_error
        {
            log::debug!("IAM error code: {code}");
        }
        if provisioner_error.is_missing_environment() {
            let names = match provisioner_error {
                ProvisionerError::MissingParameters => [ENV_REGION, ENV_ACCOUNT_ID],
                _ => [ENV_ACCESS_KEY_ID, ENV_SECRET_ACCESS_KEY],
            };
            eprintln!(
                "{}",
                format!("Set {} and {} and try again.", names[0], names[1]).bright_black()
            );
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}
