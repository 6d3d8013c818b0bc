use clap::{Args, Parser, Subcommand};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(
    name = "patchy",
    version,
    long_version = LONG_VERSION,
    about = "Patchy - GCP OS Patch Management Exploitation",
    long_about = "Patchy is a GCP exploitation tool designed for red teaming engagements.\n\n\
                  It abuses OS Config patch jobs and patch deployments to run payloads \
                  hosted in a Cloud Storage bucket on every VM in a project."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Performs automatic lateral movement within a GCP environment
    ///
    /// NOTE: You must be in a GCP env with the metadata API available.
    #[command(visible_alias = "lat")]
    Lateral(LateralArgs),
    /// Enables persistence on compute instances owned by a service account
    ///
    /// NOTE: The service account must have editor privileges or
    /// osconfig.patchDeployments.create permissions.
    #[command(visible_alias = "per")]
    Persist(PersistArgs),
}

/// Options shared by every subcommand. Values given here override the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct EngineArgs {
    /// Bucket name hosting payload
    #[arg(short, long, global = true)]
    pub bucket: Option<String>,

    /// Name of linux shell payload [default: payload.bash]
    #[arg(short = 'l', long = "lpayload", global = true)]
    pub linux_payload: Option<String>,

    /// Name of windows powershell payload [default: payload.ps1]
    #[arg(short = 'w', long = "wpayload", global = true)]
    pub windows_payload: Option<String>,

    /// Enable persistence (patch deployment)
    #[arg(short, long, global = true)]
    pub persist: bool,

    /// Name of patch deployment/job [default: security-update]
    #[arg(short = 'n', long = "pname", global = true)]
    pub patch_name: Option<String>,

    /// Patch deployment/job description [default: GCP Updater Client]
    #[arg(short = 'd', long = "pdesc", global = true)]
    pub patch_description: Option<String>,

    /// Target project id (skips the metadata server lookup)
    #[arg(long, global = true)]
    pub project: Option<String>,

    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Write a JSON run report to this path
    #[arg(long, global = true)]
    pub report: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct LateralArgs {
    /// Exploit if misconfiguration is found
    #[arg(short, long)]
    pub exploit: bool,

    /// Audit every service account instead of stopping at the first exploitable one
    #[arg(long, conflicts_with = "exploit")]
    pub exhaustive: bool,
}

#[derive(Args, Clone, Debug)]
pub struct PersistArgs {
    /// Path to JSON credential file
    #[arg(short, long)]
    pub creds: String,
}
