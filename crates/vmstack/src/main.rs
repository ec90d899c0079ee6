mod commands;
mod programs;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;
use vmstack_cloud::CloudError;
use vmstack_cloud_azure::AzureError;
use vmstack_config::ConfigError;
use vmstack_core::CoreError;

#[derive(Parser)]
#[command(name = "vmstack")]
#[command(about = "Azure VM stacks from JSON config", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a stack: create or select it, refresh, converge
    Deploy {
        /// Config file (default: discover config.json / config_snapshot.json)
        #[arg(short, long, env = "VMSTACK_CONFIG_PATH")]
        config: Option<PathBuf>,
        /// Which resource program to deploy
        #[arg(short, long, value_enum, default_value_t)]
        program: ProgramKind,
        /// Print secret outputs instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },
    /// Show what deploy would change, without applying
    Preview {
        /// Config file (default: discover config.json / config_snapshot.json)
        #[arg(short, long, env = "VMSTACK_CONFIG_PATH")]
        config: Option<PathBuf>,
        /// Which resource program to preview
        #[arg(short, long, value_enum, default_value_t)]
        program: ProgramKind,
    },
    /// Tear down every resource the stack owns
    Destroy {
        /// Config file (default: discover config.json)
        #[arg(short, long, env = "VMSTACK_CONFIG_PATH")]
        config: Option<PathBuf>,
        /// Also delete the stack's bookkeeping record
        #[arg(short, long)]
        remove: bool,
    },
    /// Print the outputs of the last deploy
    Outputs {
        /// Config file (default: discover config.json)
        #[arg(short, long, env = "VMSTACK_CONFIG_PATH")]
        config: Option<PathBuf>,
        /// Print secret outputs instead of masking them
        #[arg(long)]
        show_secrets: bool,
    },
    /// Show version information
    Version,
}

/// The two resource-declaration programs this tool ships
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProgramKind {
    /// Fresh Linux VM from a marketplace image
    #[default]
    Vm,
    /// VM restored from a managed-disk snapshot
    SnapshotRestore,
}

impl ProgramKind {
    /// Config file name each program conventionally lives in
    pub fn default_config_name(&self) -> &'static str {
        match self {
            ProgramKind::Vm => "config.json",
            ProgramKind::SnapshotRestore => "config_snapshot.json",
        }
    }
}

impl std::fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgramKind::Vm => write!(f, "vm"),
            ProgramKind::SnapshotRestore => write!(f, "snapshot-restore"),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    // Version needs no configuration
    if matches!(cli.command, Commands::Version) {
        println!("vmstack {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Deploy {
            config,
            program,
            show_secrets,
        } => commands::deploy::handle(config.as_deref(), program, show_secrets).await,
        Commands::Preview { config, program } => {
            commands::preview::handle(config.as_deref(), program).await
        }
        Commands::Destroy { config, remove } => {
            commands::destroy::handle(config.as_deref(), remove).await
        }
        Commands::Outputs {
            config,
            show_secrets,
        } => commands::outputs::handle(config.as_deref(), show_secrets).await,
        Commands::Version => unreachable!("Version is handled before dispatch"),
    }
}

/// One distinct exit code per error family, so scripts can tell a bad
/// config file from a failed provisioning call.
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<ConfigError>() {
        return match e {
            ConfigError::Read { .. } | ConfigError::ConfigFileNotFound => 2,
            ConfigError::Parse { .. } | ConfigError::NotAnObject { .. } => 3,
            ConfigError::KeyMissing(_) | ConfigError::InvalidValue { .. } => 4,
        };
    }
    if err.downcast_ref::<CoreError>().is_some() {
        // bad config values: image references, security types, graph shape
        return 4;
    }
    if err.downcast_ref::<CloudError>().is_some() || err.downcast_ref::<AzureError>().is_some() {
        return 5;
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_per_error_family() {
        let read: anyhow::Error = ConfigError::ConfigFileNotFound.into();
        assert_eq!(exit_code(&read), 2);

        let missing: anyhow::Error = ConfigError::KeyMissing("vmName".to_string()).into();
        assert_eq!(exit_code(&missing), 4);

        let mapping: anyhow::Error =
            CoreError::UnknownSecurityType("Confidential".to_string()).into();
        assert_eq!(exit_code(&mapping), 4);

        let backend: anyhow::Error = CloudError::ApiError("quota exceeded".to_string()).into();
        assert_eq!(exit_code(&backend), 5);

        let other: anyhow::Error = anyhow::anyhow!("unexpected");
        assert_eq!(exit_code(&other), 1);
    }
}
