use crate::ProgramKind;
use crate::programs;
use colored::Colorize;
use std::path::Path;
use vmstack_cloud::{CloudBackend, CloudError, Stack, StateManager};
use vmstack_cloud_azure::AzureBackend;

pub async fn handle(
    config_path: Option<&Path>,
    program: ProgramKind,
    show_secrets: bool,
) -> anyhow::Result<()> {
    let config = super::load_config(config_path, program.default_config_name())?;
    println!("Config: {}", config.path().display().to_string().cyan());

    let project = config.get_str("projectName")?.to_string();
    let stack_name = config.get_str("stackName")?.to_string();
    let location = config.get_str("location")?.to_string();

    println!(
        "Stack: {} (project {})",
        stack_name.cyan().bold(),
        project.cyan()
    );

    // Build the program first: bad config fails before any cloud call
    let stack_program = match program {
        ProgramKind::Vm => programs::fresh_vm_program(&config)?,
        ProgramKind::SnapshotRestore => programs::snapshot_restore_program(&config)?,
    };

    let backend = AzureBackend::new(location);
    let auth = backend.check_auth().await?;
    if !auth.authenticated {
        return Err(CloudError::AuthenticationFailed(
            auth.error.unwrap_or_else(|| "unknown".to_string()),
        )
        .into());
    }
    if let Some(account) = auth.account_info {
        println!("Azure account: {}", account.cyan());
    }

    let manager = StateManager::new(std::env::current_dir()?);
    let mut stack =
        Stack::create_or_select(manager, &project, &stack_name, stack_program).await?;

    println!();
    println!("{}", "Refreshing stack state...".blue());
    stack
        .refresh(&backend, &mut |line: &str| println!("{}", line))
        .await?;

    println!();
    println!("{}", "Converging resources...".blue());
    let up = stack
        .up(&backend, &mut |line: &str| println!("{}", line))
        .await?;

    println!();
    println!(
        "{} {} created/updated, {} failed ({} ms)",
        "✓".green(),
        up.result.succeeded.len(),
        up.result.failed.len(),
        up.result.duration_ms
    );

    if !up.outputs.is_empty() {
        println!();
        println!("{}", "Outputs:".bold());
        let mut names: Vec<&String> = up.outputs.keys().collect();
        names.sort();
        for name in names {
            println!(
                "  {}: {}",
                name.cyan(),
                super::render_output(&up.outputs[name], show_secrets)
            );
        }
    }

    Ok(())
}
