use crate::ProgramKind;
use crate::programs;
use colored::Colorize;
use std::path::Path;
use vmstack_cloud::{ActionType, CloudBackend, CloudError, Stack, StateManager};
use vmstack_cloud_azure::AzureBackend;

pub async fn handle(config_path: Option<&Path>, program: ProgramKind) -> anyhow::Result<()> {
    let config = super::load_config(config_path, program.default_config_name())?;

    let project = config.get_str("projectName")?.to_string();
    let stack_name = config.get_str("stackName")?.to_string();
    let location = config.get_str("location")?.to_string();

    println!(
        "Previewing stack {} (project {})",
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

    let manager = StateManager::new(std::env::current_dir()?);
    let mut stack =
        Stack::create_or_select(manager, &project, &stack_name, stack_program).await?;

    println!();
    println!("{}", "Refreshing stack state...".blue());
    let plan = stack
        .preview(&backend, &mut |line: &str| println!("{}", line))
        .await?;

    println!();
    println!("{}", "Plan:".bold());
    for action in &plan.actions {
        let line = format!("{} {}", action.kind, action.resource_name);
        match action.action_type {
            ActionType::Create => println!("  {} {}", "+".green(), line.green()),
            ActionType::Update => println!("  {} {}", "~".yellow(), line.yellow()),
            ActionType::Delete => println!("  {} {}", "-".red(), line.red()),
            ActionType::NoOp => println!("    {}", line.dimmed()),
        }
    }

    println!();
    println!("{}", plan.summary());
    Ok(())
}
