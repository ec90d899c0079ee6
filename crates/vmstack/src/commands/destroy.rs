use colored::Colorize;
use std::path::Path;
use vmstack_cloud::{CloudBackend, CloudError, Stack, StateManager, empty_program};
use vmstack_cloud_azure::AzureBackend;

pub async fn handle(config_path: Option<&Path>, remove: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path, "config.json")?;

    let project = config.get_str("projectName")?.to_string();
    let stack_name = config.get_str("stackName")?.to_string();
    let location = config.get_str("location")?.to_string();

    println!(
        "{}",
        format!("Destroying stack {} (project {})...", stack_name, project)
            .yellow()
            .bold()
    );

    let backend = AzureBackend::new(location);
    let auth = backend.check_auth().await?;
    if !auth.authenticated {
        return Err(CloudError::AuthenticationFailed(
            auth.error.unwrap_or_else(|| "unknown".to_string()),
        )
        .into());
    }

    // Teardown needs no resource declarations
    let manager = StateManager::new(std::env::current_dir()?);
    let mut stack =
        Stack::create_or_select(manager, &project, &stack_name, empty_program()).await?;

    println!();
    println!("{}", "Refreshing stack state...".blue());
    stack
        .refresh(&backend, &mut |line: &str| println!("{}", line))
        .await?;

    println!();
    println!("{}", "Deleting resources...".yellow());
    let result = stack
        .destroy(&backend, &mut |line: &str| println!("{}", line))
        .await?;

    println!();
    println!(
        "{} {} deleted, {} failed ({} ms)",
        "✓".green(),
        result.succeeded.len(),
        result.failed.len(),
        result.duration_ms
    );

    // --remove also deletes the stack's bookkeeping record
    if remove {
        stack
            .remove(&mut |line: &str| println!("{}", line))
            .await?;
    }

    Ok(())
}
