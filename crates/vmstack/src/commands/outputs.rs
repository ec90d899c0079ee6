use colored::Colorize;
use std::path::Path;
use vmstack_cloud::{Stack, StateManager, empty_program};

/// Print the outputs recorded by the last convergence. Reads only the
/// local stack record, no cloud round-trips.
pub async fn handle(config_path: Option<&Path>, show_secrets: bool) -> anyhow::Result<()> {
    let config = super::load_config(config_path, "config.json")?;

    let project = config.get_str("projectName")?.to_string();
    let stack_name = config.get_str("stackName")?.to_string();

    let manager = StateManager::new(std::env::current_dir()?);
    let stack = Stack::create_or_select(manager, &project, &stack_name, empty_program()).await?;

    let outputs = stack.outputs();
    if outputs.is_empty() {
        println!(
            "stack {} has no recorded outputs (not deployed yet?)",
            stack_name.cyan()
        );
        return Ok(());
    }

    let mut names: Vec<&String> = outputs.keys().collect();
    names.sort();
    for name in names {
        println!(
            "{}: {}",
            name.cyan(),
            super::render_output(&outputs[name], show_secrets)
        );
    }

    Ok(())
}
