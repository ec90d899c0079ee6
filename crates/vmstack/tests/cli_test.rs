use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

/// CLI help lists the lifecycle commands
#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Azure VM stacks"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("outputs"));
}

/// Version prints the crate version
#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vmstack"));
}

/// deploy help shows the program selector and secret flag
#[test]
fn test_deploy_help() {
    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.arg("deploy")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--program"))
        .stdout(predicate::str::contains("snapshot-restore"))
        .stdout(predicate::str::contains("--show-secrets"));
}

/// destroy help shows the record-removal flag
#[test]
fn test_destroy_help() {
    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.arg("destroy")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--remove"));
}

/// Unknown subcommands fail
#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

/// No config anywhere: exit code 2 (read-class failure)
#[test]
fn test_missing_config_exit_code() {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.current_dir(temp_dir.path())
        .env_remove("VMSTACK_CONFIG_PATH")
        .arg("deploy")
        .assert()
        .failure()
        .code(2);
}

/// Malformed JSON: exit code 3 (parse failure)
#[test]
fn test_malformed_config_exit_code() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("config.json");
    fs::write(&config, "{not json").unwrap();

    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("deploy")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .code(3);
}

/// Valid JSON but a key the program needs is absent: exit code 4
#[test]
fn test_missing_key_exit_code() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("config.json");
    fs::write(&config, r#"{"stackName": "dev"}"#).unwrap();

    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("deploy")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("projectName"));
}

/// A mapping failure (bad image reference) is also a value error: 4
#[test]
fn test_bad_image_reference_exit_code() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("config.json");
    fs::write(
        &config,
        r#"{
            "projectName": "vm-infra",
            "stackName": "dev",
            "location": "westeurope",
            "resourceGroupName": "rg-01",
            "resourceGroupId": "/subscriptions/xxx/resourceGroups/rg-01",
            "vnetName": "vnet-01",
            "securityGroupName": "nsg-01",
            "networkInterfaceName": "nic-01",
            "vmName": "vm-01",
            "vmSize": "Standard_B2s",
            "adminUsername": "azureuser",
            "storageAccountType": "Standard_LRS",
            "osImage": "UbuntuServer-latest"
        }"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("deploy")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("image reference"));
}

/// outputs on a never-deployed stack reads only local state and succeeds
#[test]
fn test_outputs_without_deploy() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("config.json");
    fs::write(
        &config,
        r#"{"projectName": "vm-infra", "stackName": "dev", "location": "westeurope"}"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("vmstack").unwrap();
    cmd.current_dir(temp_dir.path())
        .arg("outputs")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("no recorded outputs"));
}
