//! VM restored from a managed-disk snapshot.
//!
//! Declares a static public IP, a NIC with the NSG attached inline, a
//! managed disk copied from an existing snapshot, and a VM booting from
//! the attached disk. Publishes the IP address and the generated SSH
//! key material (the key pair is created alongside, for operators who
//! rotate credentials after a restore).

use super::{program_from, subnet_id};
use anyhow::Result;
use serde_json::json;
use vmstack_cloud::StackProgram;
use vmstack_config::Configuration;
use vmstack_core::{
    DiskCreateOption, IpAllocationMethod, OsType, ResourceGraph, ResourceKind, ResourceNode,
    SecurityType,
};

pub fn snapshot_restore_program(config: &Configuration) -> Result<StackProgram> {
    Ok(program_from(build_graph(config)?))
}

fn build_graph(config: &Configuration) -> Result<ResourceGraph> {
    let resource_group_name = config.get_str("resourceGroupName")?;
    let resource_group_id = config.get_str("resourceGroupId")?;
    let vnet_name = config.get_str("vnetName")?;
    let security_group_name = config.get_str("securityGroupName")?;
    let network_interface_name = config.get_str("networkInterfaceName")?;
    let vm_name = config.get_str("vmName")?;
    let vm_size = config.get_str("vmSize")?;
    let storage_account_type = config.get_str("storageAccountType")?;
    let ip_configuration_name = config.get_str("ipConfigurationName")?;
    let ip_address_resource_name = config.get_str("ipAddressResourceName")?;
    let snapshot_name = config.get_str("snapshotName")?;
    let managed_disk_name = config.get_str("managedDiskName")?;
    let subnet_name = config.get_str("subnetName")?;
    let security_type = SecurityType::parse(config.get_str("securityType")?)?;

    let mut graph = ResourceGraph::new();

    // Existing infrastructure
    graph.add(
        ResourceNode::adopted(resource_group_name, ResourceKind::ResourceGroup)
            .with_prop("resource_group", json!(resource_group_name))
            .with_prop("id", json!(resource_group_id)),
    )?;
    graph.add(
        ResourceNode::adopted(vnet_name, ResourceKind::VirtualNetwork)
            .with_prop("resource_group", json!(resource_group_name))
            .with_dependency(resource_group_name),
    )?;
    graph.add(
        ResourceNode::adopted(security_group_name, ResourceKind::NetworkSecurityGroup)
            .with_prop("resource_group", json!(resource_group_name))
            .with_dependency(resource_group_name),
    )?;
    graph.add(
        ResourceNode::adopted(snapshot_name, ResourceKind::Snapshot)
            .with_prop("resource_group", json!(resource_group_name))
            .with_dependency(resource_group_name),
    )?;

    graph.add(
        ResourceNode::managed("ssh-key", ResourceKind::SshKey)
            .with_prop("resource_group", json!(resource_group_name))
            .with_dependency(resource_group_name),
    )?;

    // A restored machine keeps its address across reboots
    graph.add(
        ResourceNode::managed(ip_address_resource_name, ResourceKind::PublicIp)
            .with_prop("resource_group", json!(resource_group_name))
            .with_prop(
                "allocation_method",
                json!(IpAllocationMethod::Static.as_str()),
            )
            .with_dependency(resource_group_name),
    )?;

    graph.add(
        ResourceNode::managed(network_interface_name, ResourceKind::NetworkInterface)
            .with_prop("resource_group", json!(resource_group_name))
            .with_prop(
                "subnet_id",
                json!(subnet_id(resource_group_id, vnet_name, subnet_name)),
            )
            .with_prop("ip_configuration_name", json!(ip_configuration_name))
            .with_ref("public_ip_id", ip_address_resource_name, "id")
            .with_ref("network_security_group_id", security_group_name, "id")
            .with_dependency(vnet_name),
    )?;

    graph.add(
        ResourceNode::managed(managed_disk_name, ResourceKind::ManagedDisk)
            .with_prop("resource_group", json!(resource_group_name))
            .with_prop("create_option", json!(DiskCreateOption::Copy.as_str()))
            .with_prop("storage_account_type", json!(storage_account_type))
            .with_ref("snapshot_id", snapshot_name, "id"),
    )?;

    let mut vm = ResourceNode::managed(vm_name, ResourceKind::VirtualMachine)
        .with_prop("resource_group", json!(resource_group_name))
        .with_prop("size", json!(vm_size))
        .with_prop("os_type", json!(OsType::Linux.as_str()))
        .with_ref("attach_os_disk", managed_disk_name, "id")
        .with_ref("nic_id", network_interface_name, "id");
    if let Some(profile) = security_type.profile() {
        vm = vm.with_prop("security_type", json!(profile));
    }
    graph.add(vm)?;

    graph.export("ip_address", ip_address_resource_name, "ip_address")?;
    graph.export_secret("public_key", "ssh-key", "public_key")?;
    graph.export_secret("private_key", "ssh-key", "private_key")?;

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use vmstack_core::{CoreError, Property};

    fn write_config(security_type: &str) -> Configuration {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config_snapshot.json");
        fs::write(
            &path,
            format!(
                r#"{{
                    "projectName": "vm-infra",
                    "stackName": "restore",
                    "resourceGroupName": "rg-01",
                    "resourceGroupId": "/subscriptions/xxx/resourceGroups/rg-01",
                    "vnetName": "vnet-01",
                    "vnetId": "/subscriptions/xxx/virtualNetworks/vnet-01",
                    "securityGroupName": "nsg-01",
                    "networkSecurityGroupId": "/subscriptions/xxx/networkSecurityGroups/nsg-01",
                    "networkInterfaceName": "nic-01",
                    "vmName": "vm-01",
                    "vmSize": "Standard_B2s",
                    "location": "westeurope",
                    "adminUsername": "azureuser",
                    "storageAccountType": "Standard_LRS",
                    "ipConfigurationName": "ipconfig1",
                    "ipAddressResourceName": "vm-01-ip",
                    "snapshotName": "vm-01-snapshot",
                    "managedDiskName": "vm-01-restored",
                    "subnetName": "default",
                    "securityType": "{}"
                }}"#,
                security_type
            ),
        )
        .unwrap();
        Configuration::load(&path).unwrap()
    }

    #[test]
    fn test_graph_shape() {
        let graph = build_graph(&write_config("Trusted launch")).unwrap();

        assert_eq!(graph.len(), 9);

        // the disk is copied from the snapshot, the VM boots from the disk
        let disk = graph.get("vm-01-restored").unwrap();
        assert!(
            matches!(&disk.props["snapshot_id"], Property::Ref(r) if r.node == "vm-01-snapshot")
        );
        let vm = graph.get("vm-01").unwrap();
        assert!(
            matches!(&vm.props["attach_os_disk"], Property::Ref(r) if r.node == "vm-01-restored")
        );
    }

    #[test]
    fn test_teardown_order_respects_dependencies() {
        let graph = build_graph(&write_config("Standard")).unwrap();

        let order: Vec<&str> = graph
            .reverse_topo_order()
            .unwrap()
            .iter()
            .map(|n| n.name.as_str())
            .collect();

        let pos = |name: &str| order.iter().position(|n| *n == name).unwrap();
        assert!(pos("vm-01") < pos("nic-01"));
        assert!(pos("nic-01") < pos("vm-01-ip"));
        assert!(pos("vm-01") < pos("vm-01-restored"));
    }

    #[test]
    fn test_trusted_launch_sets_security_profile() {
        let graph = build_graph(&write_config("Trusted launch")).unwrap();
        let vm = graph.get("vm-01").unwrap();

        assert!(
            matches!(&vm.props["security_type"], Property::Value(v) if v == &json!("TrustedLaunch"))
        );
    }

    #[test]
    fn test_standard_sets_no_security_profile() {
        let graph = build_graph(&write_config("Standard")).unwrap();
        let vm = graph.get("vm-01").unwrap();

        assert!(!vm.props.contains_key("security_type"));
    }

    #[test]
    fn test_unknown_security_type_fails() {
        let err = build_graph(&write_config("Confidential")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CoreError>(),
            Some(CoreError::UnknownSecurityType(_))
        ));
    }

    #[test]
    fn test_exports_mark_key_material_secret() {
        let graph = build_graph(&write_config("Standard")).unwrap();

        let by_name: std::collections::HashMap<&str, bool> = graph
            .exports
            .iter()
            .map(|e| (e.name.as_str(), e.secret))
            .collect();

        assert_eq!(by_name["ip_address"], false);
        assert_eq!(by_name["public_key"], true);
        assert_eq!(by_name["private_key"], true);
    }
}
