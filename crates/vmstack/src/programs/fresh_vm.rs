//! Fresh Linux VM from a marketplace image.
//!
//! Declares, on top of an existing resource group / vnet / NSG: a
//! generated SSH key, a dynamic public IP, a NIC wired into the vnet's
//! subnet, the NSG association, and the VM itself. Publishes the
//! allocated IP address.

use super::{program_from, subnet_id};
use anyhow::Result;
use serde_json::json;
use vmstack_cloud::StackProgram;
use vmstack_config::Configuration;
use vmstack_core::{ImageReference, IpAllocationMethod, ResourceGraph, ResourceKind, ResourceNode};

pub fn fresh_vm_program(config: &Configuration) -> Result<StackProgram> {
    Ok(program_from(build_graph(config)?))
}

fn build_graph(config: &Configuration) -> Result<ResourceGraph> {
    let image = ImageReference::parse(config.get_str("osImage")?)?;

    let resource_group_name = config.get_str("resourceGroupName")?;
    let resource_group_id = config.get_str("resourceGroupId")?;
    let vnet_name = config.get_str("vnetName")?;
    let security_group_name = config.get_str("securityGroupName")?;
    let network_interface_name = config.get_str("networkInterfaceName")?;
    let vm_name = config.get_str("vmName")?;
    let vm_size = config.get_str("vmSize")?;
    let admin_username = config.get_str("adminUsername")?;
    let storage_account_type = config.get_str("storageAccountType")?;
    let subnet_name = config.get_str_opt("subnetName")?.unwrap_or("default");

    let mut graph = ResourceGraph::new();

    // Existing infrastructure the VM plugs into
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

    // SSH key for the admin account
    graph.add(
        ResourceNode::managed("ssh-key", ResourceKind::SshKey)
            .with_prop("resource_group", json!(resource_group_name))
            .with_dependency(resource_group_name),
    )?;

    // Public IP for the VM
    graph.add(
        ResourceNode::managed("public-ip", ResourceKind::PublicIp)
            .with_prop("resource_group", json!(resource_group_name))
            .with_prop(
                "allocation_method",
                json!(IpAllocationMethod::Dynamic.as_str()),
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
            .with_prop(
                "ip_configuration_name",
                json!(format!("{}-ipconfiguration", vm_name)),
            )
            .with_ref("public_ip_id", "public-ip", "id")
            .with_dependency(vnet_name),
    )?;

    graph.add(
        ResourceNode::managed(
            format!("{}-{}-association", security_group_name, network_interface_name),
            ResourceKind::NsgAssociation,
        )
        .with_prop("resource_group", json!(resource_group_name))
        .with_ref("network_interface_name", network_interface_name, "name")
        .with_ref("network_security_group_id", security_group_name, "id"),
    )?;

    graph.add(
        ResourceNode::managed(vm_name, ResourceKind::VirtualMachine)
            .with_prop("resource_group", json!(resource_group_name))
            .with_prop("size", json!(vm_size))
            .with_prop("image", json!(image.to_string()))
            .with_prop("admin_username", json!(admin_username))
            .with_prop("storage_account_type", json!(storage_account_type))
            .with_ref("ssh_public_key", "ssh-key", "public_key")
            .with_ref("nic_id", network_interface_name, "id"),
    )?;

    // The address is allocated when the VM attaches, so it is the VM
    // that knows it
    graph.export("ip_address", vm_name, "public_ip_address")?;

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use vmstack_config::ConfigError;
    use vmstack_core::{Property, ResourceMode};

    fn sample_config() -> Configuration {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{
                "projectName": "vm-infra",
                "stackName": "dev",
                "resourceGroupName": "rg-01",
                "resourceGroupId": "/subscriptions/xxx/resourceGroups/rg-01",
                "vnetName": "vnet-01",
                "securityGroupName": "nsg-01",
                "networkInterfaceName": "nic-01",
                "vmName": "vm-01",
                "vmSize": "Standard_B2s",
                "location": "westeurope",
                "adminUsername": "azureuser",
                "storageAccountType": "Standard_LRS",
                "osImage": "Canonical:UbuntuServer:18.04-LTS:latest"
            }"#,
        )
        .unwrap();
        Configuration::load(&path).unwrap()
    }

    #[test]
    fn test_graph_shape() {
        let graph = build_graph(&sample_config()).unwrap();

        assert_eq!(graph.len(), 8);
        assert_eq!(graph.get("rg-01").unwrap().mode, ResourceMode::Adopted);
        assert_eq!(graph.get("vm-01").unwrap().mode, ResourceMode::Managed);
        assert!(graph.get("nsg-01-nic-01-association").is_some());

        // the graph is acyclic and the VM comes last
        let order: Vec<&str> = graph
            .topo_order()
            .unwrap()
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(*order.last().unwrap(), "vm-01");
    }

    #[test]
    fn test_image_reference_is_split() {
        let graph = build_graph(&sample_config()).unwrap();

        let vm = graph.get("vm-01").unwrap();
        match &vm.props["image"] {
            Property::Value(v) => {
                assert_eq!(v, &json!("Canonical:UbuntuServer:18.04-LTS:latest"));
            }
            other => panic!("expected literal image property, got {:?}", other),
        }

        // the reference round-trips through the parsed form
        let image = ImageReference::parse("Canonical:UbuntuServer:18.04-LTS:latest").unwrap();
        assert_eq!(
            (
                image.publisher.as_str(),
                image.offer.as_str(),
                image.sku.as_str(),
                image.version.as_str()
            ),
            ("Canonical", "UbuntuServer", "18.04-LTS", "latest")
        );
    }

    #[test]
    fn test_nic_references_public_ip() {
        let graph = build_graph(&sample_config()).unwrap();

        let nic = graph.get("nic-01").unwrap();
        assert!(matches!(&nic.props["public_ip_id"], Property::Ref(r) if r.node == "public-ip"));
        assert!(nic.dependencies().contains(&"public-ip"));
    }

    #[test]
    fn test_exports() {
        let graph = build_graph(&sample_config()).unwrap();

        assert_eq!(graph.exports.len(), 1);
        assert_eq!(graph.exports[0].name, "ip_address");
        assert!(!graph.exports[0].secret);
    }

    #[test]
    fn test_missing_key_fails_at_build() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"osImage": "a:b:c:d"}"#).unwrap();
        let config = Configuration::load(&path).unwrap();

        let err = build_graph(&config).unwrap_err();
        match err.downcast_ref::<ConfigError>() {
            Some(ConfigError::KeyMissing(key)) => assert_eq!(key, "resourceGroupName"),
            other => panic!("expected KeyMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_image_reference_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{"osImage": "UbuntuServer"}"#).unwrap();
        let config = Configuration::load(&path).unwrap();

        let err = build_graph(&config).unwrap_err();
        assert!(err.downcast_ref::<vmstack_core::CoreError>().is_some());
    }
}
