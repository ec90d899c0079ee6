//! Azure backend implementation
//!
//! Maps resolved resource declarations onto az CLI calls, one resource
//! kind at a time.

use crate::azcli::{AzCli, CreateNicConfig, CreateVmConfig, VmSource};
use crate::error::{AzureError, Result};
use async_trait::async_trait;
use serde_json::json;
use vmstack_cloud::{
    AuthStatus, CloudBackend, CloudError, LiveResource, ResolvedProps, ResourceRecord,
};
use vmstack_core::ResourceKind;

/// Azure backend driving the az CLI
pub struct AzureBackend {
    az: AzCli,
}

impl AzureBackend {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            az: AzCli::new(location),
        }
    }

    async fn read_inner(
        &self,
        kind: ResourceKind,
        name: &str,
        record: &ResourceRecord,
    ) -> Result<Option<LiveResource>> {
        let rg = required_record_prop(record, "resource_group")?;

        let live = match kind {
            ResourceKind::ResourceGroup => self
                .az
                .show_resource_group(name)
                .await?
                .map(|group| {
                    LiveResource::new(group.id).with_attribute("location", json!(group.location))
                }),
            ResourceKind::VirtualNetwork => self.az.show_vnet(rg, name).await?.map(|vnet| {
                let subnets: Vec<&str> = vnet.subnets.iter().map(|s| s.name.as_str()).collect();
                LiveResource::new(vnet.id).with_attribute("subnets", json!(subnets))
            }),
            ResourceKind::NetworkSecurityGroup => self
                .az
                .show_nsg(rg, name)
                .await?
                .map(|nsg| LiveResource::new(nsg.id)),
            ResourceKind::Snapshot => self
                .az
                .show_snapshot(rg, name)
                .await?
                .map(|snapshot| LiveResource::new(snapshot.id)),
            ResourceKind::SshKey => self.az.show_ssh_key(rg, name).await?.map(|key| {
                let mut live = LiveResource::new(key.id)
                    .with_attribute("public_key", json!(key.public_key));
                // az hands out the private key exactly once, at
                // generation time; carry the recorded copy forward so a
                // refresh does not erase it.
                if let Some(private_key) = record.get_attribute::<String>("private_key") {
                    live = live.with_attribute("private_key", json!(private_key));
                }
                live
            }),
            ResourceKind::PublicIp => self.az.show_public_ip(rg, name).await?.map(|ip| {
                LiveResource::new(ip.id)
                    .with_attribute("ip_address", json!(ip.ip_address))
                    .with_attribute("allocation_method", json!(ip.allocation_method))
            }),
            ResourceKind::NetworkInterface => {
                self.az.show_nic(rg, name).await?.map(live_from_nic)
            }
            ResourceKind::NsgAssociation => {
                let nic_name = required_record_prop(record, "network_interface_name")?;
                let nsg_id = required_record_prop(record, "network_security_group_id")?;
                match self.az.show_nic(rg, nic_name).await? {
                    Some(nic) if nic.has_nsg(nsg_id) => {
                        Some(live_from_association(&nic.id, nsg_id))
                    }
                    // NIC gone or NSG detached: the association is gone
                    _ => None,
                }
            }
            ResourceKind::ManagedDisk => self.az.show_disk(rg, name).await?.map(|disk| {
                LiveResource::new(disk.id).with_attribute("disk_state", json!(disk.disk_state))
            }),
            ResourceKind::VirtualMachine => self
                .az
                .show_vm(rg, name)
                .await?
                .map(|vm| LiveResource::new(vm.id)),
        };

        Ok(live)
    }

    async fn lookup_inner(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
    ) -> Result<Option<LiveResource>> {
        match kind {
            ResourceKind::ResourceGroup => Ok(self.az.show_resource_group(name).await?.map(
                |group| {
                    LiveResource::new(group.id).with_attribute("location", json!(group.location))
                },
            )),
            ResourceKind::VirtualNetwork => {
                let rg = required(props, "resource_group")?;
                Ok(self.az.show_vnet(rg, name).await?.map(|vnet| {
                    let subnets: Vec<&str> = vnet.subnets.iter().map(|s| s.name.as_str()).collect();
                    LiveResource::new(vnet.id).with_attribute("subnets", json!(subnets))
                }))
            }
            ResourceKind::NetworkSecurityGroup => {
                let rg = required(props, "resource_group")?;
                Ok(self
                    .az
                    .show_nsg(rg, name)
                    .await?
                    .map(|nsg| LiveResource::new(nsg.id)))
            }
            ResourceKind::Snapshot => {
                let rg = required(props, "resource_group")?;
                Ok(self
                    .az
                    .show_snapshot(rg, name)
                    .await?
                    .map(|snapshot| LiveResource::new(snapshot.id)))
            }
            other => Err(AzureError::UnsupportedKind(format!(
                "{} cannot be adopted",
                other
            ))),
        }
    }

    async fn create_inner(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
    ) -> Result<LiveResource> {
        let rg = required(props, "resource_group")?;

        match kind {
            ResourceKind::SshKey => {
                let key = self.az.create_ssh_key(rg, name).await?;
                Ok(LiveResource::new(key.id)
                    .with_attribute("public_key", json!(key.public_key))
                    .with_attribute("private_key", json!(key.private_key)))
            }
            ResourceKind::PublicIp => {
                let allocation = optional(props, "allocation_method").unwrap_or("Dynamic");
                let ip = self.az.create_public_ip(rg, name, allocation).await?;
                Ok(LiveResource::new(ip.id)
                    .with_attribute("ip_address", json!(ip.ip_address))
                    .with_attribute("allocation_method", json!(ip.allocation_method)))
            }
            ResourceKind::NetworkInterface => {
                let config = CreateNicConfig {
                    resource_group: rg.to_string(),
                    name: name.to_string(),
                    subnet_id: required(props, "subnet_id")?.to_string(),
                    ip_configuration_name: optional(props, "ip_configuration_name")
                        .map(String::from),
                    public_ip_id: optional(props, "public_ip_id").map(String::from),
                    network_security_group_id: optional(props, "network_security_group_id")
                        .map(String::from),
                };
                let nic = self.az.create_nic(&config).await?;
                Ok(live_from_nic(nic))
            }
            ResourceKind::NsgAssociation => {
                let nic_name = required(props, "network_interface_name")?;
                let nsg_id = required(props, "network_security_group_id")?;
                let nic = self.az.attach_nic_nsg(rg, nic_name, nsg_id).await?;
                Ok(live_from_association(&nic.id, nsg_id))
            }
            ResourceKind::ManagedDisk => {
                // snapshot copies are the only disk flavor this backend builds
                if let Some(option) = optional(props, "create_option") {
                    if option != "Copy" {
                        return Err(AzureError::UnsupportedKind(format!(
                            "managed disk create option '{}'",
                            option
                        )));
                    }
                }
                let snapshot_id = required(props, "snapshot_id")?;
                let sku = optional(props, "storage_account_type");
                let disk = self
                    .az
                    .create_disk_from_snapshot(rg, name, snapshot_id, sku)
                    .await?;
                Ok(LiveResource::new(disk.id)
                    .with_attribute("disk_state", json!(disk.disk_state)))
            }
            ResourceKind::VirtualMachine => {
                let source = if let Some(image) = optional(props, "image") {
                    VmSource::Image {
                        image: image.to_string(),
                        admin_username: required(props, "admin_username")?.to_string(),
                        ssh_public_key: required(props, "ssh_public_key")?.to_string(),
                        storage_account_type: optional(props, "storage_account_type")
                            .map(String::from),
                    }
                } else {
                    VmSource::AttachOsDisk {
                        disk_id: required(props, "attach_os_disk")?.to_string(),
                        os_type: optional(props, "os_type").unwrap_or("Linux").to_string(),
                    }
                };

                let config = CreateVmConfig {
                    resource_group: rg.to_string(),
                    name: name.to_string(),
                    size: optional(props, "size").map(String::from),
                    nic_id: required(props, "nic_id")?.to_string(),
                    source,
                    security_type: optional(props, "security_type").map(String::from),
                };

                let vm = self.az.create_vm(&config).await?;
                Ok(LiveResource::new(vm.id)
                    .with_attribute("public_ip_address", json!(vm.public_ip_address))
                    .with_attribute("private_ip_address", json!(vm.private_ip_address)))
            }
            other => Err(AzureError::UnsupportedKind(format!(
                "{} is adopted, not created",
                other
            ))),
        }
    }

    async fn update_inner(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
        record: &ResourceRecord,
    ) -> Result<LiveResource> {
        match kind {
            // az `create` converges these in place
            ResourceKind::PublicIp
            | ResourceKind::NetworkInterface
            | ResourceKind::NsgAssociation => self.create_inner(kind, name, props).await,

            // key material is immutable once generated
            ResourceKind::SshKey => Ok(LiveResource {
                id: record.id.clone(),
                attributes: record.attributes.clone(),
            }),

            // replacing a disk or VM in place would destroy data; keep
            // the existing resource and surface the divergence
            ResourceKind::ManagedDisk | ResourceKind::VirtualMachine => {
                tracing::warn!(
                    "{} {} diverged from its declaration; in-place update is not supported, \
                     destroy and redeploy to replace it",
                    kind,
                    name
                );
                Ok(LiveResource {
                    id: record.id.clone(),
                    attributes: record.attributes.clone(),
                })
            }

            other => Err(AzureError::UnsupportedKind(format!(
                "{} is adopted, not updated",
                other
            ))),
        }
    }

    async fn delete_inner(&self, kind: ResourceKind, record: &ResourceRecord) -> Result<()> {
        let rg = required_record_prop(record, "resource_group")?;

        match kind {
            ResourceKind::VirtualMachine => self.az.delete_vm(rg, &record.name).await,
            ResourceKind::ManagedDisk => self.az.delete_disk(rg, &record.name).await,
            ResourceKind::NsgAssociation => {
                let nic_name = required_record_prop(record, "network_interface_name")?;
                self.az.detach_nic_nsg(rg, nic_name).await
            }
            ResourceKind::NetworkInterface => self.az.delete_nic(rg, &record.name).await,
            ResourceKind::PublicIp => self.az.delete_public_ip(rg, &record.name).await,
            ResourceKind::SshKey => self.az.delete_ssh_key(rg, &record.name).await,
            other => Err(AzureError::UnsupportedKind(format!(
                "{} is never owned by a stack",
                other
            ))),
        }
    }
}

#[async_trait]
impl CloudBackend for AzureBackend {
    fn name(&self) -> &str {
        "azure"
    }

    async fn check_auth(&self) -> vmstack_cloud::Result<AuthStatus> {
        match self.az.check_auth().await {
            Ok(account) => Ok(AuthStatus::ok(format!(
                "{} ({})",
                account.name, account.id
            ))),
            Err(AzureError::AzNotFound) => Ok(AuthStatus::failed("az CLI is not installed")),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn read(
        &self,
        kind: ResourceKind,
        name: &str,
        record: &ResourceRecord,
    ) -> vmstack_cloud::Result<Option<LiveResource>> {
        self.read_inner(kind, name, record).await.map_err(to_cloud)
    }

    async fn lookup(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
    ) -> vmstack_cloud::Result<Option<LiveResource>> {
        self.lookup_inner(kind, name, props).await.map_err(to_cloud)
    }

    async fn create(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
    ) -> vmstack_cloud::Result<LiveResource> {
        self.create_inner(kind, name, props).await.map_err(to_cloud)
    }

    async fn update(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
        record: &ResourceRecord,
    ) -> vmstack_cloud::Result<LiveResource> {
        self.update_inner(kind, name, props, record)
            .await
            .map_err(to_cloud)
    }

    async fn delete(
        &self,
        kind: ResourceKind,
        record: &ResourceRecord,
    ) -> vmstack_cloud::Result<()> {
        self.delete_inner(kind, record).await.map_err(to_cloud)
    }
}

fn to_cloud(e: AzureError) -> CloudError {
    match e {
        AzureError::CloudError(inner) => inner,
        AzureError::ResourceNotFound(name) => CloudError::ResourceNotFound(name),
        AzureError::AuthenticationFailed(msg) => CloudError::AuthenticationFailed(msg),
        other => CloudError::ApiError(other.to_string()),
    }
}

fn required<'a>(props: &'a ResolvedProps, key: &str) -> Result<&'a str> {
    props
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AzureError::MissingProperty(key.to_string()))
}

fn optional<'a>(props: &'a ResolvedProps, key: &str) -> Option<&'a str> {
    props.get(key).and_then(|v| v.as_str())
}

fn required_record_prop<'a>(record: &'a ResourceRecord, key: &str) -> Result<&'a str> {
    record
        .properties
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| AzureError::MissingProperty(key.to_string()))
}

fn live_from_nic(nic: crate::azcli::NicInfo) -> LiveResource {
    let private_ip = nic
        .ip_configurations
        .first()
        .and_then(|c| c.private_ip_address.clone());
    LiveResource::new(nic.id).with_attribute("private_ip_address", json!(private_ip))
}

fn live_from_association(nic_id: &str, nsg_id: &str) -> LiveResource {
    LiveResource::new(format!("{}|{}", nic_id, nsg_id))
        .with_attribute("network_interface_id", json!(nic_id))
        .with_attribute("network_security_group_id", json!(nsg_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmstack_core::ResourceMode;

    #[test]
    fn test_required_prop() {
        let props: ResolvedProps =
            [("resource_group".to_string(), json!("rg-01"))].into_iter().collect();

        assert_eq!(required(&props, "resource_group").unwrap(), "rg-01");
        assert!(matches!(
            required(&props, "subnet_id"),
            Err(AzureError::MissingProperty(_))
        ));
    }

    #[test]
    fn test_association_live_resource() {
        let live = live_from_association("/x/nic-01", "/x/nsg-01");

        assert_eq!(live.id, "/x/nic-01|/x/nsg-01");
        assert_eq!(live.attributes["network_interface_id"], json!("/x/nic-01"));
    }

    #[test]
    fn test_record_prop_lookup() {
        let record = ResourceRecord::new(
            "nic-01",
            ResourceKind::NetworkInterface,
            ResourceMode::Managed,
            "/x/nic-01",
        )
        .with_properties([("resource_group".to_string(), json!("rg-01"))].into());

        assert_eq!(required_record_prop(&record, "resource_group").unwrap(), "rg-01");
    }
}
