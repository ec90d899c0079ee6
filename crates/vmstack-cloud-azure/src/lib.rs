//! Azure backend for vmstack
//!
//! This crate implements the CloudBackend trait against Azure,
//! provisioning VM stacks (public IPs, NICs, managed disks, VMs)
//! through the az CLI.
//!
//! # Requirements
//!
//! - `az` CLI must be installed and logged in (`az login`), with the
//!   target subscription selected
//!
//! # Example
//!
//! ```ignore
//! use vmstack_cloud::CloudBackend;
//! use vmstack_cloud_azure::AzureBackend;
//!
//! let backend = AzureBackend::new("westeurope");
//!
//! // Check authentication
//! let auth = backend.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//! ```

pub mod azcli;
pub mod error;
pub mod provider;

pub use azcli::{
    AccountInfo, AzCli, CreateNicConfig, CreateVmConfig, DiskInfo, NicInfo, PublicIpInfo,
    SnapshotInfo, SshKeyInfo, VmInfo, VmSource, VnetInfo,
};
pub use error::{AzureError, Result};
pub use provider::AzureBackend;
