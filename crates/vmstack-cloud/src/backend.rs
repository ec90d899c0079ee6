//! Cloud backend trait definition

use crate::error::Result;
use crate::state::ResourceRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vmstack_core::ResourceKind;

/// Fully resolved resource properties: every reference replaced by the
/// concrete value of the node it pointed at.
pub type ResolvedProps = HashMap<String, serde_json::Value>;

/// Cloud backend abstraction trait
///
/// A backend turns resolved resource declarations into provider calls.
/// The orchestration layer drives it one resource at a time, in
/// dependency order; the backend never sees the graph.
#[async_trait]
pub trait CloudBackend: Send + Sync {
    /// Returns the backend name (e.g., "azure")
    fn name(&self) -> &str;

    /// Check if the backend is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Read the current cloud state of a recorded resource.
    ///
    /// Returns `None` when the resource no longer exists (drift).
    async fn read(
        &self,
        kind: ResourceKind,
        name: &str,
        record: &ResourceRecord,
    ) -> Result<Option<LiveResource>>;

    /// Look up a pre-existing (adopted) resource by its declared
    /// properties. Returns `None` when it cannot be found.
    async fn lookup(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
    ) -> Result<Option<LiveResource>>;

    /// Create a resource.
    async fn create(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
    ) -> Result<LiveResource>;

    /// Converge an existing resource onto changed properties.
    async fn update(
        &self,
        kind: ResourceKind,
        name: &str,
        props: &ResolvedProps,
        record: &ResourceRecord,
    ) -> Result<LiveResource>;

    /// Delete a resource.
    async fn delete(&self, kind: ResourceKind, record: &ResourceRecord) -> Result<()>;
}

/// A resource as the provider reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveResource {
    /// Provider-assigned resource ID
    pub id: String,

    /// Resource attributes (IP address, key material, etc.)
    pub attributes: HashMap<String, serde_json::Value>,
}

impl LiveResource {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}
