//! Declarative resource graphs.
//!
//! A [`ResourceGraph`] is the target a stack converges toward: a set of
//! typed resource nodes plus the dependency edges between them. Node
//! properties are either literal JSON values or references to another
//! node's output attribute ([`Property::Ref`]); a reference's concrete
//! value is only known once the referenced node has been resolved
//! against the backend, so references imply ordering edges.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of infrastructure resource a node declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ResourceGroup,
    VirtualNetwork,
    NetworkSecurityGroup,
    SshKey,
    PublicIp,
    NetworkInterface,
    NsgAssociation,
    Snapshot,
    ManagedDisk,
    VirtualMachine,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResourceKind::ResourceGroup => "resource-group",
            ResourceKind::VirtualNetwork => "virtual-network",
            ResourceKind::NetworkSecurityGroup => "network-security-group",
            ResourceKind::SshKey => "ssh-key",
            ResourceKind::PublicIp => "public-ip",
            ResourceKind::NetworkInterface => "network-interface",
            ResourceKind::NsgAssociation => "nsg-association",
            ResourceKind::Snapshot => "snapshot",
            ResourceKind::ManagedDisk => "managed-disk",
            ResourceKind::VirtualMachine => "virtual-machine",
        };
        write!(f, "{}", name)
    }
}

/// Whether convergence owns a node's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceMode {
    /// Created by `up`, deleted by `destroy`.
    Managed,
    /// Pre-existing infrastructure looked up during convergence and
    /// never deleted (the resource group, vnet, NSG and snapshot the
    /// programs build on).
    Adopted,
}

/// Reference to another node's resolved output attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRef {
    pub node: String,
    pub attr: String,
}

/// A node property: a literal value, or a value that only exists once
/// another node has been resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Value(serde_json::Value),
    Ref(OutputRef),
}

/// One declared resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNode {
    pub name: String,
    pub kind: ResourceKind,
    pub mode: ResourceMode,
    pub props: HashMap<String, Property>,
    /// Explicit ordering edges on top of the ones implied by refs.
    pub depends_on: Vec<String>,
}

impl ResourceNode {
    pub fn managed(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mode: ResourceMode::Managed,
            props: HashMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn adopted(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            mode: ResourceMode::Adopted,
            props: HashMap::new(),
            depends_on: Vec::new(),
        }
    }

    pub fn with_prop(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.props.insert(key.into(), Property::Value(value));
        self
    }

    pub fn with_ref(
        mut self,
        key: impl Into<String>,
        node: impl Into<String>,
        attr: impl Into<String>,
    ) -> Self {
        self.props.insert(
            key.into(),
            Property::Ref(OutputRef {
                node: node.into(),
                attr: attr.into(),
            }),
        );
        self
    }

    pub fn with_dependency(mut self, node: impl Into<String>) -> Self {
        self.depends_on.push(node.into());
        self
    }

    /// All nodes this node must wait for: explicit edges plus the nodes
    /// named by reference properties, deduplicated.
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps: Vec<&str> = self.depends_on.iter().map(String::as_str).collect();
        for prop in self.props.values() {
            if let Property::Ref(OutputRef { node, .. }) = prop {
                deps.push(node);
            }
        }
        deps.sort_unstable();
        deps.dedup();
        deps
    }
}

/// A value the stack publishes on successful convergence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Export {
    pub name: String,
    pub source: OutputRef,
    /// Secret exports (key material) are masked in human-facing output.
    pub secret: bool,
}

/// The declared target state of one stack.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    pub exports: Vec<Export>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Node names are unique within a graph.
    pub fn add(&mut self, node: ResourceNode) -> Result<()> {
        if self.index.contains_key(&node.name) {
            return Err(CoreError::DuplicateResource(node.name));
        }
        self.index.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceNode> {
        self.index.get(name).map(|&i| &self.nodes[i])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter()
    }

    /// Publish a node attribute as a stack output.
    pub fn export(
        &mut self,
        name: impl Into<String>,
        node: impl Into<String>,
        attr: impl Into<String>,
    ) -> Result<()> {
        self.push_export(name.into(), node.into(), attr.into(), false)
    }

    /// Publish a node attribute as a secret stack output.
    pub fn export_secret(
        &mut self,
        name: impl Into<String>,
        node: impl Into<String>,
        attr: impl Into<String>,
    ) -> Result<()> {
        self.push_export(name.into(), node.into(), attr.into(), true)
    }

    fn push_export(&mut self, name: String, node: String, attr: String, secret: bool) -> Result<()> {
        if !self.index.contains_key(&node) {
            return Err(CoreError::UnknownExportNode { name, node });
        }
        self.exports.push(Export {
            name,
            source: OutputRef { node, attr },
            secret,
        });
        Ok(())
    }

    /// Nodes in dependency order: every node appears after everything it
    /// depends on. Deterministic — ties are broken by insertion order.
    pub fn topo_order(&self) -> Result<Vec<&ResourceNode>> {
        // Kahn's algorithm over the index space, scanning in insertion
        // order so the result is stable across runs.
        let mut indegree = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];

        for (i, node) in self.nodes.iter().enumerate() {
            for dep in node.dependencies() {
                let &j = self
                    .index
                    .get(dep)
                    .ok_or_else(|| CoreError::UnknownDependency {
                        node: node.name.clone(),
                        dependency: dep.to_string(),
                    })?;
                indegree[i] += 1;
                dependents[j].push(i);
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut emitted = vec![false; self.nodes.len()];

        while order.len() < self.nodes.len() {
            let next = (0..self.nodes.len()).find(|&i| !emitted[i] && indegree[i] == 0);

            let Some(i) = next else {
                let stuck: Vec<&str> = (0..self.nodes.len())
                    .filter(|&i| !emitted[i])
                    .map(|i| self.nodes[i].name.as_str())
                    .collect();
                return Err(CoreError::CycleDetected(stuck.join(", ")));
            };

            emitted[i] = true;
            order.push(&self.nodes[i]);
            for &dependent in &dependents[i] {
                indegree[dependent] -= 1;
            }
        }

        tracing::debug!("Ordered {} resources for resolution", order.len());
        Ok(order)
    }

    /// Reverse dependency order: every node appears before everything it
    /// depends on. This is the teardown order.
    pub fn reverse_topo_order(&self) -> Result<Vec<&ResourceNode>> {
        let mut order = self.topo_order()?;
        order.reverse();
        Ok(order)
    }
}

// The serde(skip) on `index` means a deserialized graph has an empty
// index; rebuild it. Graphs are serialized only in tests and debugging
// dumps, but a silently broken lookup table is worse than the extra
// pass.
impl<'de> serde::de::Deserialize<'de> for ResourceGraph {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            nodes: Vec<ResourceNode>,
            #[serde(default)]
            exports: Vec<Export>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut graph = ResourceGraph {
            nodes: Vec::new(),
            index: HashMap::new(),
            exports: raw.exports,
        };
        for node in raw.nodes {
            graph
                .add(node)
                .map_err(|e| serde::de::Error::custom(e.to_string()))?;
        }
        Ok(graph)
    }
}
