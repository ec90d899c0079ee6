//! vmstack resource graph model
//!
//! This crate holds the declarative side of vmstack: typed resource
//! nodes, the dependency graph a stack converges toward, and the small
//! value types (image references, security profiles) the programs parse
//! out of configuration.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   vmstack CLI                    │
//! │             (deploy/preview/destroy)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │ declares
//! ┌─────────────────▼───────────────────────────────┐
//! │                vmstack-core                      │
//! │  ResourceGraph: nodes + reference edges          │
//! │  topo_order() / reverse_topo_order()             │
//! └─────────────────┬───────────────────────────────┘
//!                   │ resolved by
//! ┌─────────────────▼───────────────────────────────┐
//! │               vmstack-cloud                      │
//! │     Stack lifecycle (refresh / up / destroy)     │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod graph;
pub mod model;

// Re-exports
pub use error::{CoreError, Result};
pub use graph::{
    Export, OutputRef, Property, ResourceGraph, ResourceKind, ResourceMode, ResourceNode,
};
pub use model::{DiskCreateOption, ImageReference, IpAllocationMethod, OsType, SecurityType};
