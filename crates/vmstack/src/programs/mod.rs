//! Resource-declaration programs
//!
//! Each program turns a loaded configuration into the resource graph a
//! stack converges toward. Config keys are read when the graph is
//! built, so an absent key fails at its first use, not at load time.

pub mod fresh_vm;
pub mod snapshot_restore;

pub use fresh_vm::fresh_vm_program;
pub use snapshot_restore::snapshot_restore_program;

use vmstack_cloud::StackProgram;
use vmstack_core::ResourceGraph;

/// Wrap a fully built graph as a stack program.
pub fn program_from(graph: ResourceGraph) -> StackProgram {
    Box::new(move || Ok(graph.clone()))
}

/// Compose a subnet resource ID the way the provider spells them.
pub fn subnet_id(resource_group_id: &str, vnet_name: &str, subnet_name: &str) -> String {
    format!(
        "{}/providers/Microsoft.Network/virtualNetworks/{}/subnets/{}",
        resource_group_id, vnet_name, subnet_name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subnet_id_composition() {
        let id = subnet_id(
            "/subscriptions/xxx/resourceGroups/rg-01",
            "vnet-01",
            "default",
        );
        assert_eq!(
            id,
            "/subscriptions/xxx/resourceGroups/rg-01/providers/Microsoft.Network/virtualNetworks/vnet-01/subnets/default"
        );
    }
}
