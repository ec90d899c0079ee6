//! Stack lifecycle orchestration
//!
//! A [`Stack`] moves through `Selected -> Refreshed -> {Converged |
//! Destroyed}`, after which its bookkeeping can be removed. The one
//! load-bearing protocol invariant: `refresh` runs before any mutating
//! operation, so convergence and teardown act on reality rather than on
//! stale bookkeeping. `up` and `destroy` enforce this themselves when
//! the caller has not refreshed explicitly.

use crate::action::{Action, ActionType, ApplyResult, Plan};
use crate::backend::{CloudBackend, LiveResource, ResolvedProps};
use crate::error::{CloudError, Result};
use crate::state::{OutputValue, ResourceRecord, StackState, StateLock, StateManager};
use std::collections::HashMap;
use vmstack_core::{OutputRef, Property, ResourceGraph, ResourceMode, ResourceNode};

/// A resource-declaration program: invoked at convergence time to
/// produce the target graph.
pub type StackProgram = Box<dyn Fn() -> vmstack_core::Result<ResourceGraph> + Send + Sync>;

/// Program that declares nothing. Teardown-only flows bind this.
pub fn empty_program() -> StackProgram {
    Box::new(|| Ok(ResourceGraph::new()))
}

/// Lifecycle phase of a selected stack, for one process run.
/// Durability lives in the state record, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPhase {
    Selected,
    Refreshed,
    Converged,
    Destroyed,
}

/// Result of a refresh pass
#[derive(Debug, Clone, Default)]
pub struct RefreshSummary {
    /// Resources inspected
    pub inspected: usize,

    /// Records dropped because the resource no longer exists
    pub dropped: usize,
}

/// Result of a convergence
#[derive(Debug, Clone)]
pub struct UpResult {
    /// Outputs the program chose to publish
    pub outputs: HashMap<String, OutputValue>,

    /// Per-action outcomes
    pub result: ApplyResult,
}

/// A selected stack, exclusively held for the duration of one run.
pub struct Stack {
    manager: StateManager,
    program: StackProgram,
    state: StackState,
    phase: StackPhase,
    _lock: StateLock,
}

impl Stack {
    /// Create or select the stack identified by (project, stack).
    ///
    /// Idempotent: an existing record is bound to, a missing one is
    /// created empty. The supplied program becomes the graph `up`
    /// converges toward. No cloud side effects.
    pub async fn create_or_select(
        manager: StateManager,
        project: &str,
        stack: &str,
        program: StackProgram,
    ) -> Result<Self> {
        let lock = manager.acquire_lock(project, stack).await?;
        let state = manager.load_or_init(project, stack).await?;
        manager.save(&state).await?;

        tracing::info!(
            "Selected stack {}/{} ({} recorded resources)",
            project,
            stack,
            state.resources.len()
        );

        Ok(Self {
            manager,
            program,
            state,
            phase: StackPhase::Selected,
            _lock: lock,
        })
    }

    pub fn project(&self) -> &str {
        &self.state.project
    }

    pub fn name(&self) -> &str {
        &self.state.stack
    }

    pub fn phase(&self) -> StackPhase {
        self.phase
    }

    /// The stack's bookkeeping record as currently held in memory.
    pub fn state(&self) -> &StackState {
        &self.state
    }

    /// Outputs recorded by the last convergence.
    pub fn outputs(&self) -> &HashMap<String, OutputValue> {
        &self.state.outputs
    }

    /// Reconcile the stack record with actual infrastructure.
    ///
    /// Every recorded resource is read back from the backend; records
    /// whose resource has disappeared are dropped (drift), changed
    /// attributes are taken over. Emits one line per resource.
    pub async fn refresh(
        &mut self,
        backend: &dyn CloudBackend,
        on_output: &mut dyn FnMut(&str),
    ) -> Result<RefreshSummary> {
        let mut summary = RefreshSummary::default();

        for name in self.state.resource_names() {
            let Some(record) = self.state.get_resource(&name).cloned() else {
                continue;
            };

            summary.inspected += 1;

            match backend.read(record.kind, &record.name, &record).await? {
                Some(live) => {
                    if live.attributes == record.attributes && live.id == record.id {
                        on_output(&format!("  ~ {} {}: unchanged", record.kind, record.name));
                    } else {
                        on_output(&format!("  ~ {} {}: updated from cloud", record.kind, record.name));
                        let mut updated = record.clone();
                        updated.id = live.id;
                        updated.attributes = live.attributes;
                        updated.updated_at = chrono::Utc::now();
                        self.state.set_resource(updated);
                    }
                }
                None => {
                    on_output(&format!(
                        "  - {} {}: no longer exists, dropped from state",
                        record.kind, record.name
                    ));
                    self.state.remove_resource(&record.name);
                    summary.dropped += 1;
                }
            }
        }

        self.manager.save(&self.state).await?;
        self.phase = StackPhase::Refreshed;

        tracing::info!(
            "Refreshed stack {}: {} inspected, {} dropped",
            self.state.stack,
            summary.inspected,
            summary.dropped
        );
        Ok(summary)
    }

    /// Compute the plan `up` would apply, without applying it.
    ///
    /// Reference properties are only known after resolution, so the
    /// plan marks declared-and-recorded resources as unchanged rather
    /// than predicting updates.
    pub async fn preview(
        &mut self,
        backend: &dyn CloudBackend,
        on_output: &mut dyn FnMut(&str),
    ) -> Result<Plan> {
        if self.phase == StackPhase::Selected {
            self.refresh(backend, on_output).await?;
        }

        let graph = (self.program)()?;
        let mut actions = Vec::new();

        for node in graph.topo_order()? {
            let (action_type, description) = match (node.mode, self.state.get_resource(&node.name))
            {
                (ResourceMode::Adopted, _) => (
                    ActionType::NoOp,
                    format!("read existing {} {}", node.kind, node.name),
                ),
                (ResourceMode::Managed, None) => (
                    ActionType::Create,
                    format!("create {} {}", node.kind, node.name),
                ),
                (ResourceMode::Managed, Some(_)) => (
                    ActionType::NoOp,
                    format!("{} {} already recorded", node.kind, node.name),
                ),
            };
            actions.push(Action {
                action_type,
                kind: node.kind,
                resource_name: node.name.clone(),
                description,
            });
        }

        // Recorded but no longer declared: surfaced for the operator,
        // never deleted by `up`.
        for name in self.state.resource_names() {
            if graph.get(&name).is_none() {
                tracing::debug!(
                    "Resource {} recorded but not declared (will not auto-delete)",
                    name
                );
            }
        }

        Ok(Plan::new(actions))
    }

    /// Converge real infrastructure to the declared graph.
    ///
    /// Refreshes first when the caller has not. Walks the graph in
    /// dependency order, resolving reference properties from already
    /// resolved nodes; adopted resources are read and must exist,
    /// managed resources are created, updated on property drift, or
    /// left alone. Publishes the graph's exports as stack outputs.
    ///
    /// On a backend failure the record keeps everything converged so
    /// far; no rollback is attempted.
    pub async fn up(
        &mut self,
        backend: &dyn CloudBackend,
        on_output: &mut dyn FnMut(&str),
    ) -> Result<UpResult> {
        if self.phase == StackPhase::Selected {
            self.refresh(backend, on_output).await?;
        }

        let graph = (self.program)()?;
        let outcome = self.converge(backend, &graph, on_output).await;

        // Persist whatever was recorded, also on the failure path
        self.manager.save(&self.state).await?;

        let result = outcome?;
        self.phase = StackPhase::Converged;
        Ok(result)
    }

    async fn converge(
        &mut self,
        backend: &dyn CloudBackend,
        graph: &ResourceGraph,
        on_output: &mut dyn FnMut(&str),
    ) -> Result<UpResult> {
        let start = std::time::Instant::now();
        let mut result = ApplyResult::new();
        let mut resolved: HashMap<String, HashMap<String, serde_json::Value>> = HashMap::new();

        let order: Vec<String> = graph
            .topo_order()?
            .into_iter()
            .map(|n| n.name.clone())
            .collect();

        for name in order {
            let Some(node) = graph.get(&name) else {
                continue;
            };
            let props = resolve_props(node, &resolved)?;
            let deps: Vec<String> = node.dependencies().into_iter().map(String::from).collect();

            match node.mode {
                ResourceMode::Adopted => {
                    let live = backend
                        .lookup(node.kind, &node.name, &props)
                        .await?
                        .ok_or_else(|| {
                            CloudError::ResourceNotFound(format!("{} {}", node.kind, node.name))
                        })?;

                    on_output(&format!("    read {} {}", node.kind, node.name));
                    self.record_node(node, &props, deps, &live);
                    resolved.insert(node.name.clone(), resolved_attributes(node, &live));
                }
                ResourceMode::Managed => {
                    let existing = self.state.get_resource(&node.name).cloned();
                    match existing {
                        None => {
                            let live = backend.create(node.kind, &node.name, &props).await?;
                            on_output(&format!("  + created {} {}", node.kind, node.name));
                            result.add_success(
                                ActionType::Create,
                                &node.name,
                                format!("created {} (id {})", node.kind, live.id),
                            );
                            self.record_node(node, &props, deps, &live);
                            resolved.insert(node.name.clone(), resolved_attributes(node, &live));
                        }
                        Some(record) if record.properties != props => {
                            let live =
                                backend.update(node.kind, &node.name, &props, &record).await?;
                            on_output(&format!("  ~ updated {} {}", node.kind, node.name));
                            result.add_success(
                                ActionType::Update,
                                &node.name,
                                format!("updated {}", node.kind),
                            );
                            self.record_node(node, &props, deps, &live);
                            resolved.insert(node.name.clone(), resolved_attributes(node, &live));
                        }
                        Some(record) => {
                            on_output(&format!("    {} {} unchanged", node.kind, node.name));
                            let mut attrs = record.attributes.clone();
                            attrs
                                .entry("id".to_string())
                                .or_insert_with(|| serde_json::json!(record.id));
                            attrs
                                .entry("name".to_string())
                                .or_insert_with(|| serde_json::json!(node.name.clone()));
                            resolved.insert(node.name.clone(), attrs);
                        }
                    }
                }
            }
        }

        // Evaluate exports against the resolved graph
        let mut outputs = HashMap::new();
        for export in &graph.exports {
            let value = resolved
                .get(&export.source.node)
                .and_then(|attrs| attrs.get(&export.source.attr))
                .cloned()
                .ok_or_else(|| CloudError::UnresolvedReference {
                    node: format!("export {}", export.name),
                    attr: export.source.attr.clone(),
                    referenced: export.source.node.clone(),
                })?;
            outputs.insert(
                export.name.clone(),
                OutputValue {
                    value,
                    secret: export.secret,
                },
            );
        }
        self.state.set_outputs(outputs.clone());

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(UpResult { outputs, result })
    }

    fn record_node(
        &mut self,
        node: &ResourceNode,
        props: &ResolvedProps,
        deps: Vec<String>,
        live: &LiveResource,
    ) {
        let record = ResourceRecord::new(&node.name, node.kind, node.mode, &live.id)
            .with_attributes(live.attributes.clone())
            .with_properties(props.clone())
            .with_dependencies(deps);
        self.state.set_resource(record);
    }

    /// Tear down every resource the stack owns.
    ///
    /// Refreshes first when the caller has not, then deletes managed
    /// resources in reverse dependency order (a VM falls before its
    /// NIC, the NIC before its public IP). Adopted records are merely
    /// forgotten. Destroying an empty stack is a no-op.
    pub async fn destroy(
        &mut self,
        backend: &dyn CloudBackend,
        on_output: &mut dyn FnMut(&str),
    ) -> Result<ApplyResult> {
        if self.phase == StackPhase::Selected {
            self.refresh(backend, on_output).await?;
        }

        let start = std::time::Instant::now();
        let mut result = ApplyResult::new();

        if self.state.resources.is_empty() {
            on_output("  stack has no recorded resources, nothing to destroy");
            self.phase = StackPhase::Destroyed;
            return Ok(result);
        }

        let order = self.teardown_order()?;
        let outcome = async {
            for name in order {
                let Some(record) = self.state.get_resource(&name).cloned() else {
                    continue;
                };

                match record.mode {
                    ResourceMode::Managed => {
                        backend.delete(record.kind, &record).await?;
                        on_output(&format!("  - deleted {} {}", record.kind, record.name));
                        result.add_success(
                            ActionType::Delete,
                            &record.name,
                            format!("deleted {}", record.kind),
                        );
                    }
                    ResourceMode::Adopted => {
                        on_output(&format!(
                            "    released {} {} (not owned)",
                            record.kind, record.name
                        ));
                    }
                }
                self.state.remove_resource(&name);
            }
            Ok::<(), CloudError>(())
        }
        .await;

        if outcome.is_ok() {
            self.state.set_outputs(HashMap::new());
        }
        self.manager.save(&self.state).await?;
        outcome?;

        result.duration_ms = start.elapsed().as_millis() as u64;
        self.phase = StackPhase::Destroyed;
        Ok(result)
    }

    /// Reverse dependency order over the recorded resources.
    ///
    /// Rebuilt from the records' dependency edges; edges to resources
    /// that are no longer recorded are skipped.
    fn teardown_order(&self) -> Result<Vec<String>> {
        let mut graph = ResourceGraph::new();
        for name in self.state.resource_names() {
            let Some(record) = self.state.resources.get(&name) else {
                continue;
            };
            let mut node = match record.mode {
                ResourceMode::Managed => ResourceNode::managed(&record.name, record.kind),
                ResourceMode::Adopted => ResourceNode::adopted(&record.name, record.kind),
            };
            node.depends_on = record
                .depends_on
                .iter()
                .filter(|dep| self.state.resources.contains_key(*dep))
                .cloned()
                .collect();
            graph.add(node)?;
        }

        Ok(graph
            .reverse_topo_order()?
            .into_iter()
            .map(|n| n.name.clone())
            .collect())
    }

    /// Delete the stack's bookkeeping record.
    ///
    /// Refused while resources are still recorded; destroy first.
    pub async fn remove(self, on_output: &mut dyn FnMut(&str)) -> Result<()> {
        let Stack {
            manager,
            state,
            _lock,
            ..
        } = self;

        manager.remove_stack(&state).await?;
        _lock.release().await?;
        on_output(&format!(
            "stack {} in project {} removed",
            state.stack, state.project
        ));
        Ok(())
    }
}

/// Replace reference properties with the concrete values of the nodes
/// they point at. Topological order guarantees referenced nodes were
/// resolved earlier.
fn resolve_props(
    node: &ResourceNode,
    resolved: &HashMap<String, HashMap<String, serde_json::Value>>,
) -> Result<ResolvedProps> {
    let mut props = ResolvedProps::new();
    for (key, prop) in &node.props {
        let value = match prop {
            Property::Value(v) => v.clone(),
            Property::Ref(OutputRef { node: target, attr }) => resolved
                .get(target)
                .and_then(|attrs| attrs.get(attr))
                .cloned()
                .ok_or_else(|| CloudError::UnresolvedReference {
                    node: node.name.clone(),
                    attr: attr.clone(),
                    referenced: target.clone(),
                })?,
        };
        props.insert(key.clone(), value);
    }
    Ok(props)
}

/// Attributes other nodes may reference. The provider id and the
/// declared name are always present.
fn resolved_attributes(
    node: &ResourceNode,
    live: &LiveResource,
) -> HashMap<String, serde_json::Value> {
    let mut attrs = live.attributes.clone();
    attrs
        .entry("id".to_string())
        .or_insert_with(|| serde_json::json!(live.id));
    attrs
        .entry("name".to_string())
        .or_insert_with(|| serde_json::json!(node.name.clone()));
    attrs
}
