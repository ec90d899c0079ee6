//! Action types for stack convergence

use serde::{Deserialize, Serialize};
use vmstack_core::ResourceKind;

/// Represents a planned action for one declared resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Type of action to perform
    pub action_type: ActionType,

    /// Kind of the resource the action targets
    pub kind: ResourceKind,

    /// Declared resource name
    pub resource_name: String,

    /// Description of the action
    pub description: String,
}

/// Type of action to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create a new resource
    Create,
    /// Update an existing resource
    Update,
    /// Delete a resource
    Delete,
    /// No changes needed
    NoOp,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Update => write!(f, "update"),
            ActionType::Delete => write!(f, "delete"),
            ActionType::NoOp => write!(f, "no-op"),
        }
    }
}

/// Plan containing all actions convergence would apply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Actions in the order they would run
    pub actions: Vec<Action>,

    /// Whether the plan has any changes
    pub has_changes: bool,
}

impl Plan {
    pub fn new(actions: Vec<Action>) -> Self {
        let has_changes = actions.iter().any(|a| a.action_type != ActionType::NoOp);
        Self {
            actions,
            has_changes,
        }
    }

    pub fn empty() -> Self {
        Self {
            actions: Vec::new(),
            has_changes: false,
        }
    }

    /// Get actions by type
    pub fn actions_by_type(&self, action_type: ActionType) -> Vec<&Action> {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .collect()
    }

    /// Summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.actions_by_type(ActionType::Create).len(),
            update: self.actions_by_type(ActionType::Update).len(),
            delete: self.actions_by_type(ActionType::Delete).len(),
            no_change: self.actions_by_type(ActionType::NoOp).len(),
        }
    }
}

/// Summary of planned actions
#[derive(Debug, Clone)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl std::fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

/// Result of applying actions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyResult {
    /// Successfully applied actions
    pub succeeded: Vec<ActionOutcome>,

    /// Failed actions
    pub failed: Vec<ActionOutcome>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl ApplyResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(
        &mut self,
        action_type: ActionType,
        resource_name: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.succeeded.push(ActionOutcome {
            action_type,
            resource_name: resource_name.into(),
            message: message.into(),
            error: None,
        });
    }

    pub fn add_failure(
        &mut self,
        action_type: ActionType,
        resource_name: impl Into<String>,
        error: impl Into<String>,
    ) {
        self.failed.push(ActionOutcome {
            action_type,
            resource_name: resource_name.into(),
            message: String::new(),
            error: Some(error.into()),
        });
    }
}

/// Result of a single action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    /// What was attempted
    pub action_type: ActionType,

    /// Declared resource name
    pub resource_name: String,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_summary() {
        let plan = Plan::new(vec![
            Action {
                action_type: ActionType::Create,
                kind: ResourceKind::PublicIp,
                resource_name: "public-ip".to_string(),
                description: "create public IP".to_string(),
            },
            Action {
                action_type: ActionType::NoOp,
                kind: ResourceKind::VirtualMachine,
                resource_name: "vm".to_string(),
                description: "unchanged".to_string(),
            },
        ]);

        assert!(plan.has_changes);
        let summary = plan.summary();
        assert_eq!(summary.create, 1);
        assert_eq!(summary.no_change, 1);
        assert_eq!(summary.to_string(), "1 to create, 0 to update, 0 to delete, 1 unchanged");
    }

    #[test]
    fn test_empty_plan_has_no_changes() {
        assert!(!Plan::empty().has_changes);
    }
}
