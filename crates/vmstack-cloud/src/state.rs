//! Durable stack state
//!
//! Each stack's bookkeeping record lives in
//! `.vmstack/stacks/<project>/<stack>.json`: the resources the stack
//! owns, their last-known attributes, and the outputs of the last
//! convergence. The record is what `refresh` reconciles against reality.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use vmstack_core::{ResourceKind, ResourceMode};

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".vmstack";
const STACKS_DIR: &str = "stacks";

/// Bookkeeping record of one stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackState {
    /// State file version
    pub version: u32,

    /// Project the stack belongs to
    pub project: String,

    /// Stack name, unique within the project
    pub stack: String,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources indexed by declared name
    pub resources: HashMap<String, ResourceRecord>,

    /// Outputs of the last successful convergence
    pub outputs: HashMap<String, OutputValue>,
}

impl StackState {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            version: STATE_VERSION,
            project: project.into(),
            stack: stack.into(),
            updated_at: Utc::now(),
            resources: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    /// Add or update a resource record
    pub fn set_resource(&mut self, record: ResourceRecord) {
        self.resources.insert(record.name.clone(), record);
        self.updated_at = Utc::now();
    }

    /// Remove a resource record
    pub fn remove_resource(&mut self, name: &str) -> Option<ResourceRecord> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.updated_at = Utc::now();
        }
        result
    }

    /// Get a resource record by declared name
    pub fn get_resource(&self, name: &str) -> Option<&ResourceRecord> {
        self.resources.get(name)
    }

    /// Recorded resource names, sorted for stable iteration
    pub fn resource_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.resources.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn set_outputs(&mut self, outputs: HashMap<String, OutputValue>) {
        self.outputs = outputs;
        self.updated_at = Utc::now();
    }
}

/// Last-known state of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    /// Declared name within the stack
    pub name: String,

    /// Resource kind
    pub kind: ResourceKind,

    /// Whether the stack owns the resource's lifecycle
    pub mode: ResourceMode,

    /// Provider-assigned resource ID
    pub id: String,

    /// Attributes as last reported by the backend (IP, key material, ...)
    pub attributes: HashMap<String, serde_json::Value>,

    /// Resolved input properties the resource was last converged with.
    /// Compared against the next convergence to detect updates.
    pub properties: HashMap<String, serde_json::Value>,

    /// Declared dependency edges, kept for teardown ordering
    pub depends_on: Vec<String>,

    /// When the resource was first recorded
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceRecord {
    pub fn new(
        name: impl Into<String>,
        kind: ResourceKind,
        mode: ResourceMode,
        id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            kind,
            mode,
            id: id.into(),
            attributes: HashMap::new(),
            properties: HashMap::new(),
            depends_on: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_attributes(mut self, attributes: HashMap<String, serde_json::Value>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_properties(mut self, properties: HashMap<String, serde_json::Value>) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_dependencies(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    pub fn get_attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// One published stack output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputValue {
    pub value: serde_json::Value,

    /// Secret outputs (key material) are masked in human-facing output
    pub secret: bool,
}

/// Reads and writes stack state files
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Project root directory
    root: PathBuf,
}

impl StateManager {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn stacks_dir(&self, project: &str) -> PathBuf {
        self.root.join(STATE_DIR).join(STACKS_DIR).join(project)
    }

    fn state_path(&self, project: &str, stack: &str) -> PathBuf {
        self.stacks_dir(project).join(format!("{}.json", stack))
    }

    fn backup_path(&self, project: &str, stack: &str) -> PathBuf {
        self.stacks_dir(project)
            .join(format!("{}.json.backup", stack))
    }

    fn lock_path(&self, project: &str, stack: &str) -> PathBuf {
        self.stacks_dir(project).join(format!("{}.lock.json", stack))
    }

    async fn ensure_stacks_dir(&self, project: &str) -> Result<()> {
        let dir = self.stacks_dir(project);
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created stack state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load a stack record, or create an empty one.
    ///
    /// This is the idempotent half of create-or-select: an existing
    /// record is bound to, a missing one starts empty.
    pub async fn load_or_init(&self, project: &str, stack: &str) -> Result<StackState> {
        let path = self.state_path(project, stack);
        if !path.exists() {
            tracing::debug!("Stack record not found, creating empty stack {}", stack);
            return Ok(StackState::new(project, stack));
        }

        let content = fs::read_to_string(&path).await?;
        let state: StackState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "stack record version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!(
            "Loaded stack {} with {} resources",
            stack,
            state.resources.len()
        );
        Ok(state)
    }

    /// Save a stack record, keeping a backup of the previous one.
    pub async fn save(&self, state: &StackState) -> Result<()> {
        self.ensure_stacks_dir(&state.project).await?;

        let path = self.state_path(&state.project, &state.stack);
        let backup = self.backup_path(&state.project, &state.stack);

        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&path, content).await?;

        tracing::debug!(
            "Saved stack {} with {} resources",
            state.stack,
            state.resources.len()
        );
        Ok(())
    }

    /// Delete a stack's bookkeeping record.
    ///
    /// Refused while the record still claims resources: the caller must
    /// destroy first.
    pub async fn remove_stack(&self, state: &StackState) -> Result<()> {
        if !state.resources.is_empty() {
            return Err(CloudError::StackNotEmpty(state.stack.clone()));
        }

        let path = self.state_path(&state.project, &state.stack);
        if path.exists() {
            fs::remove_file(&path).await?;
        }
        let backup = self.backup_path(&state.project, &state.stack);
        if backup.exists() {
            fs::remove_file(&backup).await?;
        }

        tracing::debug!("Removed stack record {}/{}", state.project, state.stack);
        Ok(())
    }

    /// Acquire a lock for exclusive access to one stack.
    pub async fn acquire_lock(&self, project: &str, stack: &str) -> Result<StateLock> {
        self.ensure_stacks_dir(project).await?;

        let lock_path = self.lock_path(project, stack);

        if lock_path.exists() {
            let content = fs::read_to_string(&lock_path).await?;
            let lock_info: LockInfo = serde_json::from_str(&content)?;

            // Locks older than an hour are assumed stale
            let age = Utc::now().signed_duration_since(lock_info.acquired_at);
            if age.num_hours() < 1 {
                return Err(CloudError::LockError(format!(
                    "stack is locked by {} since {}",
                    lock_info.holder, lock_info.acquired_at
                )));
            }

            tracing::warn!("Removing stale lock from {}", lock_info.holder);
        }

        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };

        let content = serde_json::to_string_pretty(&lock_info)?;
        fs::write(&lock_path, content).await?;

        tracing::debug!("Acquired lock for {}/{}", project, stack);
        Ok(StateLock {
            lock_path,
            released: false,
        })
    }
}

/// Lock information
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for a stack lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released stack lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            // Synchronous cleanup in drop - not ideal but necessary
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
