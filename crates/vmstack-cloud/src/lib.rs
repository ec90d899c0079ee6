//! vmstack cloud orchestration
//!
//! This crate provides the backend abstraction and the stack lifecycle
//! for vmstack: durable stack records, refresh against reality, and
//! convergence of a declared resource graph.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   vmstack CLI                    │
//! │           (deploy / preview / destroy)           │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               vmstack-cloud                      │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Backend Abstraction              │   │
//! │  │  trait CloudBackend { ... }               │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │  Stack FSM   │  │  State Mgmt  │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────────────────────┬─────────────────────────┘
//!                         │
//!                 ┌───────▼───────┐
//!                 │     azure     │
//!                 │    backend    │
//!                 └───────────────┘
//! ```
//!
//! The lifecycle per stack is `create_or_select -> refresh ->
//! {up | destroy} -> remove`; `up` and `destroy` refresh internally
//! when the caller skipped the explicit step.

pub mod action;
pub mod backend;
pub mod error;
pub mod stack;
pub mod state;

// Re-exports
pub use action::{Action, ActionOutcome, ActionType, ApplyResult, Plan, PlanSummary};
pub use backend::{AuthStatus, CloudBackend, LiveResource, ResolvedProps};
pub use error::{CloudError, Result};
pub use stack::{
    RefreshSummary, Stack, StackPhase, StackProgram, UpResult, empty_program,
};
pub use state::{OutputValue, ResourceRecord, StackState, StateLock, StateManager};
