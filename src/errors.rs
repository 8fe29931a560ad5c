//! Error Types
//!
//! This module defines the error type shared by the render core and the
//! hardware-access framework.
//!
//! # Overview
//!
//! [`AsterError`] covers precondition violations raised by calling code:
//! - State binding errors (wrong unit, mismatched state type)
//! - Context bookkeeping errors (re-entrant atoms, texture transfer bounds)
//! - Scheduling errors (attach points, context attachment, failed frames)
//! - Resource management errors
//!
//! Driver capability gaps are *not* errors: they surface as a
//! [`Status`](crate::framework::Status) on the affected resource.
//!
//! # Usage
//!
//! ```rust,ignore
//! use aster::errors::{AsterError, Result};
//!
//! fn bind() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::renderer::task::AttachPoint;
use crate::state::{StateType, StateUnit};

/// The main error type for the render core.
#[derive(Error, Debug)]
pub enum AsterError {
    // ========================================================================
    // State Errors
    // ========================================================================
    /// A state atom was bound to a unit its type does not accept.
    #[error("Unit {unit:?} is not valid for {state_type:?} state")]
    InvalidStateUnit {
        state_type: StateType,
        unit: StateUnit,
    },

    /// A state atom's type disagrees with the slot it is stored in.
    #[error("Expected {expected:?} state, found {found:?}")]
    StateTypeMismatch {
        expected: StateType,
        found: StateType,
    },

    /// A state manager was created without any bindings.
    #[error("State manager for {0:?} has no bound atoms")]
    EmptyStateManager(StateType),

    // ========================================================================
    // Context Errors
    // ========================================================================
    /// `begin_atom` was called while another atom is still open.
    #[error("begin_atom() called before the previous atom was ended")]
    AtomAlreadyBegun,

    /// `end_atom` was called for an atom that is not the open one.
    #[error("end_atom() called with a different atom or without begin_atom()")]
    AtomMismatch,

    /// The atom being ended has no geometry or spatial link.
    #[error("Render atom is incomplete: {0}")]
    IncompleteAtom(&'static str),

    /// A texture transfer region or buffer slice failed validation.
    #[error("Invalid texture transfer: {0}")]
    InvalidTransfer(String),

    /// The clear color did not have exactly four components.
    #[error("Clear color must have exactly 4 components, got {0}")]
    InvalidClearColor(usize),

    /// The context has been destroyed.
    #[error("Render context has been destroyed")]
    ContextDestroyed,

    /// A backend operation failed.
    #[error("Backend error: {0}")]
    Backend(String),

    // ========================================================================
    // Scheduling Errors
    // ========================================================================
    /// A task was attached to a point its owner does not drain.
    #[error("Attach point {0:?} is not available here")]
    InvalidAttachPoint(AttachPoint),

    /// A render context is already attached to the manager.
    #[error("A render context is already attached to this manager")]
    ContextAlreadyAttached,

    /// The manager has no attached render context.
    #[error("No render context attached")]
    NoContext,

    /// A task reported a failure.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// An error raised during a frame, re-raised after frame bookkeeping.
    #[error("Frame failed: {0}")]
    Frame(#[source] Box<AsterError>),

    // ========================================================================
    // Framework & Resource Errors
    // ========================================================================
    /// The resource is in use and cannot be disposed.
    #[error("Resource {0} is not disposable")]
    NotDisposable(u64),

    /// A queued task was cancelled before it could run.
    #[error("Task was cancelled")]
    Cancelled,

    /// A worker thread could not be spawned.
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(#[from] std::io::Error),

    /// A surface could not be created.
    #[error("Failed to create surface: {0}")]
    SurfaceCreation(String),
}

/// Alias for `Result<T, AsterError>`.
pub type Result<T> = std::result::Result<T, AsterError>;
