//! Crate-level error type.
//!
//! Shaped like `codegraph-ir`'s `errors.rs`/`differential/error.rs` pair: a
//! flat `thiserror`-derived enum with one variant per failure kind (§7) and
//! small constructor-sugar functions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    /// `update()` was called against an ICFG that does not implement
    /// `UpdatableIcfg`.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The worker pool's quiescence wait was interrupted (a worker panicked
    /// while parking, or the pool was dropped mid-wait). The solver's
    /// tables are left in an undefined state and must not be reused.
    #[error("quiescence wait interrupted: {0}")]
    Interrupted(String),

    /// A client-supplied flow/edge/lattice function panicked while a worker
    /// was executing it.
    #[error("client function fault: {0}")]
    ClientFault(String),
}

impl SolverError {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        SolverError::UnsupportedOperation(msg.into())
    }

    pub fn interrupted(msg: impl Into<String>) -> Self {
        SolverError::Interrupted(msg.into())
    }

    pub fn client_fault(msg: impl Into<String>) -> Self {
        SolverError::ClientFault(msg.into())
    }

    /// Build a `ClientFault` from a caught panic payload, extracting a
    /// message when the payload is a `&str` or `String`.
    pub fn from_panic_payload(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "client function panicked with a non-string payload".to_string()
        };
        SolverError::ClientFault(msg)
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;
