//! Sandbox error types.

use safepath_abi::AbiError;

/// Top-level error type for the sandbox crate.
///
/// None of these are transient: each one means either a structurally
/// incompatible guest module or a broken invariant, so nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Wasmtime engine or store configuration error.
    #[error("wasmtime error: {0}")]
    Wasmtime(#[from] anyhow::Error),

    /// The module failed to compile, or lacks a required export, or an
    /// export has the wrong type.
    #[error("bootstrap error: {0}")]
    Bootstrap(String),

    /// Allocation, bounds, layout, or UTF-8 failure at the guest boundary.
    #[error(transparent)]
    Abi(#[from] AbiError),

    /// Operation attempted on an interpolator that was already released.
    #[error("usage error: {0}")]
    Usage(&'static str),

    /// Fuel exhausted during a guest call (instruction limit).
    #[error("fuel exhausted (instruction limit)")]
    FuelExhausted,

    /// WASM guest trapped.
    #[error("guest trapped: {0}")]
    GuestTrapped(String),

    /// A thread panicked while holding the guest context lock.
    #[error("guest context lock poisoned")]
    ContextPoisoned,
}
