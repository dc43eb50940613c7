//! `safepath-sandbox` — Wasmtime host for the safepath interpolation guest.
//!
//! This crate loads the path interpolation WASM module, validates its ABI,
//! and marshals string arrays in and out of its linear memory. It enforces:
//!
//! - **ABI validation:** `memory`, `alloc`, `dealloc`, `interpolate` with
//!   exact signatures, and no imports
//! - **Serialized access:** one guest call in flight per context
//! - **Fuel metering:** every guest call gets a bounded instruction budget
//! - **Memory limits:** bounded linear memory growth
//! - **Region lifetimes:** every host-allocated region is released exactly
//!   once, including on error paths and on drop
//!
//! The primary entry point is [`Interpolator`].

pub mod error;
pub mod config;
pub mod validation;
pub mod instance;
pub mod context;
pub mod session;

pub use error::SandboxError;
pub use config::GuestConfig;
pub use context::{ContextCell, GuestContext};
pub use instance::GuestInstance;
pub use session::Interpolator;
