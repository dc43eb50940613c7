//! Guest module bootstrap and the shared execution context.
//!
//! A `GuestContext` owns the one instantiated guest and serializes every call
//! into it behind a mutex: the guest's linear memory and allocator have no
//! concurrency isolation of their own. Contexts are built explicitly and
//! passed to each [`Interpolator`](crate::Interpolator) as an `Arc`.
//! [`ContextCell`] gives "bootstrap once, then reuse" semantics without a
//! hidden global.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};
use wasmtime::{Config, Engine, Module};

use crate::config::GuestConfig;
use crate::error::SandboxError;
use crate::instance::GuestInstance;
use crate::validation::validate_module;

/// The instantiated guest module shared by every interpolator.
pub struct GuestContext {
    guest: Mutex<GuestInstance>,
    module_digest: blake3::Hash,
}

impl GuestContext {
    /// Compile, validate, and instantiate a guest module.
    ///
    /// Accepts a binary module or WAT text. Any compile error, missing or
    /// mistyped export, or import is `SandboxError::Bootstrap`; nothing is
    /// left behind on failure.
    pub fn bootstrap(module_bytes: &[u8], config: &GuestConfig) -> Result<Arc<Self>, SandboxError> {
        let engine = create_engine()?;
        let module = Module::new(&engine, module_bytes)
            .map_err(|e| SandboxError::Bootstrap(format!("compile failed: {:#}", e)))?;
        validate_module(&module)?;

        let guest = GuestInstance::instantiate(&engine, &module, config)?;
        let module_digest = blake3::hash(module_bytes);
        info!(
            digest = %module_digest,
            memory_pages = guest.memory_pages(),
            fuel_limit = config.fuel_limit,
            "guest module bootstrapped"
        );

        Ok(Arc::new(Self {
            guest: Mutex::new(guest),
            module_digest,
        }))
    }

    /// blake3 digest of the module bytes this context was built from.
    pub fn module_digest(&self) -> &blake3::Hash {
        &self.module_digest
    }

    /// Run `f` with exclusive access to the guest.
    ///
    /// At most one closure runs per context at a time, so allocations, writes,
    /// guest calls and reads inside `f` never interleave with another caller's.
    pub fn with_guest<R>(
        &self,
        f: impl FnOnce(&mut GuestInstance) -> Result<R, SandboxError>,
    ) -> Result<R, SandboxError> {
        let mut guest = self
            .guest
            .lock()
            .map_err(|_| SandboxError::ContextPoisoned)?;
        f(&mut guest)
    }
}

impl fmt::Debug for GuestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestContext")
            .field("module_digest", &self.module_digest)
            .finish_non_exhaustive()
    }
}

/// Holds at most one bootstrapped [`GuestContext`].
///
/// The first successful [`get_or_bootstrap`](ContextCell::get_or_bootstrap)
/// stores the context; later calls return it without instantiating again. A
/// failed bootstrap stores nothing.
#[derive(Debug, Default)]
pub struct ContextCell {
    slot: Mutex<Option<Arc<GuestContext>>>,
}

impl ContextCell {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// The stored context, if bootstrap has succeeded.
    pub fn get(&self) -> Option<Arc<GuestContext>> {
        // The slot is only ever assigned a complete context, so a poisoned
        // lock still guards a consistent value.
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the stored context, bootstrapping it from `module_bytes` first
    /// if this is the first successful call.
    pub fn get_or_bootstrap(
        &self,
        module_bytes: &[u8],
        config: &GuestConfig,
    ) -> Result<Arc<GuestContext>, SandboxError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(context) = slot.as_ref() {
            if *context.module_digest() != blake3::hash(module_bytes) {
                warn!(
                    existing = %context.module_digest(),
                    "context already bootstrapped from a different module; reusing it"
                );
            }
            return Ok(Arc::clone(context));
        }

        let context = GuestContext::bootstrap(module_bytes, config)?;
        *slot = Some(Arc::clone(&context));
        Ok(context)
    }
}

/// Create a Wasmtime engine for the interpolator guest.
fn create_engine() -> Result<Engine, SandboxError> {
    let mut wasm_config = Config::new();

    // Fuel metering: bounds every guest call
    wasm_config.consume_fuel(true);

    // The ABI addresses exactly one linear memory
    wasm_config.wasm_multi_memory(false);

    Ok(Engine::new(&wasm_config)?)
}
