//! The instantiated guest: store, linear memory, and typed entry points.
//!
//! `GuestInstance` is the wasmtime side of the two ABI seams. It implements
//! [`GuestMemory`] over the exported `memory`, and [`GuestAllocator`] over the
//! exported `alloc` / `dealloc`, so the layout encoder in `safepath-abi` can
//! run directly against guest memory. Every guest call is refueled to the
//! configured limit first.

use std::fmt;

use tracing::debug;
use wasmtime::{
    Engine, Instance, Memory, Module, Store, StoreLimits, StoreLimitsBuilder, Trap, TypedFunc,
    WasmParams, WasmResults,
};

use safepath_abi::memory::validate_range;
use safepath_abi::{AbiError, GuestAddr, GuestAllocator, GuestMemory, Region};

use crate::config::GuestConfig;
use crate::error::SandboxError;
use crate::validation::MEMORY_EXPORT;

/// Per-store host data.
pub struct GuestState {
    limits: StoreLimits,
}

/// A single instantiated guest module.
pub struct GuestInstance {
    store: Store<GuestState>,
    memory: Memory,
    alloc: TypedFunc<u32, u32>,
    dealloc: TypedFunc<(u32, u32), ()>,
    interpolate: TypedFunc<(u32, u32), u32>,
    fuel_limit: u64,
}

impl GuestInstance {
    /// Instantiate `module` with no imports and resolve the ABI exports.
    ///
    /// The module must already have passed
    /// [`validate_module`](crate::validation::validate_module); typed lookups
    /// here still fail with `Bootstrap` rather than panicking if it did not.
    pub fn instantiate(
        engine: &Engine,
        module: &Module,
        config: &GuestConfig,
    ) -> Result<Self, SandboxError> {
        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes())
            .instances(1)
            .build();
        let mut store = Store::new(engine, GuestState { limits });
        store.limiter(|state| &mut state.limits);
        store.set_fuel(config.fuel_limit)?;

        let instance = Instance::new(&mut store, module, &[])
            .map_err(|e| SandboxError::Bootstrap(format!("instantiation failed: {:#}", e)))?;

        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or_else(|| SandboxError::Bootstrap("no memory export".into()))?;
        let alloc = resolve(&instance, &mut store, "alloc")?;
        let dealloc = resolve(&instance, &mut store, "dealloc")?;
        let interpolate = resolve(&instance, &mut store, "interpolate")?;

        Ok(Self {
            store,
            memory,
            alloc,
            dealloc,
            interpolate,
            fuel_limit: config.fuel_limit,
        })
    }

    /// Current linear memory size in pages.
    pub fn memory_pages(&self) -> u64 {
        self.memory.size(&self.store)
    }

    /// Call the guest's `interpolate(statics, dynamics)`.
    ///
    /// Returns the address of a guest-owned fat string reference. The host
    /// never releases it.
    pub fn call_interpolate(
        &mut self,
        statics: GuestAddr,
        dynamics: GuestAddr,
    ) -> Result<GuestAddr, SandboxError> {
        self.refuel()?;
        let result = self
            .interpolate
            .call(&mut self.store, (statics.as_u32(), dynamics.as_u32()))
            .map_err(classify_trap)?;
        debug!(%statics, %dynamics, result = %GuestAddr::new(result), "guest interpolate");
        Ok(GuestAddr::new(result))
    }

    fn call_alloc(&mut self, size: u32) -> Result<u32, SandboxError> {
        self.refuel()?;
        self.alloc.call(&mut self.store, size).map_err(classify_trap)
    }

    fn call_dealloc(&mut self, address: GuestAddr, size: u32) -> Result<(), SandboxError> {
        self.refuel()?;
        self.dealloc
            .call(&mut self.store, (address.as_u32(), size))
            .map_err(classify_trap)
    }

    fn refuel(&mut self) -> Result<(), SandboxError> {
        self.store.set_fuel(self.fuel_limit)?;
        Ok(())
    }
}

impl fmt::Debug for GuestInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuestInstance")
            .field("memory_pages", &self.memory_pages())
            .field("fuel_limit", &self.fuel_limit)
            .finish_non_exhaustive()
    }
}

impl GuestMemory for GuestInstance {
    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.data_mut(&mut self.store)
    }
}

impl GuestAllocator for GuestInstance {
    fn allocate(&mut self, size: u32) -> Result<Region, AbiError> {
        let raw = self
            .call_alloc(size)
            .map_err(|err| AbiError::Allocation {
                size,
                reason: err.to_string(),
            })?;

        let address = GuestAddr::new(raw);
        if address.is_null() {
            return Err(AbiError::Allocation {
                size,
                reason: "guest returned null (out of memory)".into(),
            });
        }
        validate_range(self.memory.data_size(&self.store), address, size).map_err(|_| {
            AbiError::Allocation {
                size,
                reason: format!("guest returned {} outside linear memory", address),
            }
        })?;

        debug!(%address, size, "guest alloc");
        Ok(Region::new(address, size))
    }

    fn release(&mut self, region: Region) -> Result<(), AbiError> {
        let (address, size) = (region.address(), region.size());
        self.call_dealloc(address, size)
            .map_err(|err| AbiError::Deallocation {
                address,
                size,
                reason: err.to_string(),
            })?;
        debug!(%address, size, "guest dealloc");
        Ok(())
    }
}

fn resolve<P, R>(
    instance: &Instance,
    store: &mut Store<GuestState>,
    name: &str,
) -> Result<TypedFunc<P, R>, SandboxError>
where
    P: WasmParams,
    R: WasmResults,
{
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|e| SandboxError::Bootstrap(format!("export '{}': {:#}", name, e)))
}

/// Convert a failed guest call into a `SandboxError`.
///
/// Fuel exhaustion → `SandboxError::FuelExhausted`
/// Other traps → `SandboxError::GuestTrapped`
pub(crate) fn classify_trap(err: anyhow::Error) -> SandboxError {
    match err.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => SandboxError::FuelExhausted,
        _ => SandboxError::GuestTrapped(format!("{:#}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instantiate(wat: &str, config: &GuestConfig) -> Result<GuestInstance, SandboxError> {
        let mut wasm_config = wasmtime::Config::new();
        wasm_config.consume_fuel(true);
        let engine = Engine::new(&wasm_config).unwrap();
        let module = Module::new(&engine, wat).unwrap();
        GuestInstance::instantiate(&engine, &module, config)
    }

    const NULL_ALLOC: &str = r#"
        (module
            (memory (export "memory") 1)
            (func (export "alloc") (param i32) (result i32)
                i32.const 0)
            (func (export "dealloc") (param i32 i32))
            (func (export "interpolate") (param i32 i32) (result i32)
                i32.const 0)
        )
    "#;

    const TRAPPING: &str = r#"
        (module
            (memory (export "memory") 1)
            (func (export "alloc") (param i32) (result i32)
                unreachable)
            (func (export "dealloc") (param i32 i32)
                unreachable)
            (func (export "interpolate") (param i32 i32) (result i32)
                (loop $spin (br $spin))
                i32.const 0)
        )
    "#;

    #[test]
    fn test_null_address_is_allocation_error() {
        let mut guest = instantiate(NULL_ALLOC, &GuestConfig::default()).unwrap();
        let err = guest.allocate(16).unwrap_err();
        assert!(matches!(err, AbiError::Allocation { size: 16, .. }));
    }

    #[test]
    fn test_alloc_trap_is_allocation_error() {
        let mut guest = instantiate(TRAPPING, &GuestConfig::default()).unwrap();
        let err = guest.allocate(16).unwrap_err();
        assert!(matches!(err, AbiError::Allocation { .. }));
    }

    #[test]
    fn test_dealloc_trap_is_deallocation_error() {
        let mut guest = instantiate(TRAPPING, &GuestConfig::default()).unwrap();
        let err = guest
            .release(Region::new(GuestAddr::new(8), 8))
            .unwrap_err();
        assert!(matches!(err, AbiError::Deallocation { size: 8, .. }));
    }

    #[test]
    fn test_spinning_guest_runs_out_of_fuel() {
        let config = GuestConfig {
            fuel_limit: 10_000,
            ..GuestConfig::default()
        };
        let mut guest = instantiate(TRAPPING, &config).unwrap();
        let err = guest
            .call_interpolate(GuestAddr::new(8), GuestAddr::new(16))
            .unwrap_err();
        assert!(matches!(err, SandboxError::FuelExhausted));
    }

    #[test]
    fn test_memory_view_matches_export() {
        let guest = instantiate(NULL_ALLOC, &GuestConfig::default()).unwrap();
        assert_eq!(guest.memory_pages(), 1);
        assert_eq!(guest.memory().len(), 65536);
    }

    #[test]
    fn test_initial_memory_above_limit_rejected() {
        let config = GuestConfig {
            max_memory_pages: 1,
            ..GuestConfig::default()
        };
        let wat = NULL_ALLOC.replace("(memory (export \"memory\") 1)", "(memory (export \"memory\") 2)");
        let err = instantiate(&wat, &config).unwrap_err();
        assert!(matches!(err, SandboxError::Bootstrap(_)));
    }
}
