//! Sandbox configuration.

/// Bytes in one WASM page.
pub const WASM_PAGE_SIZE: u64 = 65536;

/// Configuration for the guest instance.
///
/// Controls the linear memory cap and per-call instruction fuel.
#[derive(Debug, Clone)]
pub struct GuestConfig {
    /// Maximum linear memory pages (1 page = 64 KiB).
    /// Default: 256 pages = 16 MiB.
    pub max_memory_pages: u32,

    /// Wasmtime fuel granted to every guest call (alloc, dealloc,
    /// interpolate). A call that runs out fails with `FuelExhausted`.
    pub fuel_limit: u64,
}

impl GuestConfig {
    /// Linear memory cap in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_pages as u64 * WASM_PAGE_SIZE) as usize
    }
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            max_memory_pages: 256, // 16 MiB
            fuel_limit: 10_000_000,
        }
    }
}
