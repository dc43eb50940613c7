//! Shared test helpers for integration tests.
//!
//! Loads the fixture guest and reads the allocation ledger it keeps at the
//! start of linear memory: the live region count at address 8 and the live
//! byte total at address 12.

#![allow(dead_code)]

use std::sync::Arc;

use safepath_abi::memory::read_u32;
use safepath_abi::{GuestAddr, GuestMemory};
use safepath_sandbox::{GuestConfig, GuestContext, Interpolator};

/// Fixture guest implementing the interpolation ABI, as WAT text.
pub const GUEST_WAT: &str = include_str!("../fixtures/guest.wat");

const LIVE_COUNT_ADDR: u32 = 8;
const LIVE_BYTES_ADDR: u32 = 12;

// ── Context Loaders ──

/// Bootstrap the fixture guest with default config.
pub fn load_context() -> Arc<GuestContext> {
    load_context_with_config(GuestConfig::default())
}

/// Bootstrap the fixture guest with a custom GuestConfig.
pub fn load_context_with_config(config: GuestConfig) -> Arc<GuestContext> {
    GuestContext::bootstrap(GUEST_WAT.as_bytes(), &config)
        .expect("failed to bootstrap fixture guest")
}

/// Build an interpolator over a fresh fixture context.
pub fn interpolator(statics: &[&str]) -> Interpolator {
    Interpolator::new(load_context(), statics).expect("failed to create interpolator")
}

// ── Allocation Ledger ──

/// Number of host regions the guest currently considers live.
pub fn live_regions(context: &GuestContext) -> u32 {
    read_ledger(context, LIVE_COUNT_ADDR)
}

/// Total bytes across live host regions.
pub fn live_bytes(context: &GuestContext) -> u32 {
    read_ledger(context, LIVE_BYTES_ADDR)
}

fn read_ledger(context: &GuestContext, addr: u32) -> u32 {
    context
        .with_guest(|guest| Ok(read_u32(guest.memory(), GuestAddr::new(addr))?))
        .expect("failed to read guest ledger")
}

/// Encoded size of a string array: header, entry table, and data.
pub fn encoded_size(strings: &[&str]) -> u32 {
    let data: usize = strings.iter().map(|s| s.len()).sum();
    (8 + 8 * strings.len() + data) as u32
}
