//! Seams between the ABI layer and a concrete guest runtime.
//!
//! A runtime (wasmtime in `safepath-sandbox`, or [`MemGuest`](crate::MemGuest)
//! in tests) exposes its linear memory as a byte slice and its allocator as a
//! pair of allocate/release calls. Everything in [`memory`](crate::memory) and
//! [`layout`](crate::layout) is written against these two traits.

use crate::error::AbiError;
use crate::types::Region;

/// Byte-slice view of a guest's linear memory.
pub trait GuestMemory {
    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];
}

/// The guest's exported allocator.
///
/// Ownership of the returned [`Region`] passes to the caller until it is
/// moved back into [`release`](GuestAllocator::release). Implementations do
/// not need to detect double frees: the region is consumed on release, and
/// the guest owns the pool behind it.
pub trait GuestAllocator {
    /// Allocate exactly `size` bytes of guest memory.
    ///
    /// Failure leaves every previously returned region untouched.
    fn allocate(&mut self, size: u32) -> Result<Region, AbiError>;

    /// Return a region to the guest with its original address and size.
    fn release(&mut self, region: Region) -> Result<(), AbiError>;
}
