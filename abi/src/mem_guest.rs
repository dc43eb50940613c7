//! In-memory guest for testing.
//!
//! `MemGuest` implements [`GuestMemory`] and [`GuestAllocator`] over a plain
//! `Vec<u8>` so the layout encoder and accessors can be exercised without a
//! WASM runtime. Allocation is bump-pointer style with 8-byte alignment;
//! address 0 is never handed out, matching the guest's null sentinel. Unlike a
//! real guest, it keeps a ledger of live regions and rejects releases that do
//! not match one exactly.

use std::collections::BTreeMap;

use crate::error::AbiError;
use crate::traits::{GuestAllocator, GuestMemory};
use crate::types::{GuestAddr, Region};

/// First address handed out; `[0, 8)` stays reserved for null.
const HEAP_BASE: u32 = 8;

fn align8(size: u32) -> Option<u32> {
    size.checked_add(7).map(|s| s & !7)
}

/// Vec-backed guest memory with a bump allocator and a live-region ledger.
#[derive(Debug, Clone)]
pub struct MemGuest {
    memory: Vec<u8>,
    bump: u32,
    live: BTreeMap<GuestAddr, u32>,
}

impl MemGuest {
    /// Create a guest with `capacity` bytes of linear memory.
    pub fn new(capacity: u32) -> Self {
        Self {
            memory: vec![0; capacity as usize],
            bump: HEAP_BASE,
            live: BTreeMap::new(),
        }
    }

    /// Number of regions allocated and not yet released.
    pub fn live_regions(&self) -> usize {
        self.live.len()
    }

    /// Total size of all live regions, in bytes.
    pub fn live_bytes(&self) -> u64 {
        self.live.values().map(|&size| size as u64).sum()
    }

    /// Whether `[address, address + size)` is a live allocation.
    pub fn is_live(&self, address: GuestAddr, size: u32) -> bool {
        self.live.get(&address) == Some(&size)
    }
}

impl GuestMemory for MemGuest {
    fn memory(&self) -> &[u8] {
        &self.memory
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        &mut self.memory
    }
}

impl GuestAllocator for MemGuest {
    fn allocate(&mut self, size: u32) -> Result<Region, AbiError> {
        let end = align8(size.max(1))
            .and_then(|aligned| self.bump.checked_add(aligned))
            .filter(|&end| end as usize <= self.memory.len())
            .ok_or_else(|| AbiError::Allocation {
                size,
                reason: "out of memory".into(),
            })?;

        let address = GuestAddr::new(self.bump);
        self.bump = end;
        self.live.insert(address, size);
        Ok(Region::new(address, size))
    }

    fn release(&mut self, region: Region) -> Result<(), AbiError> {
        match self.live.get(&region.address()) {
            Some(&size) if size == region.size() => {
                self.live.remove(&region.address());
                Ok(())
            }
            Some(&size) => Err(AbiError::Deallocation {
                address: region.address(),
                size: region.size(),
                reason: format!("region was allocated with size {}", size),
            }),
            None => Err(AbiError::Deallocation {
                address: region.address(),
                size: region.size(),
                reason: "not a live allocation".into(),
            }),
        }
    }
}
