//! Core ABI types: guest addresses and owned regions.
//!
//! The guest is a 32-bit little-endian linear memory. Addresses handed out by
//! the guest are plain offsets into that memory; they carry no aliasing or
//! lifetime guarantees on the host side.

use std::fmt;

use crate::error::AbiError;

/// Width of one ABI word (`u32`) in bytes.
pub const WORD_SIZE: u32 = 4;

/// Size of an encoded string array header: `(array_base_address, count)`.
pub const HEADER_SIZE: u32 = 2 * WORD_SIZE;

/// Size of one fat string reference / table entry: `(address, length)`.
pub const ENTRY_SIZE: u32 = 2 * WORD_SIZE;

/// Address returned by the guest allocator when it is out of memory.
pub const NULL_ADDR: GuestAddr = GuestAddr(0);

/// An offset into guest linear memory.
///
/// Not a host pointer. All arithmetic goes through [`GuestAddr::offset`],
/// which fails instead of wrapping past the 32-bit address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GuestAddr(u32);

impl GuestAddr {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `self + by`, or `AbiError::LayoutOverflow` if it leaves the 32-bit space.
    pub fn offset(self, by: u32) -> Result<GuestAddr, AbiError> {
        self.0
            .checked_add(by)
            .map(GuestAddr)
            .ok_or(AbiError::LayoutOverflow)
    }
}

impl fmt::Display for GuestAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// A byte range of guest memory checked out for exclusive use.
///
/// A `Region` is a capability, valid only together with the guest memory it
/// came from and only until it is handed back to
/// [`GuestAllocator::release`](crate::GuestAllocator::release). It is neither
/// `Clone` nor `Copy`: releasing consumes it.
#[must_use = "a region must be released back to the guest allocator"]
#[derive(Debug, PartialEq, Eq)]
pub struct Region {
    address: GuestAddr,
    size: u32,
}

impl Region {
    /// Wrap an address returned by a guest allocator.
    ///
    /// Only allocator implementations should call this.
    pub fn new(address: GuestAddr, size: u32) -> Self {
        Self { address, size }
    }

    pub fn address(&self) -> GuestAddr {
        self.address
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// One past the last byte of the region.
    pub fn end(&self) -> Result<GuestAddr, AbiError> {
        self.address.offset(self.size)
    }

    /// Whether the byte ranges of two regions intersect.
    pub fn overlaps(&self, other: &Region) -> bool {
        let (a, b) = (self.address.as_u32() as u64, other.address.as_u32() as u64);
        a < b + other.size as u64 && b < a + self.size as u64
    }
}
