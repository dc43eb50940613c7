//! ABI-level error types.
//!
//! `AbiError` covers everything that can go wrong while moving bytes across
//! the host/guest boundary: out-of-range access, layouts that do not fit in a
//! 32-bit address space, allocator failures, and invalid UTF-8 coming back
//! from the guest.

use std::string::FromUtf8Error;

use crate::types::GuestAddr;

#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    /// `[address, address + len)` is not inside guest linear memory.
    #[error("out-of-bounds guest access at {address} (len {len})")]
    OutOfBounds { address: GuestAddr, len: u32 },

    /// A string array is too large to be addressed with 32-bit offsets.
    #[error("layout does not fit in a 32-bit address space")]
    LayoutOverflow,

    /// The guest allocator trapped or reported exhaustion.
    #[error("guest allocation of {size} bytes failed: {reason}")]
    Allocation { size: u32, reason: String },

    /// The guest deallocator trapped, or rejected the region.
    #[error("guest deallocation of {size} bytes at {address} failed: {reason}")]
    Deallocation {
        address: GuestAddr,
        size: u32,
        reason: String,
    },

    /// The guest produced bytes that are not valid UTF-8.
    #[error("guest string is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}

impl AbiError {
    /// Create an out-of-bounds error for `len` bytes at `address`.
    pub fn out_of_bounds(address: GuestAddr, len: u32) -> Self {
        Self::OutOfBounds { address, len }
    }
}
