//! `safepath-abi` — guest ABI layer for the safepath path interpolator.
//!
//! This crate describes how the host talks to the interpolation guest
//! without depending on any particular WASM runtime. It provides:
//!
//! - `GuestAddr` / `Region`: 32-bit guest offsets and owned byte ranges
//! - `memory`: bounds-checked little-endian accessors and fat string reads
//! - `layout`: the encoded string array format (`encode` / `decode_array`)
//! - `GuestMemory` / `GuestAllocator`: the seams a runtime implements
//! - `MemGuest`: a `Vec<u8>`-backed guest for testing
//! - `AbiError`: everything that can go wrong crossing the boundary

pub mod error;
pub mod types;
pub mod traits;
pub mod memory;
pub mod layout;
pub mod mem_guest;

// Re-export commonly used types at the crate root.
pub use error::AbiError;
pub use types::{GuestAddr, Region, ENTRY_SIZE, HEADER_SIZE, NULL_ADDR, WORD_SIZE};
pub use traits::{GuestAllocator, GuestMemory};
pub use layout::{decode_array, encode, ArrayLayout};
pub use mem_guest::MemGuest;
