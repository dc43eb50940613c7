//! Bounds-checked reads and writes against guest linear memory.
//!
//! Every function takes the guest memory as a plain byte slice plus a
//! [`GuestAddr`], and validates the range before touching it. Integers are
//! 32-bit little-endian, matching the guest ABI.

use crate::error::AbiError;
use crate::types::{GuestAddr, WORD_SIZE};

/// Validate that `[addr, addr + len)` lies within a memory of `mem_len` bytes.
///
/// Returns the range as host `usize` indices.
pub fn validate_range(
    mem_len: usize,
    addr: GuestAddr,
    len: u32,
) -> Result<std::ops::Range<usize>, AbiError> {
    let start = addr.as_usize();
    let end = start
        .checked_add(len as usize)
        .ok_or_else(|| AbiError::out_of_bounds(addr, len))?;
    if end > mem_len {
        return Err(AbiError::out_of_bounds(addr, len));
    }
    Ok(start..end)
}

/// Read `len` bytes from guest memory at `addr`.
pub fn read_bytes(mem: &[u8], addr: GuestAddr, len: u32) -> Result<Vec<u8>, AbiError> {
    let range = validate_range(mem.len(), addr, len)?;
    Ok(mem[range].to_vec())
}

/// Copy `data` into guest memory at `addr`.
pub fn write_bytes(mem: &mut [u8], addr: GuestAddr, data: &[u8]) -> Result<(), AbiError> {
    let len = u32::try_from(data.len()).map_err(|_| AbiError::LayoutOverflow)?;
    let range = validate_range(mem.len(), addr, len)?;
    mem[range].copy_from_slice(data);
    Ok(())
}

/// Read a little-endian `u32` at `addr`.
pub fn read_u32(mem: &[u8], addr: GuestAddr) -> Result<u32, AbiError> {
    let range = validate_range(mem.len(), addr, WORD_SIZE)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(&mem[range]);
    Ok(u32::from_le_bytes(word))
}

/// Write a little-endian `u32` at `addr`.
pub fn write_u32(mem: &mut [u8], addr: GuestAddr, value: u32) -> Result<(), AbiError> {
    write_bytes(mem, addr, &value.to_le_bytes())
}

/// Read the `(data_address, data_length)` pair stored at `addr`.
pub fn read_fat_ref(mem: &[u8], addr: GuestAddr) -> Result<(GuestAddr, u32), AbiError> {
    let data = read_u32(mem, addr)?;
    let len = read_u32(mem, addr.offset(WORD_SIZE)?)?;
    Ok((GuestAddr::new(data), len))
}

/// Write a `(data_address, data_length)` pair at `addr`.
pub fn write_fat_ref(
    mem: &mut [u8],
    addr: GuestAddr,
    data: GuestAddr,
    len: u32,
) -> Result<(), AbiError> {
    write_u32(mem, addr, data.as_u32())?;
    write_u32(mem, addr.offset(WORD_SIZE)?, len)
}

/// Decode the fat string reference stored at `addr` into an owned `String`.
///
/// Invalid UTF-8 is `AbiError::Encoding`; the guest never emits it unless its
/// memory has been corrupted.
pub fn read_fat_str(mem: &[u8], addr: GuestAddr) -> Result<String, AbiError> {
    let (data, len) = read_fat_ref(mem, addr)?;
    let bytes = read_bytes(mem, data, len)?;
    Ok(String::from_utf8(bytes)?)
}
