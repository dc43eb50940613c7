//! Encoded string array layout.
//!
//! An ordered list of strings is passed to the guest as one contiguous
//! region:
//!
//! ```text
//! base + 0              [array_base: u32 = base + 8] [count: u32]
//! base + 8              [addr_0: u32] [len_0: u32]
//!                       ...
//! base + 8 + 8*count    bytes of s_0 | bytes of s_1 | ... | bytes of s_{n-1}
//! ```
//!
//! All addresses are absolute guest addresses and all lengths are UTF-8 byte
//! counts. Each table entry is itself a fat string reference.

use tracing::{debug, warn};

use crate::error::AbiError;
use crate::memory::{read_fat_ref, read_fat_str, write_bytes, write_fat_ref};
use crate::traits::{GuestAllocator, GuestMemory};
use crate::types::{GuestAddr, Region, ENTRY_SIZE, HEADER_SIZE};

/// Measured size of an encoded string array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayLayout {
    /// Number of strings.
    pub count: u32,
    /// Sum of the UTF-8 byte lengths of all strings.
    pub data_len: u32,
}

impl ArrayLayout {
    /// Measure `strings`, failing if the encoding cannot fit in `u32` space.
    pub fn measure<S: AsRef<str>>(strings: &[S]) -> Result<Self, AbiError> {
        let count = u32::try_from(strings.len()).map_err(|_| AbiError::LayoutOverflow)?;
        let data_len = strings.iter().try_fold(0u32, |acc, s| {
            u32::try_from(s.as_ref().len())
                .ok()
                .and_then(|len| acc.checked_add(len))
                .ok_or(AbiError::LayoutOverflow)
        })?;
        let layout = Self { count, data_len };
        layout.total_size()?;
        Ok(layout)
    }

    pub fn header_size(&self) -> u32 {
        HEADER_SIZE
    }

    pub fn table_size(&self) -> Result<u32, AbiError> {
        self.count
            .checked_mul(ENTRY_SIZE)
            .ok_or(AbiError::LayoutOverflow)
    }

    /// `8 + 8 * count + data_len`.
    pub fn total_size(&self) -> Result<u32, AbiError> {
        self.table_size()?
            .checked_add(HEADER_SIZE)
            .and_then(|size| size.checked_add(self.data_len))
            .ok_or(AbiError::LayoutOverflow)
    }
}

/// Allocate a guest region and encode `strings` into it.
///
/// The returned region is exactly [`ArrayLayout::total_size`] bytes and its
/// base address is what the guest expects as an array pointer. If writing
/// fails after allocation, the region is released before returning the error.
pub fn encode<G, S>(guest: &mut G, strings: &[S]) -> Result<Region, AbiError>
where
    G: GuestAllocator + GuestMemory + ?Sized,
    S: AsRef<str>,
{
    let layout = ArrayLayout::measure(strings)?;
    let region = guest.allocate(layout.total_size()?)?;

    match write_array(guest.memory_mut(), region.address(), strings) {
        Ok(()) => {
            debug!(
                address = %region.address(),
                size = region.size(),
                count = layout.count,
                "encoded string array"
            );
            Ok(region)
        }
        Err(err) => {
            let (address, size) = (region.address(), region.size());
            if let Err(release_err) = guest.release(region) {
                warn!(%address, size, error = %release_err, "failed to release region after encode error");
            }
            Err(err)
        }
    }
}

/// Write the header, entry table, and string bytes of an array at `base`.
///
/// The caller guarantees `[base, base + total_size)` is owned and in bounds.
pub fn write_array<S: AsRef<str>>(
    mem: &mut [u8],
    base: GuestAddr,
    strings: &[S],
) -> Result<(), AbiError> {
    let layout = ArrayLayout::measure(strings)?;
    let table = base.offset(HEADER_SIZE)?;
    write_fat_ref(mem, base, table, layout.count)?;

    let mut cursor = table.offset(layout.table_size()?)?;
    for (i, s) in strings.iter().enumerate() {
        let bytes = s.as_ref().as_bytes();
        // measure() already proved every length and index fits in u32
        let len = bytes.len() as u32;
        let slot = table.offset(i as u32 * ENTRY_SIZE)?;
        write_fat_ref(mem, slot, cursor, len)?;
        write_bytes(mem, cursor, bytes)?;
        cursor = cursor.offset(len)?;
    }
    Ok(())
}

/// Decode the encoded string array whose header is at `base`.
pub fn decode_array(mem: &[u8], base: GuestAddr) -> Result<Vec<String>, AbiError> {
    let (table, count) = read_fat_ref(mem, base)?;
    (0..count)
        .map(|i| {
            let slot = ENTRY_SIZE
                .checked_mul(i)
                .ok_or(AbiError::LayoutOverflow)
                .and_then(|off| table.offset(off))?;
            read_fat_str(mem, slot)
        })
        .collect()
}
