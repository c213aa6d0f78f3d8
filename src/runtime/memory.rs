//! Linear memory
//!
//! A contiguous, growable byte buffer addressed by byte offset. Every access is
//! bounds-checked; an access that does not fit inside the buffer raises
//! [`RuntimeError::OutOfRangeMemoryAccess`]. Multi-byte values are stored
//! little-endian. Alignment is never enforced.

use super::RuntimeError;
use byteorder::{ByteOrder, LittleEndian};

/// Page size in bytes (64KB)
pub const PAGE_SIZE: usize = 65536;

/// Maximum number of pages (2^16 pages = 4GB total)
pub const MAX_PAGES: u32 = 65536;

/// Maximum memory size in bytes (4GB)
pub const MAX_MEMORY_SIZE: usize = MAX_PAGES as usize * PAGE_SIZE;

#[derive(Debug, Clone)]
pub struct Memory {
    data: Vec<u8>,
}

macro_rules! rw_le {
    ($read:ident, $write:ident, $ty:ty, $len:expr) => {
        pub fn $read(&self, addr: u64) -> Result<$ty, RuntimeError> {
            let start = self.check_bounds(addr, $len)?;
            Ok(LittleEndian::$read(&self.data[start..start + $len]))
        }

        pub fn $write(&mut self, addr: u64, value: $ty) -> Result<(), RuntimeError> {
            let start = self.check_bounds(addr, $len)?;
            LittleEndian::$write(&mut self.data[start..start + $len], value);
            Ok(())
        }
    };
}

impl Memory {
    /// Create a zero-filled memory of `initial_bytes`
    ///
    /// The size is normally a multiple of [`PAGE_SIZE`] but need not be.
    pub fn new(initial_bytes: usize) -> Result<Self, RuntimeError> {
        if initial_bytes > MAX_MEMORY_SIZE {
            return Err(RuntimeError::MemoryError(format!(
                "Initial memory size {initial_bytes} bytes exceeds maximum {MAX_MEMORY_SIZE} bytes"
            )));
        }
        Ok(Memory {
            data: vec![0u8; initial_bytes],
        })
    }

    /// Current size in whole pages
    pub fn size(&self) -> u32 {
        (self.data.len() / PAGE_SIZE) as u32
    }

    /// Current size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append `delta_pages` zero-filled pages
    ///
    /// Returns the page count before growth, or `None` (leaving memory untouched)
    /// if the result would exceed the 32-bit address space or cannot be allocated.
    pub fn grow(&mut self, delta_pages: u32) -> Option<u32> {
        let previous = self.size();
        let extra = (delta_pages as usize).checked_mul(PAGE_SIZE)?;
        let new_len = self.data.len().checked_add(extra)?;
        if new_len > MAX_MEMORY_SIZE {
            return None;
        }
        self.data.try_reserve(extra).ok()?;
        self.data.resize(new_len, 0);
        Some(previous)
    }

    /// Check that `len` bytes starting at `addr` lie inside the buffer
    #[inline]
    fn check_bounds(&self, addr: u64, len: usize) -> Result<usize, RuntimeError> {
        let out_of_range = || RuntimeError::OutOfRangeMemoryAccess {
            address: addr,
            length: len,
            size: self.data.len(),
        };
        let start = usize::try_from(addr).map_err(|_| out_of_range())?;
        let end = start.checked_add(len).ok_or_else(out_of_range)?;
        if end > self.data.len() {
            return Err(out_of_range());
        }
        Ok(start)
    }

    pub fn read_u8(&self, addr: u64) -> Result<u8, RuntimeError> {
        let start = self.check_bounds(addr, 1)?;
        Ok(self.data[start])
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 1)?;
        self.data[start] = value;
        Ok(())
    }

    rw_le!(read_u16, write_u16, u16, 2);
    rw_le!(read_u32, write_u32, u32, 4);
    rw_le!(read_u64, write_u64, u64, 8);
    rw_le!(read_f32, write_f32, f32, 4);
    rw_le!(read_f64, write_f64, f64, 8);

    pub fn read_i8(&self, addr: u64) -> Result<i8, RuntimeError> {
        Ok(self.read_u8(addr)? as i8)
    }

    pub fn read_i16(&self, addr: u64) -> Result<i16, RuntimeError> {
        Ok(self.read_u16(addr)? as i16)
    }

    pub fn read_i32(&self, addr: u64) -> Result<i32, RuntimeError> {
        Ok(self.read_u32(addr)? as i32)
    }

    pub fn read_i64(&self, addr: u64) -> Result<i64, RuntimeError> {
        Ok(self.read_u64(addr)? as i64)
    }

    /// Copy `len` bytes out of memory
    pub fn read_bytes(&self, addr: u64, len: usize) -> Result<&[u8], RuntimeError> {
        let start = self.check_bounds(addr, len)?;
        Ok(&self.data[start..start + len])
    }

    /// Copy a byte slice into memory; nothing is written if it does not fit
    pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let mem = Memory::new(PAGE_SIZE).unwrap();
        assert_eq!(mem.size(), 1);
        assert_eq!(mem.len(), PAGE_SIZE);
        assert!(mem.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_new_rejects_oversize() {
        assert!(matches!(
            Memory::new(MAX_MEMORY_SIZE + 1),
            Err(RuntimeError::MemoryError(_))
        ));
    }

    #[test]
    fn test_partial_page_size() {
        let mem = Memory::new(100).unwrap();
        assert_eq!(mem.size(), 0);
        assert_eq!(mem.len(), 100);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut mem = Memory::new(PAGE_SIZE).unwrap();
        mem.write_u32(0, 0x12345678).unwrap();
        assert_eq!(mem.read_bytes(0, 4).unwrap(), &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(mem.read_u16(0).unwrap(), 0x5678);
        assert_eq!(mem.read_u8(3).unwrap(), 0x12);

        mem.write_u64(8, 0x0102030405060708).unwrap();
        assert_eq!(mem.read_u8(8).unwrap(), 0x08);
        assert_eq!(mem.read_u64(8).unwrap(), 0x0102030405060708);
    }

    #[test]
    fn test_signed_reads() {
        let mut mem = Memory::new(PAGE_SIZE).unwrap();
        mem.write_u8(0, 0xff).unwrap();
        mem.write_u8(1, 0xff).unwrap();
        assert_eq!(mem.read_i8(0).unwrap(), -1);
        assert_eq!(mem.read_i16(0).unwrap(), -1);
        assert_eq!(mem.read_u16(0).unwrap(), 0xffff);
    }

    #[test]
    fn test_f64_round_trip_bits() {
        let mut mem = Memory::new(PAGE_SIZE).unwrap();
        for value in [2.0, -0.0, f64::NAN, f64::INFINITY, 0.1, f64::MIN_POSITIVE] {
            mem.write_f64(22, value).unwrap();
            assert_eq!(mem.read_f64(22).unwrap().to_bits(), value.to_bits());
        }
    }

    #[test]
    fn test_bounds() {
        let mut mem = Memory::new(PAGE_SIZE).unwrap();
        assert!(mem.read_u64((PAGE_SIZE - 8) as u64).is_ok());

        match mem.read_u64((PAGE_SIZE - 7) as u64) {
            Err(RuntimeError::OutOfRangeMemoryAccess { address, length, size }) => {
                assert_eq!(address, (PAGE_SIZE - 7) as u64);
                assert_eq!(length, 8);
                assert_eq!(size, PAGE_SIZE);
            }
            other => panic!("expected out of range access, got {other:?}"),
        }
        assert!(mem.write_u8(PAGE_SIZE as u64, 1).is_err());
        assert!(mem.read_u32(u64::MAX).is_err());
    }

    #[test]
    fn test_write_bytes_is_all_or_nothing() {
        let mut mem = Memory::new(16).unwrap();
        assert!(mem.write_bytes(14, &[1, 2, 3]).is_err());
        assert_eq!(mem.read_bytes(14, 2).unwrap(), &[0, 0]);

        mem.write_bytes(13, &[1, 2, 3]).unwrap();
        assert_eq!(mem.read_bytes(13, 3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_grow_preserves_content() {
        let mut mem = Memory::new(PAGE_SIZE).unwrap();
        mem.write_f64(42, 3.0).unwrap();

        assert_eq!(mem.grow(2), Some(1));
        assert_eq!(mem.size(), 3);
        assert_eq!(mem.len(), 3 * PAGE_SIZE);
        assert_eq!(mem.read_f64(42).unwrap(), 3.0);
        assert_eq!(mem.read_u8((3 * PAGE_SIZE - 1) as u64).unwrap(), 0);

        assert_eq!(mem.grow(0), Some(3));
        assert_eq!(mem.size(), 3);
    }

    #[test]
    fn test_grow_beyond_address_space() {
        let mut mem = Memory::new(PAGE_SIZE).unwrap();
        assert_eq!(mem.grow(MAX_PAGES), None);
        assert_eq!(mem.grow(u32::MAX), None);
        assert_eq!(mem.size(), 1);
    }
}
