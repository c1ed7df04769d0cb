//! Raw memory backing `sun/misc/Unsafe`.
//!
//! A bump allocator over zeroed byte buffers. Offsets grow monotonically and
//! are never handed out twice, even after `free`.

use std::collections::BTreeMap;
use thiserror::Error;

/// Raw memory access failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnsafeHeapError {
    /// No live allocation starts at (or contains) this offset
    #[error("Invalid offset: {0}")]
    InvalidOffset(i64),

    /// The access runs past the end of its allocation
    #[error("access of {width} bytes at {address} runs past the end of its allocation")]
    OutOfRange {
        /// Address of the access
        address: i64,
        /// Access width in bytes
        width: usize,
    },
}

/// Bump-allocated raw byte buffers keyed by start offset.
///
/// # Examples
///
/// ```
/// use memory_manager::UnsafeHeap;
///
/// let mut heap = UnsafeHeap::new();
/// let a = heap.allocate(16);
/// let b = heap.allocate(16);
/// assert_eq!((a, b), (0, 16));
///
/// heap.write_i64(a, 0x0102_0304_0506_0708).unwrap();
/// assert_eq!(heap.read_i8(a).unwrap(), 0x01);
///
/// heap.free(a).unwrap();
/// assert!(heap.get(a).is_err());
/// assert!(heap.get(b).is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct UnsafeHeap {
    buffers: BTreeMap<i64, Vec<u8>>,
    key: i64,
    size: i64,
}

impl UnsafeHeap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `size` zeroed bytes, returning their offset
    pub fn allocate(&mut self, size: usize) -> i64 {
        let offset = self.key;
        self.buffers.insert(offset, vec![0; size]);
        self.key += size as i64;
        self.size += size as i64;
        offset
    }

    /// Buffer allocated at exactly `offset`
    pub fn get(&self, offset: i64) -> Result<&[u8], UnsafeHeapError> {
        self.buffers
            .get(&offset)
            .map(Vec::as_slice)
            .ok_or(UnsafeHeapError::InvalidOffset(offset))
    }

    /// Buffer allocated at exactly `offset`, mutably
    pub fn get_mut(&mut self, offset: i64) -> Result<&mut [u8], UnsafeHeapError> {
        self.buffers
            .get_mut(&offset)
            .map(Vec::as_mut_slice)
            .ok_or(UnsafeHeapError::InvalidOffset(offset))
    }

    /// Release the allocation at `offset`
    pub fn free(&mut self, offset: i64) -> Result<(), UnsafeHeapError> {
        let buffer = self
            .buffers
            .remove(&offset)
            .ok_or(UnsafeHeapError::InvalidOffset(offset))?;
        self.size -= buffer.len() as i64;
        Ok(())
    }

    /// Bytes currently allocated
    pub fn size(&self) -> i64 {
        self.size
    }

    /// Number of live allocations
    pub fn allocations(&self) -> usize {
        self.buffers.len()
    }

    /// Slice of `width` bytes at an arbitrary address inside an allocation
    fn span(&self, address: i64, width: usize) -> Result<&[u8], UnsafeHeapError> {
        let (base, buffer) = self
            .buffers
            .range(..=address)
            .next_back()
            .ok_or(UnsafeHeapError::InvalidOffset(address))?;
        let start = (address - base) as usize;
        if start >= buffer.len() && width > 0 {
            return Err(UnsafeHeapError::InvalidOffset(address));
        }
        buffer
            .get(start..start + width)
            .ok_or(UnsafeHeapError::OutOfRange { address, width })
    }

    fn span_mut(&mut self, address: i64, width: usize) -> Result<&mut [u8], UnsafeHeapError> {
        let (base, buffer) = self
            .buffers
            .range_mut(..=address)
            .next_back()
            .ok_or(UnsafeHeapError::InvalidOffset(address))?;
        let start = (address - base) as usize;
        if start >= buffer.len() && width > 0 {
            return Err(UnsafeHeapError::InvalidOffset(address));
        }
        buffer
            .get_mut(start..start + width)
            .ok_or(UnsafeHeapError::OutOfRange { address, width })
    }

    /// Read a byte
    pub fn read_i8(&self, address: i64) -> Result<i8, UnsafeHeapError> {
        Ok(self.span(address, 1)?[0] as i8)
    }

    /// Write a byte
    pub fn write_i8(&mut self, address: i64, value: i8) -> Result<(), UnsafeHeapError> {
        self.span_mut(address, 1)?[0] = value as u8;
        Ok(())
    }

    /// Read a big-endian int
    pub fn read_i32(&self, address: i64) -> Result<i32, UnsafeHeapError> {
        let mut bytes = [0; 4];
        bytes.copy_from_slice(self.span(address, 4)?);
        Ok(i32::from_be_bytes(bytes))
    }

    /// Write a big-endian int
    pub fn write_i32(&mut self, address: i64, value: i32) -> Result<(), UnsafeHeapError> {
        self.span_mut(address, 4)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    /// Read a big-endian long
    pub fn read_i64(&self, address: i64) -> Result<i64, UnsafeHeapError> {
        let mut bytes = [0; 8];
        bytes.copy_from_slice(self.span(address, 8)?);
        Ok(i64::from_be_bytes(bytes))
    }

    /// Write a big-endian long
    pub fn write_i64(&mut self, address: i64, value: i64) -> Result<(), UnsafeHeapError> {
        self.span_mut(address, 8)?.copy_from_slice(&value.to_be_bytes());
        Ok(())
    }
}
