//! Raw memory through the public API

use memory_manager::{UnsafeHeap, UnsafeHeapError};

#[test]
fn test_values_are_big_endian() {
    let mut heap = UnsafeHeap::new();
    let base = heap.allocate(8);
    heap.write_i32(base, 0x0a0b_0c0d).unwrap();
    assert_eq!(heap.get(base).unwrap()[..4], [0x0a, 0x0b, 0x0c, 0x0d]);
    heap.write_i8(base + 3, -1).unwrap();
    assert_eq!(heap.read_i32(base).unwrap(), 0x0a0b_0cff);
}

#[test]
fn test_freed_memory_is_unreachable() {
    let mut heap = UnsafeHeap::new();
    let base = heap.allocate(8);
    heap.free(base).unwrap();
    assert_eq!(heap.read_i64(base), Err(UnsafeHeapError::InvalidOffset(base)));
    assert_eq!(heap.free(base), Err(UnsafeHeapError::InvalidOffset(base)));
    assert_eq!(heap.allocations(), 0);
    assert_eq!(UnsafeHeapError::InvalidOffset(3).to_string(), "Invalid offset: 3");
}

#[test]
fn test_access_cannot_cross_into_next_allocation() {
    let mut heap = UnsafeHeap::new();
    let first = heap.allocate(4);
    let second = heap.allocate(4);
    assert_eq!(second, 4);
    assert!(heap.write_i64(first, 1).is_err());
    assert_eq!(heap.read_i32(second).unwrap(), 0);
}
