//! Heap buffer with a caller-chosen alignment, for `O_DIRECT` I/O.
//!
//! With `O_DIRECT`, the kernel rejects requests whose buffer address, length
//! or file offset are not multiples of the device's logical block size
//! (`EINVAL` at submission time). `Vec<u8>` only guarantees alignment 1.

use std::{
    alloc::{self, Layout},
    ptr::NonNull,
};

use crate::buf::{IoBuf, IoBufMut};

/// Logical block size of nearly every block device in use today.
pub const DEFAULT_ALIGNMENT: usize = 4096;

/// A fixed-capacity, zero-initialized allocation aligned to `alignment` bytes.
///
/// Capacity is rounded up to a multiple of the alignment. `len` is the number
/// of initialized bytes that a write will transfer; a read may fill up to the
/// full capacity.
pub struct AlignedBuf {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// SAFETY: `AlignedBuf` uniquely owns its allocation, like `Vec<u8>`.
unsafe impl Send for AlignedBuf {}
// SAFETY: shared access only hands out `&[u8]`.
unsafe impl Sync for AlignedBuf {}

impl AlignedBuf {
    /// Allocate a zeroed buffer of at least `capacity` bytes, with `len == 0`.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn with_capacity(capacity: usize, alignment: usize) -> Self {
        assert!(
            alignment.is_power_of_two(),
            "alignment must be a power of two: {alignment}"
        );
        let size = round_up(capacity.max(1), alignment);
        let layout = Layout::from_size_align(size, alignment).expect("size fits isize");
        // SAFETY: `layout` has non-zero size.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            alloc::handle_alloc_error(layout);
        };
        AlignedBuf {
            ptr,
            len: 0,
            layout,
        }
    }

    /// A buffer of `len` bytes, every one set to `byte`.
    pub fn filled(len: usize, alignment: usize, byte: u8) -> Self {
        let mut buf = Self::with_capacity(len, alignment);
        // SAFETY: capacity >= len and the allocation is zero-initialized.
        unsafe {
            std::ptr::write_bytes(buf.ptr.as_ptr(), byte, len);
        }
        buf.len = len;
        buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.layout.size()
    }

    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// The initialized bytes.
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the first `len` bytes are initialized and owned by `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as in `as_slice`, and `&mut self` guarantees exclusivity.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Forget the contents, keeping the allocation.
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

impl Drop for AlignedBuf {
    fn drop(&mut self) {
        // SAFETY: allocated in `with_capacity` with this exact layout.
        unsafe { alloc::dealloc(self.ptr.as_ptr(), self.layout) }
    }
}

impl std::fmt::Debug for AlignedBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBuf")
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("alignment", &self.alignment())
            .finish()
    }
}

impl AsRef<[u8]> for AlignedBuf {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

unsafe impl IoBuf for AlignedBuf {
    fn stable_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    fn bytes_init(&self) -> usize {
        self.len
    }

    fn bytes_total(&self) -> usize {
        self.capacity()
    }
}

unsafe impl IoBufMut for AlignedBuf {
    fn stable_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    unsafe fn set_init(&mut self, pos: usize) {
        if self.len < pos {
            self.len = pos;
        }
    }
}

fn round_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}
