use std::{
    os::fd::{AsRawFd, OwnedFd, RawFd},
    sync::Arc,
};

/// A file-descriptor-wrapping type the engine can hold while the kernel uses the fd.
///
/// This trait is implemented by types that keep a file descriptor open for as
/// long as they are alive.
///
/// Think of this as [`crate::buf::IoBuf`], but for file descriptors.
pub trait IoFd: Unpin + 'static {
    /// # Safety
    ///
    /// The implementation must ensure that, while the engine
    /// owns the value, the fd returned by this method
    /// 1. remains valid (i.e., is not closed),
    /// 2. points to the same kernel resource.
    unsafe fn as_fd(&self) -> RawFd;
}

impl IoFd for OwnedFd {
    unsafe fn as_fd(&self) -> RawFd {
        // SAFETY: `OwnedFd` is the definition of the requirements in the trait method.
        self.as_raw_fd()
    }
}

impl IoFd for std::fs::File {
    unsafe fn as_fd(&self) -> RawFd {
        // SAFETY: `File` is the definition of the requirements in the trait method.
        self.as_raw_fd()
    }
}

/// Many queued operations against one file share it through an `Arc`; the fd
/// stays open until the last of them is harvested and dropped.
impl<T: IoFd> IoFd for Arc<T> {
    unsafe fn as_fd(&self) -> RawFd {
        (**self).as_fd()
    }
}
