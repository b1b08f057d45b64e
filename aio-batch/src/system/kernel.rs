//! The seam between the engine and the kernel's asynchronous I/O facility.
//!
//! [`Kernel`] is the narrow interface the submission and completion paths are
//! written against: hand a batch of requests over in one call, block for
//! completions, release the handle. [`aio::LinuxAio`] implements it with the
//! `io_setup(2)` family of system calls.

use std::{io, os::fd::RawFd};

pub mod aio;
pub(crate) mod aio_abi;

/// One request, in the kernel-neutral layout [`Kernel::submit`] receives.
///
/// `user_data` is opaque to the kernel and comes back unchanged in the
/// matching [`Completion`].
#[derive(Debug, Clone, Copy)]
pub struct Request {
    pub(crate) user_data: u64,
    pub(crate) opcode: u16,
    pub(crate) fd: RawFd,
    pub(crate) buf: *mut u8,
    pub(crate) len: usize,
    pub(crate) offset: u64,
}

/// One completion record as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub(crate) user_data: u64,
    /// Bytes transferred, or a negated errno.
    pub(crate) result: i64,
}

/// A kernel-level queueing handle.
///
/// Sealed: the engine's safety argument relies on the contracts below.
pub trait Kernel: crate::sealed::Sealed {
    /// Hand all of `batch` to the kernel in one call.
    ///
    /// Returns how many requests the kernel accepted, in order from the front
    /// of `batch`. On `Err`, the kernel accepted none of them.
    fn submit(&mut self, batch: &[Request]) -> io::Result<usize>;

    /// Block, without timeout, until at least `min` completions are ready, then
    /// append between `min` and `max` of them to `out`.
    fn get_events(&mut self, min: usize, max: usize, out: &mut Vec<Completion>)
        -> io::Result<()>;

    /// Release the handle. Requests still in flight are cancelled or waited for
    /// by the kernel before this returns successfully.
    fn destroy(&mut self) -> io::Result<()>;
}
