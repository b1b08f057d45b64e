//! The [`AsyncContext`] handle and its queueing operations.

use std::{cell::Cell, collections::VecDeque, marker::PhantomData};

use aio_common::{
    buf::{IoBuf, IoBufMut},
    io_fd::IoFd,
};

use crate::{
    metrics::MetricsStorage,
    ops::Operation,
    system::{
        kernel::{aio::LinuxAio, Kernel},
        slots::Slots,
    },
};

/// Owned handle to one kernel AIO context plus the requests queued against it.
///
/// `F` is the file handle type, `B` the buffer type of the queued operations.
/// Use `Arc<File>` / `Arc<B>` to direct many operations at one file or to write
/// one buffer many times.
///
/// This handle is [`Send`] (if `F` and `B` are) but neither [`Sync`] nor
/// [`Clone`]; every operation takes `&mut self`.
///
/// Dropping the handle releases the kernel context. On Linux, `io_destroy(2)`
/// waits for requests that are still in flight, so buffers are not freed under
/// the kernel's feet; it is still better to harvest everything first.
pub struct AsyncContext<F, B, K = LinuxAio>
where
    F: IoFd,
    B: IoBuf,
    K: Kernel,
{
    pub(crate) id: usize,
    pub(crate) queue_depth: usize,
    pub(crate) inflight_requests: usize,
    pub(crate) pending: VecDeque<Operation<F, B>>,
    pub(crate) slots: Slots<F, B>,
    pub(crate) kernel: K,
    pub(crate) metrics: &'static MetricsStorage,
    pub(super) _not_sync: PhantomData<Cell<()>>,
}

impl<F, B, K> AsyncContext<F, B, K>
where
    F: IoFd,
    B: IoBuf,
    K: Kernel,
{
    /// Maximum number of requests in flight at once, fixed at construction.
    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Requests the kernel has accepted and whose completion hasn't been collected yet.
    pub fn inflight_requests(&self) -> usize {
        self.inflight_requests
    }

    /// How many more requests the next [`Self::submit_requests`] may hand to the kernel.
    pub fn remaining_queue_depth(&self) -> usize {
        self.queue_depth - self.inflight_requests
    }

    /// Queued operations not yet handed to the kernel, oldest first.
    pub fn pending(&self) -> impl ExactSizeIterator<Item = &Operation<F, B>> + '_ {
        self.pending.iter()
    }

    /// Queue a write of the initialized bytes of `buf` to `file` at `offset`.
    ///
    /// Nothing is validated and the kernel isn't involved until
    /// [`Self::submit_requests`]. For `O_DIRECT` files, buffer address, length and
    /// offset must be aligned to the logical block size or the submission fails.
    pub fn queue_write(&mut self, file: F, offset: u64, buf: B) {
        self.pending.push_back(Operation::write(file, offset, buf));
    }

    /// Remove the oldest queued operation, e.g. the one a failed
    /// [`Self::submit_requests`] choked on. Its resources are returned through
    /// [`Operation::into_resources`].
    pub fn pop_pending(&mut self) -> Option<Operation<F, B>> {
        self.pending.pop_front()
    }
}

impl<F, B, K> AsyncContext<F, B, K>
where
    F: IoFd,
    B: IoBufMut,
    K: Kernel,
{
    /// Queue a read from `file` at `offset` into `buf`, up to `buf.bytes_total()` bytes.
    ///
    /// See [`Self::queue_write`] for the rules.
    pub fn queue_read(&mut self, file: F, offset: u64, buf: B) {
        self.pending.push_back(Operation::read(file, offset, buf));
    }
}
