//! Creation and teardown of an [`AsyncContext`].

use std::{cell::Cell, collections::VecDeque, io, marker::PhantomData, sync::atomic::Ordering};

use aio_common::{buf::IoBuf, io_fd::IoFd};
use tracing::{debug, warn};

pub mod handle;

use crate::{
    metrics::{MetricsStorage, GLOBAL_STORAGE},
    Error,
};

use super::{
    kernel::{aio::LinuxAio, Kernel},
    slots::Slots,
};

use handle::AsyncContext;

static CONTEXT_ID: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

impl<F, B> AsyncContext<F, B, LinuxAio>
where
    F: IoFd,
    B: IoBuf,
{
    /// Open a kernel AIO context for up to `queue_depth` simultaneously
    /// in-flight requests.
    ///
    /// Fails with [`Error::Setup`] if `queue_depth` is zero or the kernel
    /// refuses (e.g. `EAGAIN` when the system-wide budget in
    /// [`crate::kernel_support::aio_max_nr`] is exhausted).
    pub fn new(queue_depth: usize) -> Result<Self, Error> {
        Self::with_kernel(queue_depth, LinuxAio::setup, &GLOBAL_STORAGE)
    }
}

impl<F, B, K> AsyncContext<F, B, K>
where
    F: IoFd,
    B: IoBuf,
    K: Kernel,
{
    pub(crate) fn with_kernel(
        queue_depth: usize,
        setup: impl FnOnce(usize) -> io::Result<K>,
        metrics: &'static MetricsStorage,
    ) -> Result<Self, Error> {
        if queue_depth == 0 {
            return Err(Error::Setup(io::Error::new(
                io::ErrorKind::InvalidInput,
                "queue depth must be positive",
            )));
        }
        let kernel = setup(queue_depth).map_err(Error::Setup)?;
        let id = CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        metrics.contexts_created.fetch_add(1, Ordering::Relaxed);
        debug!(context = id, queue_depth, "AIO context set up");
        Ok(AsyncContext {
            id,
            queue_depth,
            inflight_requests: 0,
            pending: VecDeque::new(),
            slots: Slots::new(queue_depth),
            kernel,
            metrics,
            _not_sync: PhantomData::<Cell<()>>,
        })
    }

    /// Release the kernel context. Same as dropping the handle.
    ///
    /// Failure to release is logged, not returned.
    pub fn destroy(self) {
        drop(self)
    }
}

impl<F, B, K> Drop for AsyncContext<F, B, K>
where
    F: IoFd,
    B: IoBuf,
    K: Kernel,
{
    fn drop(&mut self) {
        let id = self.id;
        scopeguard::defer_on_unwind! { tracing::error!(context = id, "panic while destroying AIO context") };

        if self.inflight_requests > 0 {
            debug!(
                context = id,
                inflight = self.inflight_requests,
                "destroying AIO context with requests in flight"
            );
        }
        match self.kernel.destroy() {
            Ok(()) => debug!(context = id, "AIO context destroyed"),
            Err(e) => {
                warn!(context = id, error = %e, "failed to destroy the AIO context");
                if self.slots.occupied_count() > 0 {
                    // The kernel may still be using these buffers.
                    warn!(
                        context = id,
                        inflight = self.slots.occupied_count(),
                        "leaking resources of in-flight requests"
                    );
                    self.slots.leak();
                }
            }
        }
        if !self.pending.is_empty() {
            debug!(
                context = id,
                pending = self.pending.len(),
                "dropping requests that were never submitted"
            );
        }
        self.metrics
            .contexts_destroyed
            .fetch_add(1, Ordering::Relaxed);
    }
}
