//! Moving queued operations into the kernel.

use std::sync::atomic::Ordering;

use aio_common::{buf::IoBuf, io_fd::IoFd};
use tracing::{debug, error, trace};

use crate::{
    system::{
        kernel::{Kernel, Request},
        lifecycle::handle::AsyncContext,
        slots::encode_user_data,
    },
    Error,
};

impl<F, B, K> AsyncContext<F, B, K>
where
    F: IoFd,
    B: IoBuf,
    K: Kernel,
{
    /// Hand as many queued operations to the kernel as the remaining queue
    /// depth allows, oldest first, in a single `io_submit(2)` call.
    ///
    /// Returns the number of requests submitted. `Ok(0)` means there was
    /// nothing queued or no free queue depth; the kernel isn't called then.
    ///
    /// On [`Error::Submit`] nothing was submitted and the queue is unchanged,
    /// so the caller may retry, or [`Self::pop_pending`] the offending operation.
    ///
    /// The kernel accepting only part of the batch breaks the contract this
    /// engine is built on; the process is aborted in that case, since the
    /// accepted requests' buffers can neither be freed nor tracked reliably.
    pub fn submit_requests(&mut self) -> Result<usize, Error> {
        let n = self.pending.len().min(self.remaining_queue_depth());
        if n == 0 {
            trace!(
                context = self.id,
                pending = self.pending.len(),
                inflight = self.inflight_requests,
                "nothing to submit"
            );
            return Ok(0);
        }
        debug_assert!(self.slots.free_count() >= n);

        let arena = &mut self.slots;
        let reserved = arena.reserve(n);
        // Give the slots back if the kernel refuses the batch.
        let reserved = scopeguard::guard(reserved, |reserved| arena.unreserve(reserved));

        let batch: Vec<Request> = self
            .pending
            .iter()
            .zip(reserved.iter())
            .map(|(op, &idx)| op.make_request(encode_user_data(idx, op.direction)))
            .collect();

        let accepted = self.kernel.submit(&batch).map_err(|e| {
            debug!(context = self.id, batch = n, error = %e, "submission failed");
            Error::Submit(e)
        })?;
        let reserved = scopeguard::ScopeGuard::into_inner(reserved);

        if accepted != n {
            error!(
                context = self.id,
                accepted, requested = n, "kernel accepted part of a batch, aborting"
            );
            std::process::abort();
        }

        for (op, idx) in self.pending.drain(..n).zip(reserved) {
            self.slots.occupy(idx, op);
        }
        self.inflight_requests += n;
        assert!(self.inflight_requests <= self.queue_depth);
        debug_assert_eq!(self.inflight_requests, self.slots.occupied_count());

        self.metrics
            .requests_submitted
            .fetch_add(n as u64, Ordering::Relaxed);
        debug!(
            context = self.id,
            submitted = n,
            inflight = self.inflight_requests,
            pending = self.pending.len(),
            "submitted batch"
        );
        Ok(n)
    }
}
