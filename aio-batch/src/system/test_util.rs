use aio_common::{buf::IoBuf, io_fd::IoFd};

use crate::{metrics::MetricsStorage, AsyncContext, Error, LinuxAio};

pub(crate) mod fake_kernel;

use fake_kernel::FakeKernel;

/// A context backed by [`FakeKernel`] and private metrics; the returned kernel
/// handle shares state with the one inside the context.
pub(crate) fn fake_context<F: IoFd, B: IoBuf>(
    queue_depth: usize,
) -> (AsyncContext<F, B, FakeKernel>, FakeKernel) {
    let metrics: &'static MetricsStorage = Box::leak(Box::new(MetricsStorage::new_const()));
    fake_context_with_metrics(queue_depth, metrics)
}

pub(crate) fn fake_context_with_metrics<F: IoFd, B: IoBuf>(
    queue_depth: usize,
    metrics: &'static MetricsStorage,
) -> (AsyncContext<F, B, FakeKernel>, FakeKernel) {
    let kernel = FakeKernel::default();
    let ctx = AsyncContext::with_kernel(queue_depth, |_| Ok(kernel.clone()), metrics).unwrap();
    (ctx, kernel)
}

/// A context on the real kernel, or `None` where AIO is unavailable
/// (`ENOSYS`, or `EPERM` under seccomp), so the test can bail out.
pub(crate) fn real_context<F: IoFd, B: IoBuf>(
    queue_depth: usize,
) -> Option<AsyncContext<F, B, LinuxAio>> {
    match AsyncContext::new(queue_depth) {
        Ok(ctx) => Some(ctx),
        Err(Error::Setup(e))
            if matches!(e.raw_os_error(), Some(libc::ENOSYS) | Some(libc::EPERM)) =>
        {
            println!("kernel AIO is unavailable ({e}), skipping");
            None
        }
        Err(e) => panic!("io_setup failed: {e}"),
    }
}
