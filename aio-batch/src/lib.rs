//! This crate batches reads and writes into Linux native AIO (`io_submit(2)`)
//! submissions and harvests their completions (`io_getevents(2)`).
//!
//! # Usage
//!
//! 1. Create an [`AsyncContext`] with a fixed queue depth. This opens the kernel's
//!    AIO context sized for that many simultaneously in-flight requests.
//! 2. Queue operations with [`AsyncContext::queue_read`] / [`AsyncContext::queue_write`].
//!    Queueing *moves* the file handle and the buffer into the context.
//! 3. Call [`AsyncContext::submit_requests`] to hand as many queued operations to the
//!    kernel as there is free queue depth, in one system call.
//! 4. Call [`AsyncContext::collect_requests`] to block until completions arrive.
//! 5. Each [`Event`] hands back the file handle and buffer, with the result.
//!
//! Transfer of ownership is required because the kernel owns the buffer while the
//! request is in flight. Every in-flight request sits in an arena slot inside the
//! context; the slot index, not a pointer, is what travels through the kernel as
//! the request's `user_data`.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use aio_batch::{AsyncContext, Direction};
//!
//! let file = Arc::new(
//!     std::fs::OpenOptions::new()
//!         .read(true)
//!         .write(true)
//!         .open("/tmp/some_file")
//!         .unwrap(),
//! );
//! let block = Arc::new(vec![3u8; 4096]);
//!
//! let mut ctx = AsyncContext::new(64).unwrap();
//! for _ in 0..10 {
//!     ctx.queue_write(Arc::clone(&file), 0, Arc::clone(&block));
//! }
//! assert_eq!(ctx.submit_requests().unwrap(), 10);
//! let events = ctx.collect_requests(10, 10).unwrap();
//! for event in &events {
//!     assert_eq!(event.direction(), Direction::Write);
//!     assert!(Arc::ptr_eq(event.buf(), &block));
//! }
//! assert_eq!(ctx.inflight_requests(), 0);
//! ```
//!
//! # Threading
//!
//! A context performs no internal locking. It is [`Send`], so it can live on a
//! dedicated I/O thread, but it is neither [`Sync`] nor [`Clone`]:
//!
//! ```rust,compile_fail
//! fn shared<T: Sync>() {}
//! shared::<aio_batch::AsyncContext<std::fs::File, Vec<u8>>>();
//! ```

pub(crate) mod sealed {
    pub trait Sealed {}
}

mod error;

pub mod metrics;

pub mod ops;

mod system;

pub use error::Error;
pub use ops::{Direction, Operation};
pub use system::completion::Event;
pub use system::kernel::{aio::LinuxAio, Completion, Kernel, Request};
pub use system::kernel_support;
pub use system::lifecycle::handle::AsyncContext;

pub use aio_common::buf::{AlignedBuf, IoBuf, IoBufMut, DEFAULT_ALIGNMENT};
pub use aio_common::io_fd::IoFd;
