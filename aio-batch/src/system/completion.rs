//! Harvesting completions from the kernel and decoding them into [`Event`]s.

use std::{io, sync::atomic::Ordering};

use aio_common::{buf::IoBuf, io_fd::IoFd};
use tracing::{debug, error, trace};

use crate::{
    ops::{Direction, Operation},
    system::{
        kernel::{Completion, Kernel},
        lifecycle::handle::AsyncContext,
    },
    Error,
};

/// A decoded completion: what finished, how it went, and the resources that
/// were in flight.
pub struct Event<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    direction: Direction,
    offset: u64,
    result: i64,
    file: F,
    buf: B,
}

impl<F, B> Event<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    fn from_completion(op: Operation<F, B>, result: i64) -> Self {
        let direction = op.direction;
        let offset = op.offset;
        let on_read_completion = op.on_read_completion;
        let (file, mut buf) = op.into_resources();
        if let (Direction::Read, Some(mark_initialized), Ok(bytes_read)) =
            (direction, on_read_completion, usize::try_from(result))
        {
            mark_initialized(&mut buf, bytes_read);
        }
        Event {
            direction,
            offset,
            result,
            file,
            buf,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// File offset the request was issued at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The buffer of the originating operation. For a successful read, its
    /// initialized length now covers the bytes read.
    pub fn buf(&self) -> &B {
        &self.buf
    }

    pub fn file(&self) -> &F {
        &self.file
    }

    /// Number of bytes transferred, or the error the kernel reported for this request.
    ///
    /// Short reads and writes are not errors.
    pub fn result(&self) -> io::Result<usize> {
        // https://man7.org/linux/man-pages/man2/io_getevents.2.html: `res` is
        // the return value of the equivalent synchronous call, negated errno on failure.
        usize::try_from(self.result).map_err(|_| {
            let errno = i32::try_from(-self.result).unwrap_or(libc::EIO);
            io::Error::from_raw_os_error(errno)
        })
    }

    /// Take back the file handle and the buffer.
    pub fn into_resources(self) -> (F, B) {
        (self.file, self.buf)
    }
}

impl<F, B> std::fmt::Debug for Event<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("direction", &self.direction)
            .field("offset", &self.offset)
            .field("result", &self.result)
            .field("buf", &self.buf.stable_ptr())
            .finish()
    }
}

impl<F, B, K> AsyncContext<F, B, K>
where
    F: IoFd,
    B: IoBuf,
    K: Kernel,
{
    /// Block until at least `min` requests have completed, then return up to
    /// `max` of them, in the order the kernel reported them.
    ///
    /// The kernel completes requests in no particular order. There is no timeout.
    ///
    /// Fails without calling the kernel if `min > max` or if `min` exceeds
    /// [`Self::inflight_requests`], since such a wait could never finish.
    ///
    /// If a harvested completion can't be decoded, every other completion of
    /// the batch is still released and the first decode error is returned. The
    /// events that did decode are dropped with their files and buffers, so data
    /// read by those requests is lost to the caller.
    pub fn collect_requests(&mut self, min: usize, max: usize) -> Result<Vec<Event<F, B>>, Error> {
        if min > max {
            return Err(Error::MinGreaterThanMax { min, max });
        }
        if min > self.inflight_requests {
            return Err(Error::NotEnoughInflight {
                min,
                inflight: self.inflight_requests,
            });
        }
        // The kernel can't report more than is in flight.
        let max = max.min(self.inflight_requests);
        if max == 0 {
            return Ok(Vec::new());
        }

        let mut completions: Vec<Completion> = Vec::with_capacity(max);
        self.kernel
            .get_events(min, max, &mut completions)
            .map_err(|e| {
                debug!(context = self.id, min, max, error = %e, "waiting for completions failed");
                Error::GetEvents(e)
            })?;
        let harvested = completions.len();
        assert!(
            min <= harvested && harvested <= max,
            "kernel returned {harvested} completions, asked for between {min} and {max}"
        );

        // Decode all of them even if one fails, so that every known slot is released.
        let mut events = Vec::with_capacity(harvested);
        let mut first_err = None;
        for completion in completions {
            match self.slots.release(completion.user_data) {
                Ok(op) => {
                    self.inflight_requests -= 1;
                    let event = Event::from_completion(op, completion.result);
                    trace!(context = self.id, ?event, "completion");
                    events.push(event);
                }
                Err(e) => {
                    error!(
                        context = self.id,
                        user_data = completion.user_data,
                        result = completion.result,
                        error = %e,
                        "cannot decode completion"
                    );
                    first_err.get_or_insert(e);
                }
            }
        }
        debug_assert_eq!(self.inflight_requests, self.slots.occupied_count());

        self.metrics
            .requests_completed
            .fetch_add(events.len() as u64, Ordering::Relaxed);
        debug!(
            context = self.id,
            harvested,
            inflight = self.inflight_requests,
            "collected completions"
        );
        match first_err {
            Some(e) => Err(e),
            None => Ok(events),
        }
    }
}
