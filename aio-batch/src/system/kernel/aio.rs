//! Linux native AIO: `io_setup(2)`, `io_submit(2)`, `io_getevents(2)`, `io_destroy(2)`.
//!
//! glibc has no wrappers for these, so they are issued with [`libc::syscall`].
//! Unlike libaio's wrappers, raw syscalls report failure as `-1` + `errno`.

use std::{io, ptr};

use nix::errno::Errno;
use tracing::trace;

use super::{
    aio_abi::{aio_context_t, io_event, iocb},
    Completion, Kernel, Request,
};

/// An AIO context of fixed capacity, as returned by `io_setup(2)`.
pub struct LinuxAio {
    ctx: aio_context_t,
    destroyed: bool,
}

impl crate::sealed::Sealed for LinuxAio {}

impl LinuxAio {
    /// Open a context that can hold `nr_events` in-flight requests.
    pub(crate) fn setup(nr_events: usize) -> io::Result<Self> {
        let nr_events = libc::c_uint::try_from(nr_events).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("queue depth {nr_events} exceeds the kernel's limit"),
            )
        })?;
        // io_setup(2) requires the context to be zero on input.
        let mut ctx: aio_context_t = 0;
        // SAFETY: `ctx` is a valid, writable aio_context_t for the duration of the call.
        Errno::result(unsafe {
            libc::syscall(
                libc::SYS_io_setup,
                nr_events,
                &mut ctx as *mut aio_context_t,
            )
        })?;
        trace!(ctx, nr_events, "io_setup");
        Ok(LinuxAio {
            ctx,
            destroyed: false,
        })
    }
}

fn make_iocb(req: &Request) -> iocb {
    iocb {
        aio_data: req.user_data,
        aio_lio_opcode: req.opcode,
        // A negative fd turns into a huge one that the kernel rejects with EBADF.
        aio_fildes: req.fd as u32,
        aio_buf: req.buf as u64,
        aio_nbytes: req.len as u64,
        aio_offset: req.offset as i64,
        ..Default::default()
    }
}

impl Kernel for LinuxAio {
    fn submit(&mut self, batch: &[Request]) -> io::Result<usize> {
        assert!(!self.destroyed, "implementation error: submit after destroy");
        // The kernel copies the iocbs during the call; they need not outlive it.
        let mut iocbs: Vec<iocb> = batch.iter().map(make_iocb).collect();
        let mut iocbpp: Vec<*mut iocb> = iocbs.iter_mut().map(|cb| cb as *mut iocb).collect();
        // SAFETY: `iocbpp` holds `batch.len()` pointers to initialized iocbs that live
        // until the call returns. Buffer validity is the caller's contract.
        let accepted = Errno::result(unsafe {
            libc::syscall(
                libc::SYS_io_submit,
                self.ctx,
                iocbpp.len() as libc::c_long,
                iocbpp.as_mut_ptr(),
            )
        })?;
        Ok(usize::try_from(accepted).expect("io_submit returns a non-negative count on success"))
    }

    fn get_events(
        &mut self,
        min: usize,
        max: usize,
        out: &mut Vec<Completion>,
    ) -> io::Result<()> {
        assert!(!self.destroyed, "implementation error: get_events after destroy");
        let mut events = vec![io_event::default(); max];
        // No timeout: wait indefinitely for `min` events.
        let timeout: *mut libc::timespec = ptr::null_mut();
        let ready = loop {
            // SAFETY: `events` has room for `max` records.
            let res = Errno::result(unsafe {
                libc::syscall(
                    libc::SYS_io_getevents,
                    self.ctx,
                    min as libc::c_long,
                    max as libc::c_long,
                    events.as_mut_ptr(),
                    timeout,
                )
            });
            match res {
                // Interrupted before any event was consumed.
                Err(Errno::EINTR) => continue,
                res => break res?,
            }
        };
        let ready = usize::try_from(ready).expect("io_getevents returns a non-negative count");
        out.extend(events[..ready].iter().map(|ev| Completion {
            user_data: ev.data,
            result: ev.res,
        }));
        Ok(())
    }

    fn destroy(&mut self) -> io::Result<()> {
        if self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        // SAFETY: `ctx` came from a successful io_setup and is destroyed at most once.
        Errno::result(unsafe { libc::syscall(libc::SYS_io_destroy, self.ctx) })?;
        trace!(ctx = self.ctx, "io_destroy");
        Ok(())
    }
}

impl Drop for LinuxAio {
    fn drop(&mut self) {
        if !self.destroyed {
            if let Err(e) = self.destroy() {
                tracing::warn!(error = %e, "failed to destroy the AIO context");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iocb_carries_request_fields() {
        let mut buf = [0u8; 16];
        let req = Request {
            user_data: 0x1234_01,
            opcode: crate::system::kernel::aio_abi::IOCB_CMD_PWRITE,
            fd: 5,
            buf: buf.as_mut_ptr(),
            len: buf.len(),
            offset: 8192,
        };
        let cb = make_iocb(&req);
        assert_eq!(cb.aio_data, 0x1234_01);
        assert_eq!(cb.aio_lio_opcode, 1);
        assert_eq!(cb.aio_fildes, 5);
        assert_eq!(cb.aio_buf, buf.as_ptr() as u64);
        assert_eq!(cb.aio_nbytes, 16);
        assert_eq!(cb.aio_offset, 8192);
        assert_eq!(cb.aio_flags, 0);
    }

    #[test]
    fn zero_queue_depth_is_rejected_by_the_kernel() {
        let err = LinuxAio::setup(0).err().expect("io_setup(0) must fail");
        // EINVAL normally; ENOSYS/EPERM where AIO is unavailable.
        assert!(err.raw_os_error().is_some(), "{err:?}");
    }

    #[test]
    fn oversized_queue_depth_is_rejected_before_the_kernel() {
        let err = LinuxAio::setup(usize::MAX).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
