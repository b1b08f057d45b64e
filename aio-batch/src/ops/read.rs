use aio_common::{buf::IoBufMut, io_fd::IoFd};

use super::{Direction, Operation};

impl<F, B> Operation<F, B>
where
    F: IoFd,
    B: IoBufMut,
{
    /// Read up to `buf.bytes_total()` bytes from `file` at `offset` into `buf`.
    ///
    /// See also <https://man7.org/linux/man-pages/man2/io_submit.2.html> (`IOCB_CMD_PREAD`).
    pub(crate) fn read(file: F, offset: u64, mut buf: B) -> Self {
        let buf_ptr = buf.stable_mut_ptr();
        let len = buf.bytes_total();
        Operation {
            direction: Direction::Read,
            file,
            offset,
            buf,
            buf_ptr,
            len,
            on_read_completion: Some(mark_initialized::<B>),
        }
    }
}

fn mark_initialized<B: IoBufMut>(buf: &mut B, bytes_read: usize) {
    // SAFETY: the kernel reported `bytes_read` bytes written starting at
    // `stable_mut_ptr()`, which is the address the request was built with.
    unsafe { buf.set_init(bytes_read) }
}
