use aio_common::{buf::IoBuf, io_fd::IoFd};

use super::{Direction, Operation};

impl<F, B> Operation<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    /// Write the `buf.bytes_init()` initialized bytes of `buf` to `file` at `offset`.
    ///
    /// See also <https://man7.org/linux/man-pages/man2/io_submit.2.html> (`IOCB_CMD_PWRITE`).
    pub(crate) fn write(file: F, offset: u64, buf: B) -> Self {
        // The kernel only reads through this pointer.
        let buf_ptr = buf.stable_ptr() as *mut u8;
        let len = buf.bytes_init();
        Operation {
            direction: Direction::Write,
            file,
            offset,
            buf,
            buf_ptr,
            len,
            on_read_completion: None,
        }
    }
}
