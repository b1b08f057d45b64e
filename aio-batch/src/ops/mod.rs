//! Parent module for [`Operation`], the descriptor of one queued read or write.

use std::os::fd::RawFd;

use aio_common::{buf::IoBuf, io_fd::IoFd};

use crate::system::kernel::{aio_abi, Request};

pub mod read;
pub mod write;

/// Which way the bytes flow. Decoded back out of every completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

impl Direction {
    /// The `IOCB_CMD_*` opcode the kernel knows this direction by.
    pub(crate) fn opcode(self) -> u16 {
        match self {
            Direction::Read => aio_abi::IOCB_CMD_PREAD,
            Direction::Write => aio_abi::IOCB_CMD_PWRITE,
        }
    }

    pub(crate) fn from_opcode(opcode: u16) -> Option<Self> {
        match opcode {
            aio_abi::IOCB_CMD_PREAD => Some(Direction::Read),
            aio_abi::IOCB_CMD_PWRITE => Some(Direction::Write),
            _ => None,
        }
    }
}

/// A queued read or write and the resources it operates on.
///
/// Built by [`crate::AsyncContext::queue_read`] / [`crate::AsyncContext::queue_write`],
/// never modified afterwards. The buffer address and length are captured at
/// construction; the [`IoBuf`] contract keeps the address valid while the
/// descriptor, and later the in-flight slot, owns the buffer.
pub struct Operation<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    pub(crate) direction: Direction,
    pub(crate) file: F,
    pub(crate) offset: u64,
    pub(crate) buf: B,
    pub(crate) buf_ptr: *mut u8,
    pub(crate) len: usize,
    /// Only set for reads, where `B: IoBufMut` is known.
    pub(crate) on_read_completion: Option<fn(&mut B, usize)>,
}

// SAFETY: `buf_ptr` points into `buf`, which moves along with it.
unsafe impl<F, B> Send for Operation<F, B>
where
    F: IoFd + Send,
    B: IoBuf + Send,
{
}

impl<F, B> Operation<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes the request asks the kernel to transfer.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buf(&self) -> &B {
        &self.buf
    }

    pub fn file(&self) -> &F {
        &self.file
    }

    /// The request in the shape the kernel backend submits, tagged with `user_data`.
    pub(crate) fn make_request(&self, user_data: u64) -> Request {
        // SAFETY: we hold `F` in self, and while the request is in flight
        // the arena slot holds `self`, keeping the fd open.
        let fd: RawFd = unsafe { self.file.as_fd() };
        Request {
            user_data,
            opcode: self.direction.opcode(),
            fd,
            buf: self.buf_ptr,
            len: self.len,
            offset: self.offset,
        }
    }

    /// Give back the file handle and the buffer.
    pub fn into_resources(self) -> (F, B) {
        (self.file, self.buf)
    }
}

impl<F, B> std::fmt::Debug for Operation<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("direction", &self.direction)
            .field("offset", &self.offset)
            .field("len", &self.len)
            .field("buf", &self.buf_ptr)
            .finish()
    }
}
