//! `<linux/aio_abi.h>`, the parts we use.
#![allow(non_camel_case_types)]

pub(crate) type aio_context_t = libc::c_ulong;

pub(crate) const IOCB_CMD_PREAD: u16 = 0;
pub(crate) const IOCB_CMD_PWRITE: u16 = 1;
#[cfg(test)]
pub(crate) const IOCB_CMD_FSYNC: u16 = 2;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct iocb {
    pub aio_data: u64,
    #[cfg(target_endian = "little")]
    pub aio_key: u32,
    pub aio_rw_flags: i32,
    #[cfg(target_endian = "big")]
    pub aio_key: u32,
    pub aio_lio_opcode: u16,
    pub aio_reqprio: i16,
    pub aio_fildes: u32,
    pub aio_buf: u64,
    pub aio_nbytes: u64,
    pub aio_offset: i64,
    pub aio_reserved2: u64,
    pub aio_flags: u32,
    pub aio_resfd: u32,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct io_event {
    /// The `aio_data` of the originating iocb.
    pub data: u64,
    /// Address of the originating iocb.
    pub obj: u64,
    pub res: i64,
    pub res2: i64,
}
