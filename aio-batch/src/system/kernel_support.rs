//! The system-wide AIO event budget.
//!
//! Every `io_setup(2)` reserves its queue depth (rounded up by the kernel)
//! against `/proc/sys/fs/aio-max-nr`. Once `aio-nr` would exceed it, creating
//! an [`crate::AsyncContext`] fails with `EAGAIN`.

use std::{io, path::Path};

const AIO_NR: &str = "/proc/sys/fs/aio-nr";
const AIO_MAX_NR: &str = "/proc/sys/fs/aio-max-nr";

/// Events currently reserved by all AIO contexts on the system.
pub fn aio_nr() -> io::Result<u64> {
    read_proc_u64(Path::new(AIO_NR))
}

/// Upper bound for [`aio_nr`].
pub fn aio_max_nr() -> io::Result<u64> {
    read_proc_u64(Path::new(AIO_MAX_NR))
}

fn read_proc_u64(path: &Path) -> io::Result<u64> {
    let s = std::fs::read_to_string(path)?;
    s.trim().parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {e}: {s:?}", path.display()),
        )
    })
}
