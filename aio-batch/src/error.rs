use std::io;

/// Everything that can go wrong in an [`crate::AsyncContext`] call.
///
/// Errors of individual requests (e.g. a write hitting `ENOSPC`) are not in here;
/// they are reported per [`crate::Event`] through [`crate::Event::result`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to set up the AIO context: {0}")]
    Setup(io::Error),
    #[error("failed to submit requests to AIO: {0}")]
    Submit(io::Error),
    #[error("failed to get events: {0}")]
    GetEvents(io::Error),
    #[error("min requests ({min}) was greater than max requests ({max})")]
    MinGreaterThanMax { min: usize, max: usize },
    #[error("requested at least {min} completions but only {inflight} requests are in flight")]
    NotEnoughInflight { min: usize, inflight: usize },
    #[error("completion has unsupported request type {opcode}")]
    UnsupportedCompletion { opcode: u16 },
    #[error("completion does not belong to any in-flight request: user_data={user_data:#x}")]
    UnknownRequest { user_data: u64 },
}

impl Error {
    /// The OS error behind a kernel call failure, if this is one.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Error::Setup(e) | Error::Submit(e) | Error::GetEvents(e) => e.raw_os_error(),
            _ => None,
        }
    }
}
