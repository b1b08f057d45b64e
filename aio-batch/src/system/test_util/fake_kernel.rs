//! In-memory [`Kernel`] that accepts, completes and fails requests on command.

use std::{
    cell::{RefCell, RefMut},
    collections::VecDeque,
    io,
    rc::Rc,
};

use crate::system::kernel::{Completion, Kernel, Request};

/// Byte the fake kernel "reads" into read buffers.
pub(crate) const READ_FILL: u8 = 0xAB;

#[derive(Clone, Default)]
pub(crate) struct FakeKernel(Rc<RefCell<FakeState>>);

#[derive(Default)]
pub(crate) struct FakeState {
    /// Accepted, not yet completed, in submission order.
    pub(crate) in_flight: VecDeque<Request>,
    /// Every request ever accepted.
    pub(crate) accepted: Vec<Request>,
    pub(crate) submit_calls: usize,
    pub(crate) get_events_calls: usize,
    pub(crate) destroy_calls: usize,

    /// Fail the next `submit` with this errno.
    pub(crate) fail_next_submit: Option<i32>,
    /// Accept at most this many requests per `submit`.
    pub(crate) accept_limit: Option<usize>,
    /// Complete newest first instead of oldest first.
    pub(crate) complete_newest_first: bool,
    /// Replace the `user_data` of the next completion.
    pub(crate) corrupt_next_user_data: Option<u64>,
    /// Per-request result override; default is the request length.
    pub(crate) next_result: Option<i64>,
    pub(crate) fail_destroy: bool,
}

impl FakeKernel {
    pub(crate) fn state(&self) -> RefMut<'_, FakeState> {
        self.0.borrow_mut()
    }
}

impl crate::sealed::Sealed for FakeKernel {}

impl Kernel for FakeKernel {
    fn submit(&mut self, batch: &[Request]) -> io::Result<usize> {
        let mut st = self.state();
        st.submit_calls += 1;
        if let Some(errno) = st.fail_next_submit.take() {
            return Err(io::Error::from_raw_os_error(errno));
        }
        let n = batch.len().min(st.accept_limit.unwrap_or(usize::MAX));
        st.in_flight.extend(batch[..n].iter().copied());
        st.accepted.extend(batch[..n].iter().copied());
        Ok(n)
    }

    fn get_events(
        &mut self,
        min: usize,
        max: usize,
        out: &mut Vec<Completion>,
    ) -> io::Result<()> {
        let mut st = self.state();
        st.get_events_calls += 1;
        assert!(
            st.in_flight.len() >= min,
            "fake kernel would block forever: {} in flight, min={min}",
            st.in_flight.len()
        );
        for _ in 0..max {
            let req = if st.complete_newest_first {
                st.in_flight.pop_back()
            } else {
                st.in_flight.pop_front()
            };
            let Some(req) = req else { break };
            if req.opcode == crate::system::kernel::aio_abi::IOCB_CMD_PREAD {
                // SAFETY: the engine keeps the buffer alive in its arena until
                // this completion is harvested.
                unsafe { std::ptr::write_bytes(req.buf, READ_FILL, req.len) };
            }
            let user_data = st.corrupt_next_user_data.take().unwrap_or(req.user_data);
            let result = st.next_result.take().unwrap_or(req.len as i64);
            out.push(Completion { user_data, result });
        }
        Ok(())
    }

    fn destroy(&mut self) -> io::Result<()> {
        let mut st = self.state();
        st.destroy_calls += 1;
        if st.fail_destroy {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        Ok(())
    }
}
