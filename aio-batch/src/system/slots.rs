//! Arena of in-flight requests.
//!
//! [`Slots`] serves the following purposes:
//!
//! - Have a place to which we transfer ownership of the resources (fd, buffer)
//!   while the kernel operates on them. Nothing hands them back until the
//!   matching completion has been harvested.
//! - Give every in-flight request a stable index. The index, together with the
//!   request's opcode, is the `user_data` that travels through the kernel;
//!   see [`encode_user_data`].
//!
//! There is one [`Slots`] instance per [`crate::AsyncContext`], with exactly
//! `queue_depth` slots, so a free slot exists for every request the queue depth
//! admits.

use aio_common::{buf::IoBuf, io_fd::IoFd};

use crate::{ops::Direction, ops::Operation, Error};

const OPCODE_BITS: u32 = 8;
const OPCODE_MASK: u64 = (1 << OPCODE_BITS) - 1;

/// `user_data = (slot index << 8) | opcode`.
pub(crate) fn encode_user_data(idx: usize, direction: Direction) -> u64 {
    let idx = idx as u64;
    assert!(idx < (1 << (64 - OPCODE_BITS)), "slot index out of range");
    (idx << OPCODE_BITS) | u64::from(direction.opcode())
}

/// Inverse of [`encode_user_data`]; fails for opcodes that are neither read nor write.
pub(crate) fn decode_user_data(user_data: u64) -> Result<(usize, Direction), Error> {
    let opcode = (user_data & OPCODE_MASK) as u16;
    let direction = Direction::from_opcode(opcode).ok_or(Error::UnsupportedCompletion { opcode })?;
    let idx = usize::try_from(user_data >> OPCODE_BITS)
        .map_err(|_| Error::UnknownRequest { user_data })?;
    Ok((idx, direction))
}

pub(crate) struct Slots<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    storage: Vec<Option<Operation<F, B>>>,
    unused_indices: Vec<usize>,
}

impl<F, B> Slots<F, B>
where
    F: IoFd,
    B: IoBuf,
{
    pub(crate) fn new(queue_depth: usize) -> Self {
        Slots {
            storage: (0..queue_depth).map(|_| None).collect(),
            // reversed so that pop() hands out low indices first
            unused_indices: (0..queue_depth).rev().collect(),
        }
    }

    pub(crate) fn free_count(&self) -> usize {
        self.unused_indices.len()
    }

    pub(crate) fn occupied_count(&self) -> usize {
        self.storage.len() - self.unused_indices.len()
    }

    /// Take `n` free indices off the free list without occupying them yet.
    ///
    /// # Panics
    ///
    /// If fewer than `n` slots are free.
    pub(crate) fn reserve(&mut self, n: usize) -> Vec<usize> {
        assert!(
            n <= self.unused_indices.len(),
            "implementation error: reserving {n} slots but only {} are free",
            self.unused_indices.len()
        );
        let at = self.unused_indices.len() - n;
        let mut reserved = self.unused_indices.split_off(at);
        reserved.reverse();
        reserved
    }

    /// Undo [`Self::reserve`] for indices that never got occupied.
    pub(crate) fn unreserve(&mut self, mut reserved: Vec<usize>) {
        for idx in &reserved {
            assert!(self.storage[*idx].is_none(), "implementation error: unreserving occupied slot {idx}");
        }
        reserved.reverse();
        self.unused_indices.extend(reserved);
    }

    /// Park `op` in a reserved slot; the kernel now owns its resources.
    pub(crate) fn occupy(&mut self, idx: usize, op: Operation<F, B>) {
        let slot = &mut self.storage[idx];
        assert!(slot.is_none(), "implementation error: slot {idx} is already in flight");
        *slot = Some(op);
    }

    /// Resolve a completion's `user_data` to its operation and free the slot.
    pub(crate) fn release(&mut self, user_data: u64) -> Result<Operation<F, B>, Error> {
        let (idx, direction) = decode_user_data(user_data)?;
        let op = self
            .storage
            .get_mut(idx)
            .and_then(Option::take)
            .ok_or(Error::UnknownRequest { user_data })?;
        assert_eq!(
            op.direction, direction,
            "implementation error: slot {idx} holds a {:?} but the completion says {direction:?}",
            op.direction
        );
        self.unused_indices.push(idx);
        Ok(op)
    }

    /// Give up on every in-flight operation without dropping its resources.
    ///
    /// For when the kernel handle could not be released and may still
    /// reference the buffers.
    pub(crate) fn leak(&mut self) {
        for slot in &mut self.storage {
            if let Some(op) = slot.take() {
                std::mem::forget(op);
            }
        }
    }
}
