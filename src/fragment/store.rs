//! Per-sender receive buffers.
//!
//! [`BufferStore`] maps each sender identity to at most one [`ReceiveBuffer`].
//! It is backed by a [`DashMap`], so a write for one sender holds only the
//! shard lock covering that sender's entry. Two threads can never write into
//! or free the same buffer at once, while fragments for other senders proceed
//! independently.
//!
//! Every mutation happens inside a single entry operation: the size check,
//! the clamped copy and the removal of a completed buffer are not separable
//! by a concurrent caller. The open-buffers gauge is adjusted at the same
//! points, one step per insert or removal.

use std::num::NonZeroUsize;

use dashmap::{DashMap, mapref::entry::Entry};

use super::{Fragment, OverrunPolicy, ReassemblyError, SenderId};
use crate::metrics;

/// Reconstruction state for one in-flight transmission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReceiveBuffer {
    sender: Option<SenderId>,
    bytes: Vec<u8>,
}

impl ReceiveBuffer {
    fn new(sender: Option<SenderId>, expected_size: usize) -> Self {
        Self {
            sender,
            bytes: vec![0; expected_size],
        }
    }

    /// Sender this buffer belongs to; `None` for the local sender.
    #[must_use]
    pub const fn sender(&self) -> Option<SenderId> { self.sender }

    /// Length of the complete payload, fixed when the buffer opened.
    #[must_use]
    pub fn expected_size(&self) -> usize { self.bytes.len() }

    /// Borrow the buffer contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] { self.bytes.as_slice() }

    /// Consume the buffer, returning its contents.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> { self.bytes }

    /// Copy `data` to `offset`, never writing past the end of the buffer.
    ///
    /// Returns the number of bytes written.
    fn write_at(&mut self, offset: u32, data: &[u8]) -> usize {
        let len = self.bytes.len();
        let start = usize::try_from(offset).map_or(len, |offset| offset.min(len));
        let count = data.len().min(len - start);
        match (
            self.bytes.get_mut(start..start + count),
            data.get(..count),
        ) {
            (Some(target), Some(source)) => {
                target.copy_from_slice(source);
                count
            }
            _ => 0,
        }
    }
}

/// Limits applied when a fragment is written into the store.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WriteRules {
    pub(crate) overrun: OverrunPolicy,
    pub(crate) max_message_size: NonZeroUsize,
}

/// What a successful write did to the sender's state.
#[derive(Debug)]
pub(crate) enum WriteStatus {
    /// The fragment was stored; `opened` is set when it started a new buffer.
    Buffered { opened: bool },
    /// The final fragment arrived; the buffer has left the store.
    Completed(ReceiveBuffer),
}

/// Concurrent map of sender identity to its open [`ReceiveBuffer`].
#[derive(Debug, Default)]
pub struct BufferStore(DashMap<Option<SenderId>, ReceiveBuffer>);

impl BufferStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Number of open buffers.
    ///
    /// Takes a read lock on each shard in turn.
    #[must_use]
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether no buffers are open.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Whether `sender` has an open buffer.
    #[must_use]
    pub fn contains(&self, sender: Option<SenderId>) -> bool { self.0.contains_key(&sender) }

    /// Declared size of the buffer open for `sender`, if any.
    #[must_use]
    pub fn expected_size(&self, sender: Option<SenderId>) -> Option<usize> {
        self.0.get(&sender).map(|buffer| buffer.expected_size())
    }

    /// Remove and return the buffer open for `sender`.
    pub fn remove(&self, sender: Option<SenderId>) -> Option<ReceiveBuffer> {
        let (_, buffer) = self.0.remove(&sender)?;
        metrics::dec_open_buffers(1);
        Some(buffer)
    }

    /// Drop every open buffer, returning how many were discarded.
    ///
    /// `DashMap::retain` acquires per-shard write locks, so concurrent writes
    /// may contend briefly.
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        self.0.retain(|_, _| {
            dropped += 1;
            false
        });
        if dropped > 0 {
            metrics::dec_open_buffers(dropped);
        }
        dropped
    }

    /// Identities with an open buffer, in no particular order.
    #[must_use]
    pub fn senders(&self) -> Vec<Option<SenderId>> {
        self.0.iter().map(|entry| *entry.key()).collect()
    }

    /// Apply `fragment` to the buffer for `sender`.
    ///
    /// Opens a buffer when none exists, discards the existing buffer on a size
    /// mismatch or a rejected overrun, and removes the buffer when the
    /// fragment is final.
    pub(crate) fn write(
        &self,
        sender: Option<SenderId>,
        fragment: &Fragment,
        rules: WriteRules,
    ) -> Result<WriteStatus, ReassemblyError> {
        match self.0.entry(sender) {
            Entry::Occupied(mut occupied) => {
                let expected = occupied.get().expected_size();
                if usize::try_from(fragment.total_size()).ok() != Some(expected) {
                    occupied.remove();
                    metrics::dec_open_buffers(1);
                    return Err(ReassemblyError::SizeMismatch {
                        sender,
                        expected: u32::try_from(expected).unwrap_or(u32::MAX),
                        found: fragment.total_size(),
                    });
                }
                if let Err(err) = check_overrun(sender, fragment, rules.overrun) {
                    occupied.remove();
                    metrics::dec_open_buffers(1);
                    return Err(err);
                }
                occupied
                    .get_mut()
                    .write_at(fragment.offset(), fragment.data());
                if fragment.is_final() {
                    metrics::dec_open_buffers(1);
                    Ok(WriteStatus::Completed(occupied.remove()))
                } else {
                    Ok(WriteStatus::Buffered { opened: false })
                }
            }
            Entry::Vacant(vacant) => {
                let attempted = usize::try_from(fragment.total_size()).unwrap_or(usize::MAX);
                if attempted > rules.max_message_size.get() {
                    return Err(ReassemblyError::MessageTooLarge {
                        sender,
                        attempted,
                        limit: rules.max_message_size,
                    });
                }
                check_overrun(sender, fragment, rules.overrun)?;

                let mut buffer = ReceiveBuffer::new(sender, attempted);
                buffer.write_at(fragment.offset(), fragment.data());
                if fragment.is_final() {
                    Ok(WriteStatus::Completed(buffer))
                } else {
                    vacant.insert(buffer);
                    metrics::inc_open_buffers();
                    Ok(WriteStatus::Buffered { opened: true })
                }
            }
        }
    }
}

fn check_overrun(
    sender: Option<SenderId>,
    fragment: &Fragment,
    policy: OverrunPolicy,
) -> Result<(), ReassemblyError> {
    if policy == OverrunPolicy::Reject && fragment.overruns() {
        return Err(ReassemblyError::Overrun {
            sender,
            offset: fragment.offset(),
            len: fragment.data().len(),
            total_size: fragment.total_size(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(overrun: OverrunPolicy) -> WriteRules {
        WriteRules {
            overrun,
            max_message_size: NonZeroUsize::new(64).expect("non-zero"),
        }
    }

    #[test]
    fn write_at_clamps_to_buffer_end() {
        let mut buffer = ReceiveBuffer::new(None, 4);
        assert_eq!(buffer.write_at(2, &[7, 8, 9, 10]), 2);
        assert_eq!(buffer.as_bytes(), &[0, 0, 7, 8]);
    }

    #[test]
    fn write_at_ignores_offsets_past_the_end() {
        let mut buffer = ReceiveBuffer::new(None, 4);
        assert_eq!(buffer.write_at(9, &[1]), 0);
        assert_eq!(buffer.as_bytes(), &[0; 4]);
    }

    #[test]
    fn first_fragment_opens_buffer() {
        let store = BufferStore::new();
        let sender = Some(SenderId::new(1));
        let status = store
            .write(sender, &Fragment::new(6, 0, false, vec![1, 2, 3]), rules(OverrunPolicy::Clamp))
            .expect("write");
        assert!(matches!(status, WriteStatus::Buffered { opened: true }));
        assert_eq!(store.expected_size(sender), Some(6));
        assert!(!store.contains(None));
    }

    #[test]
    fn final_fragment_removes_buffer() {
        let store = BufferStore::new();
        store
            .write(None, &Fragment::new(4, 0, false, vec![1, 2]), rules(OverrunPolicy::Clamp))
            .expect("first write");
        let status = store
            .write(None, &Fragment::new(4, 2, true, vec![3, 4]), rules(OverrunPolicy::Clamp))
            .expect("final write");
        let WriteStatus::Completed(buffer) = status else {
            panic!("final fragment must complete, got {status:?}");
        };
        assert_eq!(buffer.into_bytes(), vec![1, 2, 3, 4]);
        assert!(store.is_empty());
    }

    #[test]
    fn rejected_overrun_drops_open_buffer() {
        let store = BufferStore::new();
        store
            .write(None, &Fragment::new(4, 0, false, vec![1, 2]), rules(OverrunPolicy::Reject))
            .expect("first write");
        let err = store
            .write(None, &Fragment::new(4, 2, true, vec![3, 4, 5]), rules(OverrunPolicy::Reject))
            .expect_err("overrun must be rejected");
        assert!(matches!(err, ReassemblyError::Overrun { len: 3, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn oversized_declaration_opens_nothing() {
        let store = BufferStore::new();
        let err = store
            .write(None, &Fragment::new(65, 0, false, vec![0]), rules(OverrunPolicy::Clamp))
            .expect_err("declared size above limit");
        assert!(matches!(err, ReassemblyError::MessageTooLarge { attempted: 65, .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn clear_reports_dropped_buffers() {
        let store = BufferStore::new();
        for id in 0..3 {
            store
                .write(
                    Some(SenderId::new(id)),
                    &Fragment::new(2, 0, false, vec![0]),
                    rules(OverrunPolicy::Clamp),
                )
                .expect("write");
        }
        assert_eq!(store.senders().len(), 3);
        assert_eq!(store.clear(), 3);
        assert!(store.is_empty());
    }
}
