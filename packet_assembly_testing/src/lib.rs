//! Utilities for driving a [`Reassembler`] and [`Fragmenter`] during tests.
//!
//! ```rust
//! use packet_assembly::{Document, Fragmenter, GzipCodec, Reassembler};
//! use packet_assembly_testing::{document_of_size, feed_in_order};
//!
//! let doc = document_of_size(4096);
//! let fragmenter = Fragmenter::new(std::num::NonZeroUsize::new(512).unwrap(), GzipCodec::default());
//! let reassembler = Reassembler::new(GzipCodec::default());
//! let batch = fragmenter.split(&doc).unwrap();
//! let rebuilt: Option<Document> = feed_in_order(&reassembler, None, batch).unwrap();
//! assert_eq!(rebuilt, Some(doc));
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use packet_assembly::{
    CodecError,
    Compression,
    Document,
    Fragment,
    Message,
    Reassembler,
    ReassemblyError,
    ReassemblyOutcome,
    SenderId,
    Tag,
};

/// Feed `fragments` to `reassembler` for `sender` in order.
///
/// Returns the completed payload, or `None` if no fragment completed the
/// transmission.
///
/// # Errors
///
/// Returns the first [`ReassemblyError`] raised.
///
/// # Panics
///
/// Panics if a fragment other than the last completes the transmission.
pub fn feed_in_order<M, C, I>(
    reassembler: &Reassembler<C>,
    sender: Option<SenderId>,
    fragments: I,
) -> Result<Option<M>, ReassemblyError>
where
    M: Message,
    C: Compression,
    I: IntoIterator<Item = Fragment>,
{
    let mut fragments = fragments.into_iter().peekable();
    while let Some(fragment) = fragments.next() {
        let outcome = reassembler.accept::<M>(sender, fragment)?;
        let is_last = fragments.peek().is_none();
        match outcome {
            ReassemblyOutcome::Complete(message) => {
                assert!(is_last, "transmission completed before its last fragment");
                return Ok(Some(message));
            }
            ReassemblyOutcome::Incomplete => {}
        }
    }
    Ok(None)
}

/// Deterministic bytes that gzip cannot shrink meaningfully.
#[must_use]
pub fn incompressible_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state.to_le_bytes()[0]
        })
        .collect()
}

/// Build a [`Document`] whose serialized form is at least `approx_bytes`
/// long, mixing structured entries with an incompressible blob.
#[must_use]
pub fn document_of_size(approx_bytes: usize) -> Document {
    let mut doc = Document::new();
    let mut meta = Document::new();
    meta.insert("version", Tag::Int(3));
    meta.insert("title", Tag::String("fixture".to_owned()));
    doc.insert("meta", Tag::Compound(meta));
    doc.insert(
        "blob",
        Tag::ByteArray(incompressible_bytes(approx_bytes, approx_bytes as u64)),
    );
    doc
}

/// Round-robin interleaving of several per-sender fragment queues.
///
/// Each sender's relative order is preserved.
#[must_use]
pub fn interleave<T>(lanes: Vec<Vec<T>>) -> Vec<(usize, T)> {
    let mut iters: Vec<_> = lanes.into_iter().map(Vec::into_iter).collect();
    let mut out = Vec::new();
    loop {
        let mut progressed = false;
        for (lane, iter) in iters.iter_mut().enumerate() {
            if let Some(item) = iter.next() {
                out.push((lane, item));
                progressed = true;
            }
        }
        if !progressed {
            return out;
        }
    }
}

/// Codec wrapper that counts how often each direction runs.
#[derive(Debug, Default)]
pub struct CountingCodec<C> {
    inner: C,
    compressions: AtomicUsize,
    decompressions: AtomicUsize,
}

impl<C> CountingCodec<C> {
    /// Wrap `inner`.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            compressions: AtomicUsize::new(0),
            decompressions: AtomicUsize::new(0),
        }
    }

    /// Number of `compress` calls so far.
    pub fn compressions(&self) -> usize { self.compressions.load(Ordering::SeqCst) }

    /// Number of `decompress` calls so far.
    pub fn decompressions(&self) -> usize { self.decompressions.load(Ordering::SeqCst) }
}

impl<C: Compression> Compression for CountingCodec<C> {
    fn name(&self) -> &'static str { self.inner.name() }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.compressions.fetch_add(1, Ordering::SeqCst);
        self.inner.compress(input)
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        self.decompressions.fetch_add(1, Ordering::SeqCst);
        self.inner.decompress(input)
    }
}

impl<C: Compression> Compression for &CountingCodec<C> {
    fn name(&self) -> &'static str { (**self).name() }

    fn compress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> { (**self).compress(input) }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        (**self).decompress(input)
    }
}
