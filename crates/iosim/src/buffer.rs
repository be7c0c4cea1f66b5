//! Append-only byte buffer drained whole by the pump.

use bytes::{Bytes, BytesMut};

/// In-memory byte sink standing in for one direction of a socket.
///
/// Writes append to the end. [`read_and_clear`](Self::read_and_clear) hands
/// back everything written since the previous drain and leaves the buffer
/// empty.
///
/// # Invariants
///
/// - After `read_and_clear` the buffer is empty, whatever it held before
/// - Once closed, the buffer never fails: reads yield empty `Bytes` and
///   writes are discarded (both logged)
#[derive(Debug)]
pub struct DuplexBuffer {
    /// Pending bytes. `None` once the storage has been released.
    storage: Option<BytesMut>,
}

impl DuplexBuffer {
    /// Create an empty, open buffer.
    pub fn new() -> Self {
        Self { storage: Some(BytesMut::new()) }
    }

    /// Append bytes to the end of the buffer.
    pub fn write(&mut self, data: &[u8]) {
        match self.storage.as_mut() {
            Some(storage) => storage.extend_from_slice(data),
            None => {
                tracing::warn!(bytes = data.len(), "write to closed buffer discarded");
            },
        }
    }

    /// Take every byte written since the last drain and reset to empty.
    ///
    /// A closed buffer yields empty `Bytes`. Transport teardown can race the
    /// final flush, so this is logged but never treated as a failure.
    pub fn read_and_clear(&mut self) -> Bytes {
        match self.storage.as_mut() {
            Some(storage) => storage.split().freeze(),
            None => {
                tracing::warn!("read from closed buffer, treating as empty (early close)");
                Bytes::new()
            },
        }
    }

    /// Copy of the pending bytes, without draining.
    pub fn contents(&self) -> Bytes {
        self.storage.as_ref().map(|s| Bytes::copy_from_slice(s)).unwrap_or_default()
    }

    /// Number of pending bytes.
    pub fn len(&self) -> usize {
        self.storage.as_ref().map_or(0, BytesMut::len)
    }

    /// True if nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release the storage. Pending bytes are dropped.
    pub fn close(&mut self) {
        self.storage = None;
    }

    /// True once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.storage.is_none()
    }
}

impl Default for DuplexBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn drain_returns_writes_in_order() {
        let mut buf = DuplexBuffer::new();
        buf.write(b"hello ");
        buf.write(b"world");

        assert_eq!(buf.len(), 11);
        assert_eq!(buf.read_and_clear(), Bytes::from_static(b"hello world"));
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_on_cleared_buffer_is_empty() {
        let mut buf = DuplexBuffer::new();
        buf.write(b"x");
        let _ = buf.read_and_clear();

        assert!(buf.read_and_clear().is_empty());
        assert!(buf.read_and_clear().is_empty());
    }

    #[test]
    fn writes_after_drain_start_fresh() {
        let mut buf = DuplexBuffer::new();
        buf.write(b"first");
        let first = buf.read_and_clear();
        buf.write(b"second");

        assert_eq!(first, Bytes::from_static(b"first"));
        assert_eq!(buf.read_and_clear(), Bytes::from_static(b"second"));
    }

    #[test]
    fn contents_does_not_drain() {
        let mut buf = DuplexBuffer::new();
        buf.write(b"abc");

        assert_eq!(buf.contents(), Bytes::from_static(b"abc"));
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn closed_buffer_reads_empty() {
        let mut buf = DuplexBuffer::new();
        buf.write(b"lost on close");
        buf.close();

        assert!(buf.is_closed());
        assert!(buf.read_and_clear().is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn closed_buffer_discards_writes() {
        let mut buf = DuplexBuffer::new();
        buf.close();
        buf.write(b"ignored");

        assert_eq!(buf.len(), 0);
        assert!(buf.contents().is_empty());
    }

    #[test]
    fn default_buffer_is_open() {
        let mut buf = DuplexBuffer::default();
        buf.write(b"ok");
        assert!(!buf.is_closed());
        assert_eq!(buf.len(), 2);
    }

    proptest! {
        #[test]
        fn drain_concatenates_all_writes(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 0..16)) {
            let mut buf = DuplexBuffer::new();
            for chunk in &chunks {
                buf.write(chunk);
            }

            let expected: Vec<u8> = chunks.concat();
            prop_assert_eq!(&buf.read_and_clear()[..], expected.as_slice());
            prop_assert!(buf.is_empty());
        }
    }
}
