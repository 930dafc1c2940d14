use bytes::Bytes;

use crate::packed::{ENTRY_HDR_SIZE, SEQ_HDR_SIZE};

/// What the quicklist needs from a node payload: an ordered sequence of
/// opaque byte entries with positional access, plus a flat byte image the
/// compressor can work on. The real packed binary format lives outside
/// this crate; anything implementing this trait can back a node.
pub trait PackedSequence: Default + Clone {
    fn append(&mut self, value: &[u8]);
    fn prepend(&mut self, value: &[u8]);
    /// Insert before the entry at `offset`; `offset == entry_count()` appends.
    fn insert_at(&mut self, offset: usize, value: &[u8]);
    fn delete_range(&mut self, offset: usize, count: usize);
    fn entry_at(&self, offset: usize) -> Option<Bytes>;
    /// Byte size of the flat image `to_bytes` would produce.
    fn byte_size(&self) -> usize;
    fn entry_count(&self) -> usize;
    /// Flat image handed to the compressor when the node goes cold.
    fn to_bytes(&self) -> Vec<u8>;
    /// Rebuild from a flat image after decompression. The image comes from
    /// our own `to_bytes`, so a malformed one is a consistency violation.
    fn from_bytes(data: &[u8]) -> Self;
}

/// Stand-in payload: entries held individually, flat image assembled on
/// demand. `byte_size` is kept incrementally so the fill policy never has
/// to materialize the image.
#[derive(Clone, Debug, Default)]
pub struct VecSequence {
    entries: Vec<Bytes>,
    entry_bytes: usize,
}

impl PackedSequence for VecSequence {
    fn append(&mut self, value: &[u8]) {
        self.entry_bytes += ENTRY_HDR_SIZE + value.len();
        self.entries.push(Bytes::copy_from_slice(value));
    }

    fn prepend(&mut self, value: &[u8]) {
        self.insert_at(0, value);
    }

    fn insert_at(&mut self, offset: usize, value: &[u8]) {
        self.entry_bytes += ENTRY_HDR_SIZE + value.len();
        self.entries.insert(offset, Bytes::copy_from_slice(value));
    }

    fn delete_range(&mut self, offset: usize, count: usize) {
        for entry in self.entries.drain(offset..offset + count) {
            self.entry_bytes -= ENTRY_HDR_SIZE + entry.len();
        }
    }

    fn entry_at(&self, offset: usize) -> Option<Bytes> {
        self.entries.get(offset).cloned()
    }

    fn byte_size(&self) -> usize {
        SEQ_HDR_SIZE + self.entry_bytes
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_size());
        buf.extend_from_slice(&(self.entries.len() as u32).to_le_bytes());
        for entry in &self.entries {
            buf.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            buf.extend_from_slice(entry);
        }
        buf
    }

    fn from_bytes(data: &[u8]) -> Self {
        assert!(data.len() >= SEQ_HDR_SIZE, "sequence image shorter than header");
        let count = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;
        let mut entries = Vec::with_capacity(count);
        let mut entry_bytes = 0;
        let mut at = SEQ_HDR_SIZE;
        for _ in 0..count {
            assert!(at + ENTRY_HDR_SIZE <= data.len(), "truncated entry header");
            let len = u32::from_le_bytes(data[at..at + 4].try_into().unwrap()) as usize;
            at += ENTRY_HDR_SIZE;
            assert!(at + len <= data.len(), "truncated entry body");
            entries.push(Bytes::copy_from_slice(&data[at..at + len]));
            at += len;
            entry_bytes += ENTRY_HDR_SIZE + len;
        }
        assert_eq!(at, data.len(), "trailing bytes after last entry");
        Self {
            entries,
            entry_bytes,
        }
    }
}
