use crate::quicklist::{MIN_COMPRESS_BYTES, MIN_COMPRESS_IMPROVE};

/// LZF-compress a raw payload image. `None` when compression is not
/// worthwhile: the payload is too small, LZF cannot shrink it, or the win
/// is under the improvement threshold. The caller keeps the node raw.
pub(crate) fn compress_payload(raw: &[u8]) -> Option<Vec<u8>> {
    if raw.len() < MIN_COMPRESS_BYTES {
        return None;
    }
    let compressed = match lzf::compress(raw) {
        Ok(blob) => blob,
        Err(_) => return None,
    };
    if compressed.len() + MIN_COMPRESS_IMPROVE >= raw.len() {
        return None;
    }
    Some(compressed)
}

/// Reverse of `compress_payload`. The blob and expected size both come
/// from this structure's own bookkeeping, so any mismatch is a fatal
/// consistency violation, not a recoverable error.
pub(crate) fn decompress_payload(blob: &[u8], expected: usize) -> Vec<u8> {
    let raw = lzf::decompress(blob, expected).expect("corrupt compressed quicklist node");
    assert_eq!(raw.len(), expected, "decompressed node size mismatch");
    raw
}
