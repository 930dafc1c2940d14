use rand::Rng;
use tracing::trace;

use crate::intset::error::IntSetError;
use crate::intset::lib::value_encoding;
use crate::intset::{INTSET_ENC_INT16, INTSET_ENC_INT32, INTSET_ENC_INT64, INTSET_HDR_SIZE};

/// Per-element byte width. Ordered so a required encoding can be compared
/// against the current one: Int16 < Int32 < Int64.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Encoding {
    Int16,
    Int32,
    Int64,
}

impl Encoding {
    pub fn width(self) -> usize {
        match self {
            Encoding::Int16 => 2,
            Encoding::Int32 => 4,
            Encoding::Int64 => 8,
        }
    }

    fn tag(self) -> u32 {
        match self {
            Encoding::Int16 => INTSET_ENC_INT16,
            Encoding::Int32 => INTSET_ENC_INT32,
            Encoding::Int64 => INTSET_ENC_INT64,
        }
    }

    fn from_tag(tag: u32) -> Option<Encoding> {
        match tag {
            INTSET_ENC_INT16 => Some(Encoding::Int16),
            INTSET_ENC_INT32 => Some(Encoding::Int32),
            INTSET_ENC_INT64 => Some(Encoding::Int64),
            _ => None,
        }
    }
}

/// Backing storage at the current width. The whole array is rewritten when
/// the encoding upgrades; it never narrows back.
#[derive(Clone, Debug)]
enum Contents {
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
}

/// Sorted, duplicate-free set of 64-bit integers stored at the minimal
/// width covering every member.
#[derive(Clone, Debug)]
pub struct IntSet {
    contents: Contents,
}

impl IntSet {
    pub fn new() -> Self {
        Self {
            contents: Contents::Int16(Vec::new()),
        }
    }

    pub fn encoding(&self) -> Encoding {
        match &self.contents {
            Contents::Int16(_) => Encoding::Int16,
            Contents::Int32(_) => Encoding::Int32,
            Contents::Int64(_) => Encoding::Int64,
        }
    }

    pub fn len(&self) -> usize {
        match &self.contents {
            Contents::Int16(v) => v.len(),
            Contents::Int32(v) => v.len(),
            Contents::Int64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_at(&self, pos: usize) -> i64 {
        match &self.contents {
            Contents::Int16(v) => v[pos] as i64,
            Contents::Int32(v) => v[pos] as i64,
            Contents::Int64(v) => v[pos],
        }
    }

    /// Binary search for `value`. `Ok(pos)` when present, `Err(pos)` with
    /// the insertion position otherwise. The two boundary checks before the
    /// loop make append/prepend O(1), which is the common case.
    pub fn search(&self, value: i64) -> Result<usize, usize> {
        let len = self.len();
        if len == 0 {
            return Err(0);
        }
        if value > self.get_at(len - 1) {
            return Err(len);
        } else if value < self.get_at(0) {
            return Err(0);
        }

        let mut min: i64 = 0;
        let mut max: i64 = len as i64 - 1;
        let mut mid: i64 = 0;
        let mut cur: i64 = -1;
        while max >= min {
            mid = (min + max) >> 1;
            cur = self.get_at(mid as usize);
            if value > cur {
                min = mid + 1;
            } else if value < cur {
                max = mid - 1;
            } else {
                break;
            }
        }

        if value == cur {
            Ok(mid as usize)
        } else {
            Err(min as usize)
        }
    }

    fn insert_at(&mut self, pos: usize, value: i64) {
        match &mut self.contents {
            Contents::Int16(v) => v.insert(pos, value as i16),
            Contents::Int32(v) => v.insert(pos, value as i32),
            Contents::Int64(v) => v.insert(pos, value),
        }
    }

    /// Widen every element to the encoding `value` requires, then place
    /// `value` at the head or tail. The upgrade is only reached for a value
    /// outside the old encoding's range, so it is the new minimum or the
    /// new maximum and no search is needed.
    fn upgrade_and_add(&mut self, value: i64) {
        let new_encoding = value_encoding(value);
        debug_assert!(new_encoding > self.encoding());
        trace!(
            from = ?self.encoding(),
            to = ?new_encoding,
            value,
            "intset encoding upgrade"
        );

        let prepend = value < 0;
        self.contents = match (&self.contents, new_encoding) {
            (Contents::Int16(old), Encoding::Int32) => {
                let mut v = Vec::with_capacity(old.len() + 1);
                if prepend {
                    v.push(value as i32);
                }
                v.extend(old.iter().map(|&x| x as i32));
                if !prepend {
                    v.push(value as i32);
                }
                Contents::Int32(v)
            }
            (Contents::Int16(old), Encoding::Int64) => {
                let mut v = Vec::with_capacity(old.len() + 1);
                if prepend {
                    v.push(value);
                }
                v.extend(old.iter().map(|&x| x as i64));
                if !prepend {
                    v.push(value);
                }
                Contents::Int64(v)
            }
            (Contents::Int32(old), Encoding::Int64) => {
                let mut v = Vec::with_capacity(old.len() + 1);
                if prepend {
                    v.push(value);
                }
                v.extend(old.iter().map(|&x| x as i64));
                if !prepend {
                    v.push(value);
                }
                Contents::Int64(v)
            }
            _ => unreachable!("upgrade to a narrower or equal encoding"),
        };
    }

    /// Insert `value`, keeping the array sorted. Returns false when the
    /// value was already present.
    pub fn add(&mut self, value: i64) -> bool {
        if value_encoding(value) > self.encoding() {
            self.upgrade_and_add(value);
            return true;
        }
        match self.search(value) {
            Ok(_) => false,
            Err(pos) => {
                self.insert_at(pos, value);
                true
            }
        }
    }

    /// Remove `value` if present, closing the gap. The encoding never
    /// narrows, even when the widest members are gone.
    pub fn remove(&mut self, value: i64) -> bool {
        if value_encoding(value) <= self.encoding() {
            if let Ok(pos) = self.search(value) {
                match &mut self.contents {
                    Contents::Int16(v) => {
                        v.remove(pos);
                    }
                    Contents::Int32(v) => {
                        v.remove(pos);
                    }
                    Contents::Int64(v) => {
                        v.remove(pos);
                    }
                }
                return true;
            }
        }
        false
    }

    pub fn find(&self, value: i64) -> bool {
        value_encoding(value) <= self.encoding() && self.search(value).is_ok()
    }

    pub fn random_member(&self) -> Result<i64, IntSetError> {
        if self.is_empty() {
            return Err(IntSetError::EmptyCollection);
        }
        let mut rng = rand::rng();
        Ok(self.get_at(rng.random_range(0..self.len())))
    }

    pub fn get(&self, pos: usize) -> Option<i64> {
        if pos < self.len() {
            return Some(self.get_at(pos));
        }
        None
    }

    pub fn min(&self) -> Option<i64> {
        if self.is_empty() {
            return None;
        }
        Some(self.get_at(0))
    }

    pub fn max(&self) -> Option<i64> {
        if self.is_empty() {
            return None;
        }
        Some(self.get_at(self.len() - 1))
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len()).map(move |i| self.get_at(i))
    }

    /// Size of the serialized blob: header plus one slot per element.
    pub fn serialized_size(&self) -> usize {
        INTSET_HDR_SIZE + self.len() * self.encoding().width()
    }

    /// Serialize to the canonical little-endian layout:
    /// `[encoding: u32][length: u32][elements at the encoded width]`.
    /// The result is byte-identical on every host.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.serialized_size());
        buf.extend_from_slice(&self.encoding().tag().to_le_bytes());
        buf.extend_from_slice(&(self.len() as u32).to_le_bytes());
        match &self.contents {
            Contents::Int16(v) => {
                for x in v {
                    buf.extend_from_slice(&x.to_le_bytes());
                }
            }
            Contents::Int32(v) => {
                for x in v {
                    buf.extend_from_slice(&x.to_le_bytes());
                }
            }
            Contents::Int64(v) => {
                for x in v {
                    buf.extend_from_slice(&x.to_le_bytes());
                }
            }
        }
        buf
    }

    /// Parse a blob produced by `to_bytes`. Rejects unknown width tags,
    /// truncated bodies and out-of-order elements.
    pub fn from_bytes(data: &[u8]) -> Result<Self, IntSetError> {
        if data.len() < INTSET_HDR_SIZE {
            return Err(IntSetError::Corrupt("blob shorter than header"));
        }
        let tag = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let length = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
        let encoding = match Encoding::from_tag(tag) {
            Some(enc) => enc,
            None => return Err(IntSetError::Corrupt("unknown encoding tag")),
        };
        if data.len() != INTSET_HDR_SIZE + length * encoding.width() {
            return Err(IntSetError::Corrupt("body length mismatch"));
        }

        let body = &data[INTSET_HDR_SIZE..];
        let contents = match encoding {
            Encoding::Int16 => Contents::Int16(
                body.chunks_exact(2)
                    .map(|c| i16::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
            Encoding::Int32 => Contents::Int32(
                body.chunks_exact(4)
                    .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
            Encoding::Int64 => Contents::Int64(
                body.chunks_exact(8)
                    .map(|c| i64::from_le_bytes(c.try_into().unwrap()))
                    .collect(),
            ),
        };

        let is = Self { contents };
        for i in 1..is.len() {
            if is.get_at(i - 1) >= is.get_at(i) {
                return Err(IntSetError::Corrupt("elements not strictly ascending"));
            }
        }
        Ok(is)
    }
}

impl Default for IntSet {
    fn default() -> Self {
        Self::new()
    }
}
