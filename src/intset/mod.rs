pub mod error;
pub mod intset;
mod lib;

pub use self::lib::value_encoding;

/// on-disk width tags, shared with the serialized blob header
const INTSET_ENC_INT16: u32 = 2;
const INTSET_ENC_INT32: u32 = 4;
const INTSET_ENC_INT64: u32 = 8;

/// blob header: 4-byte encoding tag + 4-byte length
const INTSET_HDR_SIZE: usize = 8;
