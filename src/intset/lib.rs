use crate::intset::intset::Encoding;

/// Smallest width able to hold `v`.
pub fn value_encoding(v: i64) -> Encoding {
    if v < i32::MIN as i64 || v > i32::MAX as i64 {
        Encoding::Int64
    } else if v < i16::MIN as i64 || v > i16::MAX as i64 {
        Encoding::Int32
    } else {
        Encoding::Int16
    }
}
