pub mod sequence;

/// flat-image framing: entry count header, then a length prefix per entry
const SEQ_HDR_SIZE: usize = 4;
const ENTRY_HDR_SIZE: usize = 4;
