pub mod intset;
pub mod packed;
pub mod quicklist;

pub use crate::intset::error::IntSetError;
pub use crate::intset::intset::{Encoding, IntSet};
pub use crate::packed::sequence::{PackedSequence, VecSequence};
pub use crate::quicklist::iter::QuickListIter;
pub use crate::quicklist::quicklist::{Location, QuickList};
pub use crate::quicklist::Direction;
