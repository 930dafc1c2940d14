use bytes::Bytes;

use crate::packed::sequence::PackedSequence;
use crate::quicklist::quicklist::QuickList;
use crate::quicklist::{Direction, NodeId};

/// Cursor over a quicklist. Borrows the list mutably: traversal
/// decompresses cold nodes on entry and settles them again on exit, the
/// same as direct access. Deleting the entry the cursor just returned is
/// the only structural mutation that is safe mid-iteration.
pub struct QuickListIter<'a, S: PackedSequence> {
    list: &'a mut QuickList<S>,
    current: Option<NodeId>,
    /// offset of the next entry to return within the current node
    offset: usize,
    direction: Direction,
    /// position of the entry most recently returned by `next`
    last: Option<(NodeId, usize)>,
}

impl<S: PackedSequence> QuickList<S> {
    pub fn iter(&mut self, direction: Direction) -> QuickListIter<'_, S> {
        let current = if self.count == 0 {
            None
        } else {
            match direction {
                Direction::Head => self.head,
                Direction::Tail => self.tail,
            }
        };
        let offset = match (direction, current) {
            (Direction::Tail, Some(id)) => self.node(id).count - 1,
            _ => 0,
        };
        QuickListIter {
            list: self,
            current,
            offset,
            direction,
            last: None,
        }
    }

    /// Iterator positioned on the entry at logical `index`; None when the
    /// index is out of range.
    pub fn iter_at(&mut self, direction: Direction, index: i64) -> Option<QuickListIter<'_, S>> {
        let (node, offset) = self.locate_inner(index)?;
        Some(QuickListIter {
            list: self,
            current: Some(node),
            offset,
            direction,
            last: None,
        })
    }
}

impl<S: PackedSequence> Iterator for QuickListIter<'_, S> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        let id = self.current?;
        self.list.decompress_node_for_use(id);

        let (entry, node_count, neighbor) = {
            let node = self.list.node(id);
            let entry = node.raw().entry_at(self.offset)?;
            let neighbor = match self.direction {
                Direction::Head => node.next,
                Direction::Tail => node.prev,
            };
            (entry, node.count, neighbor)
        };
        self.last = Some((id, self.offset));

        match self.direction {
            Direction::Head => {
                if self.offset + 1 < node_count {
                    self.offset += 1;
                } else {
                    self.list.compress(id);
                    self.current = neighbor;
                    self.offset = 0;
                }
            }
            Direction::Tail => {
                if self.offset > 0 {
                    self.offset -= 1;
                } else {
                    self.list.compress(id);
                    self.current = neighbor;
                    self.offset = match neighbor {
                        Some(p) => self.list.node(p).count - 1,
                        None => 0,
                    };
                }
            }
        }
        Some(entry)
    }
}

impl<S: PackedSequence> QuickListIter<'_, S> {
    /// Remove the entry most recently returned by `next` and repair the
    /// cursor, so iteration continues with the logical successor (forward)
    /// or predecessor (reverse). A second call without an intervening
    /// `next` is a no-op.
    pub fn delete_current(&mut self) {
        let (id, offset) = match self.last.take() {
            Some(position) => position,
            None => return,
        };
        let next = self.list.node(id).next;
        // the cursor may already have left the node and settled it
        self.list.decompress_node_for_use(id);
        let deleted = self.list.del_index(id, offset);

        match self.direction {
            Direction::Head => {
                if deleted {
                    self.current = next;
                    self.offset = 0;
                } else if self.current == Some(id) {
                    // the successor slid into the freed slot
                    self.offset = offset;
                } else {
                    self.list.recompress_only(id);
                }
            }
            Direction::Tail => {
                // entries below the deleted offset keep their positions, and
                // a deleted node implies the cursor already moved to its prev
                if !deleted && self.current != Some(id) {
                    self.list.recompress_only(id);
                }
            }
        }
    }
}

impl<S: PackedSequence> Drop for QuickListIter<'_, S> {
    fn drop(&mut self) {
        if let Some(id) = self.current {
            self.list.compress(id);
        }
    }
}
