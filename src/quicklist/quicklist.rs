use bytes::Bytes;
use tracing::trace;

use crate::packed::sequence::{PackedSequence, VecSequence};
use crate::quicklist::lib::{compress_payload, decompress_payload};
use crate::quicklist::{
    is_large_element, node_exceeds_limit, Direction, NodeId, COMPRESS_MAX, FILL_MAX,
    SIZE_ESTIMATE_OVERHEAD,
};

/// Node payload at rest: the raw sequence, or the LZF image of its flat
/// byte form.
#[derive(Clone)]
pub(crate) enum Payload<S> {
    Raw(S),
    Compressed(Vec<u8>),
}

pub struct QuickListNode<S: PackedSequence> {
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
    pub(crate) payload: Payload<S>,
    /// raw payload size in bytes, kept while compressed; also the exact
    /// decompression size
    pub(crate) sz: usize,
    /// count of entries in the payload
    pub(crate) count: usize,
    /// temporarily decompressed for an access; owes a recompress
    pub(crate) recompress: bool,
}

impl<S: PackedSequence> QuickListNode<S> {
    fn from_value(value: &[u8]) -> Self {
        let mut seq = S::default();
        seq.append(value);
        let sz = seq.byte_size();
        Self {
            prev: None,
            next: None,
            payload: Payload::Raw(seq),
            sz,
            count: 1,
            recompress: false,
        }
    }

    pub(crate) fn is_compressed(&self) -> bool {
        matches!(self.payload, Payload::Compressed(_))
    }

    pub(crate) fn raw(&self) -> &S {
        match &self.payload {
            Payload::Raw(seq) => seq,
            Payload::Compressed(_) => panic!("node payload is compressed"),
        }
    }

    fn raw_mut(&mut self) -> &mut S {
        match &mut self.payload {
            Payload::Raw(seq) => seq,
            Payload::Compressed(_) => panic!("node payload is compressed"),
        }
    }

    fn update_sz(&mut self) {
        self.sz = self.raw().byte_size();
    }

    /// Compress in place when worthwhile. Clears the recompress debt either
    /// way; a payload LZF cannot shrink stays raw.
    fn try_compress(&mut self) -> bool {
        self.recompress = false;
        let image = match &self.payload {
            Payload::Raw(seq) => seq.to_bytes(),
            Payload::Compressed(_) => return false,
        };
        match compress_payload(&image) {
            Some(blob) => {
                self.payload = Payload::Compressed(blob);
                true
            }
            None => false,
        }
    }

    fn decompress(&mut self) {
        if let Payload::Compressed(blob) = &self.payload {
            let image = decompress_payload(blob, self.sz);
            self.payload = Payload::Raw(S::from_bytes(&image));
        }
    }
}

/// Handle to a located entry, produced by `locate` or carried by the
/// iterator. Valid until the next structural mutation of the list.
#[derive(Clone, Copy, Debug)]
pub struct Location {
    pub(crate) node: NodeId,
    pub(crate) offset: usize,
}

/// Doubly linked chain of capacity-bounded nodes, each holding a packed
/// sequence of entries. Interior nodes beyond the configured depth are
/// kept LZF-compressed while at rest. Links are arena indices; the arena
/// owns every node.
pub struct QuickList<S: PackedSequence = VecSequence> {
    pub(crate) nodes: Vec<Option<QuickListNode<S>>>,
    free: Vec<NodeId>,
    pub(crate) head: Option<NodeId>,
    pub(crate) tail: Option<NodeId>,
    /// total count of all entries in all nodes
    pub(crate) count: u64,
    /// number of linked nodes
    pub(crate) len: u64,
    /// fill factor for individual nodes
    pub(crate) fill: i32,
    /// depth of end nodes not to compress; 0 disables compression
    pub(crate) compress: u32,
}

impl<S: PackedSequence> QuickList<S> {
    pub fn create() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            count: 0,
            len: 0,
            fill: -2,
            compress: 0,
        }
    }

    pub fn new(fill: i32, depth: i32) -> Self {
        let mut list = Self::create();
        list.set_options(fill, depth);
        list
    }

    pub fn set_fill(&mut self, mut fill: i32) {
        if fill > FILL_MAX {
            fill = FILL_MAX;
        } else if fill < -5 {
            fill = -5;
        } else if fill == 0 {
            fill = 1;
        }
        self.fill = fill;
    }

    pub fn set_compress_depth(&mut self, depth: i32) {
        let mut depth = depth.max(0) as u32;
        if depth > COMPRESS_MAX {
            depth = COMPRESS_MAX;
        }
        self.compress = depth;
    }

    pub fn set_options(&mut self, fill: i32, depth: i32) {
        self.set_fill(fill);
        self.set_compress_depth(depth);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn node_count(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub(crate) fn node(&self, id: NodeId) -> &QuickListNode<S> {
        self.nodes[id].as_ref().expect("stale node id")
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut QuickListNode<S> {
        self.nodes[id].as_mut().expect("stale node id")
    }

    fn alloc(&mut self, node: QuickListNode<S>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Some(node);
                id
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) -> QuickListNode<S> {
        let node = self.nodes[id].take().expect("stale node id");
        self.free.push(id);
        node
    }

    pub(crate) fn decompress_node(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        if node.is_compressed() {
            node.decompress();
            node.recompress = false;
        }
    }

    pub(crate) fn decompress_node_for_use(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        if node.is_compressed() {
            node.decompress();
            node.recompress = true;
        }
    }

    pub(crate) fn compress_node(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        if !node.is_compressed() {
            node.try_compress();
        }
    }

    /// Re-establish the compression zone around `target`: walk `compress`
    /// nodes in from both ends keeping them raw, then compress the first
    /// interior node on each side, and `target` itself when it lies deeper
    /// than the zone.
    fn zone_compress(&mut self, target: Option<NodeId>) {
        if self.len == 0 {
            return;
        }
        debug_assert!(
            !self.node(self.head.unwrap()).recompress && !self.node(self.tail.unwrap()).recompress
        );
        if self.compress == 0 || self.len < self.compress as u64 * 2 {
            return;
        }

        let mut forward = self.head;
        let mut reverse = self.tail;
        let mut in_depth = false;
        let mut depth = 0;
        while depth < self.compress {
            depth += 1;
            let f = forward.expect("zone walk ran off the chain");
            let r = reverse.expect("zone walk ran off the chain");
            self.decompress_node(f);
            self.decompress_node(r);

            if Some(f) == target || Some(r) == target {
                in_depth = true;
            }
            if f == r || self.node(f).next == Some(r) {
                return;
            }
            forward = self.node(f).next;
            reverse = self.node(r).prev;
        }
        if !in_depth {
            if let Some(t) = target {
                self.compress_node(t);
            }
        }
        self.compress_node(forward.expect("zone walk ran off the chain"));
        self.compress_node(reverse.expect("zone walk ran off the chain"));
    }

    /// Settle a node after an access: pay the recompress debt if one is
    /// owed, otherwise re-evaluate the zone around it.
    pub(crate) fn compress(&mut self, id: NodeId) {
        if self.node(id).recompress {
            self.compress_node(id);
        } else {
            self.zone_compress(Some(id));
        }
    }

    pub(crate) fn recompress_only(&mut self, id: NodeId) {
        if self.node(id).recompress {
            self.compress_node(id);
        }
    }

    fn insert_node(&mut self, old: Option<NodeId>, new_id: NodeId, after: bool) {
        if after {
            self.node_mut(new_id).prev = old;
            if let Some(old_id) = old {
                let old_next = self.node(old_id).next;
                self.node_mut(new_id).next = old_next;
                if let Some(n) = old_next {
                    self.node_mut(n).prev = Some(new_id);
                }
                self.node_mut(old_id).next = Some(new_id);
            }
            if self.tail == old {
                self.tail = Some(new_id);
            }
        } else {
            self.node_mut(new_id).next = old;
            if let Some(old_id) = old {
                let old_prev = self.node(old_id).prev;
                self.node_mut(new_id).prev = old_prev;
                if let Some(p) = old_prev {
                    self.node_mut(p).next = Some(new_id);
                }
                self.node_mut(old_id).prev = Some(new_id);
            }
            if self.head == old {
                self.head = Some(new_id);
            }
        }
        if self.len == 0 {
            self.head = Some(new_id);
            self.tail = Some(new_id);
        }
        self.len += 1;

        if let Some(old_id) = old {
            self.compress(old_id);
        }
        self.compress(new_id);
    }

    pub(crate) fn del_node(&mut self, id: NodeId) {
        let node = self.release(id);
        if let Some(next) = node.next {
            self.node_mut(next).prev = node.prev;
        }
        if let Some(prev) = node.prev {
            self.node_mut(prev).next = node.next;
        }
        if self.tail == Some(id) {
            self.tail = node.prev;
        }
        if self.head == Some(id) {
            self.head = node.next;
        }
        self.len -= 1;
        self.count -= node.count as u64;
        // removing a node may pull a compressed one into the uncompressed zone
        self.zone_compress(None);
    }

    /// Can `value` join the node without breaking the fill policy?
    fn allow_insert(&self, id: NodeId, sz: usize) -> bool {
        if is_large_element(sz, self.fill) {
            return false;
        }
        let node = self.node(id);
        let new_sz = node.sz + sz + SIZE_ESTIMATE_OVERHEAD;
        !node_exceeds_limit(self.fill, new_sz, node.count + 1)
    }

    fn allow_merge(&self, a: NodeId, b: NodeId) -> bool {
        let a = self.node(a);
        let b = self.node(b);
        !node_exceeds_limit(self.fill, a.sz + b.sz, a.count + b.count)
    }

    /// Prepend at the head node, or start a new head node when the current
    /// one is at capacity. Returns true when a node was created.
    pub fn push_head(&mut self, value: &[u8]) -> bool {
        match self.head {
            Some(h) if self.allow_insert(h, value.len()) => {
                self.decompress_node(h);
                let node = self.node_mut(h);
                node.raw_mut().prepend(value);
                node.count += 1;
                node.update_sz();
                self.count += 1;
                false
            }
            _ => {
                let new_id = self.alloc(QuickListNode::from_value(value));
                self.count += 1;
                let old = self.head;
                self.insert_node(old, new_id, false);
                true
            }
        }
    }

    /// Append at the tail node, or start a new tail node when the current
    /// one is at capacity. Returns true when a node was created.
    pub fn push_tail(&mut self, value: &[u8]) -> bool {
        match self.tail {
            Some(t) if self.allow_insert(t, value.len()) => {
                self.decompress_node(t);
                let node = self.node_mut(t);
                node.raw_mut().append(value);
                node.count += 1;
                node.update_sz();
                self.count += 1;
                false
            }
            _ => {
                let new_id = self.alloc(QuickListNode::from_value(value));
                self.count += 1;
                let old = self.tail;
                self.insert_node(old, new_id, true);
                true
            }
        }
    }

    pub fn push(&mut self, value: &[u8], direction: Direction) -> bool {
        match direction {
            Direction::Head => self.push_head(value),
            Direction::Tail => self.push_tail(value),
        }
    }

    /// Remove and return the boundary entry. A node emptied by the pop is
    /// unlinked unless it is the sole remaining node.
    pub fn pop(&mut self, direction: Direction) -> Option<Bytes> {
        if self.count == 0 {
            return None;
        }
        let id = match direction {
            Direction::Head => self.head?,
            Direction::Tail => self.tail?,
        };
        self.decompress_node(id);
        let node = self.node(id);
        let offset = match direction {
            Direction::Head => 0,
            Direction::Tail => node.count - 1,
        };
        let entry = node.raw().entry_at(offset).expect("entry count out of sync");
        self.del_index(id, offset);
        Some(entry)
    }

    pub fn pop_head(&mut self) -> Option<Bytes> {
        self.pop(Direction::Head)
    }

    pub fn pop_tail(&mut self) -> Option<Bytes> {
        self.pop(Direction::Tail)
    }

    /// Delete one entry from a raw node. Returns true when the node itself
    /// was unlinked (emptied, and not the sole remaining node).
    pub(crate) fn del_index(&mut self, id: NodeId, offset: usize) -> bool {
        let node = self.node_mut(id);
        node.raw_mut().delete_range(offset, 1);
        node.count -= 1;
        node.update_sz();
        self.count -= 1;
        if self.node(id).count == 0 && self.len > 1 {
            self.del_node(id);
            true
        } else {
            false
        }
    }

    /// Walk to the node holding logical `index` (negative counts from the
    /// tail). No global offset index is kept; nodes vary in entry count.
    pub(crate) fn locate_inner(&self, index: i64) -> Option<(NodeId, usize)> {
        let forward = index >= 0;
        let mut rest = if forward {
            index as u64
        } else {
            (-(index + 1)) as u64
        };
        if rest >= self.count {
            return None;
        }
        let mut cur = if forward { self.head } else { self.tail };
        while let Some(id) = cur {
            let node_count = self.node(id).count as u64;
            if rest < node_count {
                let offset = if forward {
                    rest
                } else {
                    node_count - 1 - rest
                };
                return Some((id, offset as usize));
            }
            rest -= node_count;
            cur = if forward {
                self.node(id).next
            } else {
                self.node(id).prev
            };
        }
        None
    }

    pub fn locate(&self, index: i64) -> Option<Location> {
        let (node, offset) = self.locate_inner(index)?;
        Some(Location { node, offset })
    }

    /// Entry at logical `index`; decompresses the holding node for the read
    /// and settles it again afterwards.
    pub fn index(&mut self, index: i64) -> Option<Bytes> {
        let (id, offset) = self.locate_inner(index)?;
        self.decompress_node_for_use(id);
        let entry = self.node(id).raw().entry_at(offset);
        self.compress(id);
        entry
    }

    pub fn insert_before(&mut self, loc: &Location, value: &[u8]) {
        self.insert_entry(loc, value, false);
    }

    pub fn insert_after(&mut self, loc: &Location, value: &[u8]) {
        self.insert_entry(loc, value, true);
    }

    fn insert_entry(&mut self, loc: &Location, value: &[u8], after: bool) {
        let id = loc.node;
        let offset = loc.offset;
        let node_count = self.node(id).count;
        let next = self.node(id).next;
        let prev = self.node(id).prev;

        let full = !self.allow_insert(id, value.len());
        let at_tail = after && offset == node_count - 1;
        let at_head = !after && offset == 0;
        let avail_next = at_tail && next.is_some_and(|n| self.allow_insert(n, value.len()));
        let avail_prev = at_head && prev.is_some_and(|p| self.allow_insert(p, value.len()));

        if !full {
            self.decompress_node_for_use(id);
            let node = self.node_mut(id);
            let at = if after { offset + 1 } else { offset };
            node.raw_mut().insert_at(at, value);
            node.count += 1;
            node.update_sz();
            self.count += 1;
            self.recompress_only(id);
        } else if at_tail && avail_next {
            // after the last entry of a full node: land at the head of the
            // next node instead
            let n = next.expect("avail_next implies a next node");
            self.decompress_node_for_use(n);
            let node = self.node_mut(n);
            node.raw_mut().prepend(value);
            node.count += 1;
            node.update_sz();
            self.count += 1;
            self.recompress_only(n);
        } else if at_head && avail_prev {
            let p = prev.expect("avail_prev implies a prev node");
            self.decompress_node_for_use(p);
            let node = self.node_mut(p);
            node.raw_mut().append(value);
            node.count += 1;
            node.update_sz();
            self.count += 1;
            self.recompress_only(p);
        } else if (at_tail && next.is_none()) || (at_head && prev.is_none()) {
            // full boundary node with no neighbor: start a fresh node
            let new_id = self.alloc(QuickListNode::from_value(value));
            self.count += 1;
            self.insert_node(Some(id), new_id, after);
        } else {
            // full node, interior insert: split it and link the half that
            // receives the new entry
            self.decompress_node_for_use(id);
            let new_id = self.split_node(id, offset, after);
            let node = self.node_mut(new_id);
            if after {
                node.raw_mut().prepend(value);
            } else {
                node.raw_mut().append(value);
            }
            node.count += 1;
            node.update_sz();
            self.count += 1;
            self.insert_node(Some(id), new_id, after);
            self.merge_nodes(id);
        }
    }

    /// Split a raw node at `offset`. The original keeps the half containing
    /// the insertion point's neighbor; the new node gets the rest and is
    /// returned unlinked.
    fn split_node(&mut self, id: NodeId, offset: usize, after: bool) -> NodeId {
        let new_seq;
        {
            let node = self.node_mut(id);
            let count = node.count;
            let seq = node.raw_mut();
            let mut split = seq.clone();
            if after {
                seq.delete_range(offset + 1, count - (offset + 1));
                split.delete_range(0, offset + 1);
            } else {
                seq.delete_range(0, offset);
                split.delete_range(offset, count - offset);
            }
            node.count = node.raw().entry_count();
            node.update_sz();
            new_seq = split;
        }
        trace!(node = id, offset, after, "splitting full quicklist node");
        let count = new_seq.entry_count();
        let sz = new_seq.byte_size();
        self.alloc(QuickListNode {
            prev: None,
            next: None,
            payload: Payload::Raw(new_seq),
            sz,
            count,
            recompress: false,
        })
    }

    /// After a split-insert, try to fold small neighbors back together:
    /// (prev_prev, prev), (next, next_next), then the center against each
    /// of its sides.
    fn merge_nodes(&mut self, center: NodeId) {
        let prev = self.node(center).prev;
        let prev_prev = prev.and_then(|p| self.node(p).prev);
        if let (Some(a), Some(b)) = (prev_prev, prev) {
            if self.allow_merge(a, b) {
                self.merge(a, b);
            }
        }

        let next = self.node(center).next;
        let next_next = next.and_then(|n| self.node(n).next);
        if let (Some(a), Some(b)) = (next, next_next) {
            if self.allow_merge(a, b) {
                self.merge(a, b);
            }
        }

        let mut center = center;
        if let Some(p) = self.node(center).prev {
            if self.allow_merge(p, center) {
                center = self.merge(p, center);
            }
        }
        if let Some(n) = self.node(center).next {
            if self.allow_merge(center, n) {
                self.merge(center, n);
            }
        }
    }

    /// Append `b`'s entries onto `a` and unlink `b`. Returns the surviving
    /// node.
    fn merge(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.decompress_node(a);
        self.decompress_node(b);
        trace!(keep = a, gone = b, "merging quicklist nodes");

        let (b_seq, b_count) = {
            let node = self.node_mut(b);
            let count = node.count;
            node.count = 0;
            let payload = std::mem::replace(&mut node.payload, Payload::Raw(S::default()));
            match payload {
                Payload::Raw(seq) => (seq, count),
                Payload::Compressed(_) => unreachable!("decompressed above"),
            }
        };
        {
            let node = self.node_mut(a);
            let seq = node.raw_mut();
            for i in 0..b_count {
                let entry = b_seq.entry_at(i).expect("entry count out of sync");
                seq.append(&entry);
            }
            node.count += b_count;
            node.update_sz();
        }
        self.del_node(b);
        a
    }

    /// Remove `count` entries starting at logical `start` (negative counts
    /// from the tail). Returns how many were actually removed. Emptied
    /// nodes are pruned.
    pub fn del_range(&mut self, start: i64, count: usize) -> usize {
        if count == 0 || self.count == 0 {
            return 0;
        }
        let (first, mut offset) = match self.locate_inner(start) {
            Some(found) => found,
            None => return 0,
        };
        let start_abs = if start >= 0 {
            start as u64
        } else {
            self.count - ((-start) as u64)
        };
        let mut extent = count.min((self.count - start_abs) as usize);
        let mut deleted = 0;
        let mut cur = Some(first);
        while extent > 0 {
            let id = match cur {
                Some(id) => id,
                None => break,
            };
            let node_count = self.node(id).count;
            let next = self.node(id).next;
            let del;
            if offset == 0 && extent >= node_count {
                // range swallows the node whole; no need to decompress it
                del = node_count;
                self.del_node(id);
            } else {
                del = (node_count - offset).min(extent);
                self.decompress_node_for_use(id);
                let node = self.node_mut(id);
                node.raw_mut().delete_range(offset, del);
                node.count -= del;
                node.update_sz();
                self.count -= del as u64;
                self.recompress_only(id);
            }
            deleted += del;
            extent -= del;
            offset = 0;
            cur = next;
        }
        deleted
    }

    /// Move the tail entry to the head.
    pub fn rotate(&mut self) {
        if self.count <= 1 {
            return;
        }
        let tail = self.tail.expect("non-empty list has a tail");
        self.decompress_node(tail);
        let offset = self.node(tail).count - 1;
        let value = self
            .node(tail)
            .raw()
            .entry_at(offset)
            .expect("entry count out of sync");
        self.push_head(&value);
        // re-read: with a single node the push shifted our entry right by
        // one, and the tail offset must be recomputed
        let tail = self.tail.expect("non-empty list has a tail");
        let offset = self.node(tail).count - 1;
        self.del_index(tail, offset);
    }

    /// Overwrite the entry at logical `index` in place. False when the
    /// index is out of range.
    pub fn replace_at_index(&mut self, index: i64, value: &[u8]) -> bool {
        match self.locate_inner(index) {
            Some((id, offset)) => {
                self.decompress_node_for_use(id);
                let node = self.node_mut(id);
                let seq = node.raw_mut();
                seq.delete_range(offset, 1);
                seq.insert_at(offset, value);
                node.update_sz();
                self.compress(id);
                true
            }
            None => false,
        }
    }

    /// Deep copy preserving policy settings and per-node encoding states.
    pub fn dup(&self) -> Self {
        let mut copy = Self::create();
        copy.fill = self.fill;
        copy.compress = self.compress;

        let mut cur = self.head;
        while let Some(id) = cur {
            let node = self.node(id);
            let new_node = QuickListNode {
                prev: copy.tail,
                next: None,
                payload: node.payload.clone(),
                sz: node.sz,
                count: node.count,
                recompress: false,
            };
            let new_id = copy.alloc(new_node);
            match copy.tail {
                Some(t) => copy.node_mut(t).next = Some(new_id),
                None => copy.head = Some(new_id),
            }
            copy.tail = Some(new_id);
            copy.len += 1;
            copy.count += node.count as u64;
            cur = node.next;
        }
        copy
    }
}

impl<S: PackedSequence> Default for QuickList<S> {
    fn default() -> Self {
        Self::create()
    }
}
