use rand::Rng;

use crate::quicklist::quicklist::QuickList;
use crate::quicklist::{Direction, NodeId};

fn list(fill: i32, depth: i32) -> QuickList {
    QuickList::new(fill, depth)
}

fn entry(i: usize) -> Vec<u8> {
    format!("entry-{i:04}").into_bytes()
}

/// repetitive payload so LZF always finds something to squeeze
fn padded(i: usize) -> Vec<u8> {
    format!("entry-{i:04}-{}", "x".repeat(96)).into_bytes()
}

fn nodes_in_order(ql: &QuickList) -> Vec<NodeId> {
    let mut ids = Vec::new();
    let mut cur = ql.head;
    while let Some(id) = cur {
        ids.push(id);
        cur = ql.node(id).next;
    }
    ids
}

fn compressed_states(ql: &QuickList) -> Vec<bool> {
    nodes_in_order(ql)
        .iter()
        .map(|&id| ql.node(id).is_compressed())
        .collect()
}

fn contents(ql: &mut QuickList) -> Vec<Vec<u8>> {
    ql.iter(Direction::Head).map(|b| b.to_vec()).collect()
}

fn check_consistency(ql: &QuickList) {
    let mut cur = ql.head;
    let mut prev: Option<NodeId> = None;
    let mut total = 0u64;
    let mut nodes = 0u64;
    while let Some(id) = cur {
        let node = ql.node(id);
        assert_eq!(node.prev, prev, "broken prev link");
        total += node.count as u64;
        nodes += 1;
        prev = cur;
        cur = node.next;
    }
    assert_eq!(ql.tail, prev, "tail does not end the chain");
    assert_eq!(ql.count(), total, "entry count out of sync");
    assert_eq!(ql.node_count(), nodes, "node count out of sync");
}

#[test]
fn push_pop_order() {
    let mut ql = list(4, 0);
    for i in 0..10 {
        ql.push_tail(&entry(i));
    }
    assert_eq!(ql.count(), 10);
    check_consistency(&ql);

    for i in 0..10 {
        assert_eq!(ql.pop_head().unwrap(), entry(i));
    }
    assert_eq!(ql.pop_head(), None);

    for i in 0..10 {
        ql.push_head(&entry(i));
    }
    for i in 0..10 {
        assert_eq!(ql.pop_tail().unwrap(), entry(i));
    }
    assert_eq!(ql.pop_tail(), None);
}

#[test]
fn pop_empty_is_inert() {
    let mut ql = list(4, 0);
    assert_eq!(ql.pop_head(), None);
    assert_eq!(ql.pop_tail(), None);
    assert_eq!(ql.count(), 0);
    assert_eq!(ql.node_count(), 0);

    ql.push_tail(b"only");
    assert_eq!(ql.pop_tail().unwrap().as_ref(), b"only");
    assert_eq!(ql.pop_tail(), None);
    check_consistency(&ql);
}

#[test]
fn sole_node_survives_emptying_pop() {
    let mut ql = list(4, 0);
    for i in 0..3 {
        ql.push_tail(&entry(i));
    }
    assert_eq!(ql.node_count(), 1);
    for _ in 0..3 {
        ql.pop_head();
    }
    // the last node stays allocated; only its entries are gone
    assert!(ql.is_empty());
    assert_eq!(ql.node_count(), 1);
    check_consistency(&ql);

    ql.push_tail(b"again");
    assert_eq!(ql.count(), 1);
    assert_eq!(ql.node_count(), 1);
}

#[test]
fn node_rollover_by_count() {
    let mut ql = list(4, 0);
    for i in 0..10 {
        ql.push_tail(&entry(i));
    }
    assert_eq!(ql.node_count(), 3);
    let counts: Vec<usize> = nodes_in_order(&ql).iter().map(|&id| ql.node(id).count).collect();
    assert_eq!(counts, vec![4, 4, 2]);
    check_consistency(&ql);
}

#[test]
fn node_rollover_by_size() {
    // fill -1 caps a node at 4 KiB of raw payload
    let mut ql = list(-1, 0);
    let value = vec![b'v'; 500];
    for _ in 0..24 {
        ql.push_tail(&value);
    }
    check_consistency(&ql);
    assert_eq!(ql.node_count(), 3);
    for &id in &nodes_in_order(&ql) {
        assert!(ql.node(id).sz <= 4096);
    }
}

#[test]
fn large_element_gets_own_node() {
    let mut ql = list(-1, 0);
    for i in 0..3 {
        ql.push_tail(&entry(i));
    }
    ql.push_tail(&vec![b'b'; 5000]);
    for i in 3..6 {
        ql.push_tail(&entry(i));
    }
    check_consistency(&ql);

    let big: Vec<NodeId> = nodes_in_order(&ql)
        .into_iter()
        .filter(|&id| ql.node(id).sz > 4096)
        .collect();
    assert_eq!(big.len(), 1);
    assert_eq!(ql.node(big[0]).count, 1);
}

#[test]
fn fill_clamping() {
    let mut ql = list(0, 0);
    assert_eq!(ql.fill, 1);
    ql.set_fill(1 << 20);
    assert_eq!(ql.fill, 1 << 15);
    ql.set_fill(-100);
    assert_eq!(ql.fill, -5);
    ql.set_compress_depth(-3);
    assert_eq!(ql.compress, 0);
}

#[test]
fn compression_zone_at_rest() {
    let mut ql = list(4, 1);
    let expected: Vec<Vec<u8>> = (0..40).map(padded).collect();
    for value in &expected {
        ql.push_tail(value);
    }
    assert_eq!(ql.node_count(), 10);
    check_consistency(&ql);

    let states = compressed_states(&ql);
    assert!(!states[0], "head must stay raw");
    assert!(!states[9], "tail must stay raw");
    for (i, compressed) in states.iter().enumerate().take(9).skip(1) {
        assert!(compressed, "interior node {i} should be compressed at rest");
    }

    // touching an interior entry flips its node raw and back without
    // changing anything
    assert_eq!(ql.index(20).unwrap(), expected[20]);
    assert_eq!(compressed_states(&ql), states);
    assert_eq!(contents(&mut ql), expected);
    assert_eq!(compressed_states(&ql), states);
}

#[test]
fn compression_disabled() {
    let mut ql = list(4, 0);
    for i in 0..40 {
        ql.push_tail(&padded(i));
    }
    assert!(compressed_states(&ql).iter().all(|&c| !c));
}

#[test]
fn deeper_compression_zone() {
    let mut ql = list(2, 3);
    for i in 0..20 {
        ql.push_tail(&padded(i));
    }
    assert_eq!(ql.node_count(), 10);
    let states = compressed_states(&ql);
    for i in 0..10 {
        let in_zone = i < 3 || i >= 7;
        assert_eq!(states[i], !in_zone, "node {i}");
    }
}

#[test]
fn index_positive_and_negative() {
    let mut ql = list(3, 0);
    for i in 0..10 {
        ql.push_tail(&entry(i));
    }
    assert_eq!(ql.index(0).unwrap(), entry(0));
    assert_eq!(ql.index(7).unwrap(), entry(7));
    assert_eq!(ql.index(-1).unwrap(), entry(9));
    assert_eq!(ql.index(-10).unwrap(), entry(0));
    assert!(ql.index(10).is_none());
    assert!(ql.index(-11).is_none());
}

#[test]
fn insert_in_roomy_node() {
    let mut ql = list(8, 0);
    for i in 0..4 {
        ql.push_tail(&entry(i));
    }
    let loc = ql.locate(1).unwrap();
    ql.insert_before(&loc, b"before");
    let loc = ql.locate(3).unwrap();
    ql.insert_after(&loc, b"after");

    let expect: Vec<Vec<u8>> = vec![
        entry(0),
        b"before".to_vec(),
        entry(1),
        entry(2),
        b"after".to_vec(),
        entry(3),
    ];
    assert_eq!(contents(&mut ql), expect);
    check_consistency(&ql);
}

#[test]
fn insert_splits_full_node() {
    let mut ql = list(4, 0);
    for i in 0..4 {
        ql.push_tail(&entry(i));
    }
    assert_eq!(ql.node_count(), 1);

    let loc = ql.locate(1).unwrap();
    ql.insert_after(&loc, b"x");
    assert_eq!(ql.count(), 5);
    assert_eq!(ql.node_count(), 2);
    assert_eq!(
        contents(&mut ql),
        vec![entry(0), entry(1), b"x".to_vec(), entry(2), entry(3)]
    );
    check_consistency(&ql);

    let mut ql = list(4, 0);
    for i in 0..4 {
        ql.push_tail(&entry(i));
    }
    let loc = ql.locate(2).unwrap();
    ql.insert_before(&loc, b"y");
    assert_eq!(
        contents(&mut ql),
        vec![entry(0), entry(1), b"y".to_vec(), entry(2), entry(3)]
    );
    check_consistency(&ql);
}

#[test]
fn insert_at_edge_of_full_node_uses_neighbor() {
    let mut ql = list(4, 0);
    for i in 0..6 {
        ql.push_tail(&entry(i));
    }
    // nodes: [0 1 2 3][4 5]
    assert_eq!(ql.node_count(), 2);

    let loc = ql.locate(3).unwrap();
    ql.insert_after(&loc, b"x");
    assert_eq!(ql.node_count(), 2);
    assert_eq!(
        contents(&mut ql),
        vec![entry(0), entry(1), entry(2), entry(3), b"x".to_vec(), entry(4), entry(5)]
    );
    check_consistency(&ql);
}

#[test]
fn insert_at_full_boundary_starts_new_node() {
    let mut ql = list(4, 0);
    for i in 0..4 {
        ql.push_tail(&entry(i));
    }
    let loc = ql.locate(3).unwrap();
    ql.insert_after(&loc, b"tail-side");
    let loc = ql.locate(0).unwrap();
    ql.insert_before(&loc, b"head-side");
    assert_eq!(ql.node_count(), 3);
    assert_eq!(
        contents(&mut ql),
        vec![
            b"head-side".to_vec(),
            entry(0),
            entry(1),
            entry(2),
            entry(3),
            b"tail-side".to_vec(),
        ]
    );
    check_consistency(&ql);
}

#[test]
fn split_insert_merges_small_neighbors() {
    let mut ql = list(6, 0);
    for i in 0..8 {
        ql.push_tail(&entry(i));
    }
    // nodes: [0..=5][6 7]
    assert_eq!(ql.node_count(), 2);

    let loc = ql.locate(2).unwrap();
    ql.insert_before(&loc, b"z");
    // the split leaves [0 1 z] and [2..=5]; the right half then folds
    // together with [6 7]
    assert_eq!(ql.node_count(), 2);
    assert_eq!(
        contents(&mut ql),
        vec![
            entry(0),
            entry(1),
            b"z".to_vec(),
            entry(2),
            entry(3),
            entry(4),
            entry(5),
            entry(6),
            entry(7),
        ]
    );
    check_consistency(&ql);
}

#[test]
fn del_range_spans_nodes() {
    let mut ql = list(4, 0);
    for i in 0..12 {
        ql.push_tail(&entry(i));
    }
    assert_eq!(ql.del_range(2, 7), 7);
    assert_eq!(ql.count(), 5);
    assert_eq!(
        contents(&mut ql),
        vec![entry(0), entry(1), entry(9), entry(10), entry(11)]
    );
    check_consistency(&ql);
}

#[test]
fn del_range_negative_start_and_clamp() {
    let mut ql = list(4, 0);
    for i in 0..10 {
        ql.push_tail(&entry(i));
    }
    // last three entries, asking for more than remain
    assert_eq!(ql.del_range(-3, 100), 3);
    assert_eq!(ql.count(), 7);
    assert_eq!(ql.index(-1).unwrap(), entry(6));

    assert_eq!(ql.del_range(0, 100), 7);
    assert!(ql.is_empty());
    assert_eq!(ql.node_count(), 0);
    check_consistency(&ql);

    ql.push_tail(b"fresh");
    assert_eq!(ql.count(), 1);
}

#[test]
fn del_range_out_of_bounds() {
    let mut ql = list(4, 0);
    for i in 0..4 {
        ql.push_tail(&entry(i));
    }
    assert_eq!(ql.del_range(4, 1), 0);
    assert_eq!(ql.del_range(-5, 1), 0);
    assert_eq!(ql.del_range(0, 0), 0);
    assert_eq!(ql.count(), 4);
}

#[test]
fn rotate_moves_tail_to_head() {
    let mut ql = list(2, 0);
    for i in 0..6 {
        ql.push_tail(&entry(i));
    }
    ql.rotate();
    assert_eq!(
        contents(&mut ql),
        vec![entry(5), entry(0), entry(1), entry(2), entry(3), entry(4)]
    );
    assert_eq!(ql.count(), 6);
    check_consistency(&ql);

    // single node
    let mut ql = list(8, 0);
    for i in 0..3 {
        ql.push_tail(&entry(i));
    }
    ql.rotate();
    assert_eq!(contents(&mut ql), vec![entry(2), entry(0), entry(1)]);

    // degenerate sizes are no-ops
    let mut ql = list(8, 0);
    ql.rotate();
    ql.push_tail(b"one");
    ql.rotate();
    assert_eq!(ql.count(), 1);
}

#[test]
fn replace_at_index() {
    let mut ql = list(3, 0);
    for i in 0..7 {
        ql.push_tail(&entry(i));
    }
    assert!(ql.replace_at_index(2, b"swapped"));
    assert!(ql.replace_at_index(-1, b"last"));
    assert!(!ql.replace_at_index(7, b"nope"));
    assert_eq!(ql.index(2).unwrap().as_ref(), b"swapped");
    assert_eq!(ql.index(6).unwrap().as_ref(), b"last");
    assert_eq!(ql.count(), 7);
    check_consistency(&ql);
}

#[test]
fn dup_is_a_deep_copy() {
    let mut ql = list(4, 1);
    for i in 0..24 {
        ql.push_tail(&padded(i));
    }
    let states = compressed_states(&ql);
    assert!(states.iter().any(|&c| c));

    let mut copy = ql.dup();
    assert_eq!(copy.fill, ql.fill);
    assert_eq!(copy.compress, ql.compress);
    assert_eq!(compressed_states(&copy), states);
    assert_eq!(contents(&mut copy), contents(&mut ql));
    check_consistency(&copy);

    ql.push_tail(b"only in the original");
    assert_eq!(copy.count() + 1, ql.count());
}

#[test]
fn iterator_both_directions() {
    let mut ql = list(3, 1);
    let expected: Vec<Vec<u8>> = (0..20).map(padded).collect();
    for value in &expected {
        ql.push_tail(value);
    }

    let forward: Vec<Vec<u8>> = ql.iter(Direction::Head).map(|b| b.to_vec()).collect();
    assert_eq!(forward, expected);

    let mut backward: Vec<Vec<u8>> = ql.iter(Direction::Tail).map(|b| b.to_vec()).collect();
    backward.reverse();
    assert_eq!(backward, expected);

    // traversal decompressed interior nodes transiently; at rest they are
    // compressed again
    let states = compressed_states(&ql);
    assert!(states[1..states.len() - 1].iter().all(|&c| c));
    check_consistency(&ql);
}

#[test]
fn iter_at_starts_mid_list() {
    let mut ql = list(3, 0);
    for i in 0..10 {
        ql.push_tail(&entry(i));
    }

    let tail_half: Vec<Vec<u8>> = ql
        .iter_at(Direction::Head, 5)
        .unwrap()
        .map(|b| b.to_vec())
        .collect();
    assert_eq!(tail_half, (5..10).map(entry).collect::<Vec<_>>());

    let head_half: Vec<Vec<u8>> = ql
        .iter_at(Direction::Tail, 5)
        .unwrap()
        .map(|b| b.to_vec())
        .collect();
    assert_eq!(head_half, (0..6).rev().map(entry).collect::<Vec<_>>());

    assert!(ql.iter_at(Direction::Head, 10).is_none());
}

#[test]
fn iter_delete_current_forward() {
    let mut ql = list(3, 0);
    for i in 0..12 {
        ql.push_tail(&entry(i));
    }
    let mut it = ql.iter(Direction::Head);
    let mut seen = Vec::new();
    while let Some(value) = it.next() {
        seen.push(value.to_vec());
        // drop the odd ones as we pass them
        if seen.len() % 2 == 0 {
            it.delete_current();
        }
    }
    drop(it);

    assert_eq!(seen, (0..12).map(entry).collect::<Vec<_>>());
    assert_eq!(ql.count(), 6);
    assert_eq!(contents(&mut ql), (0..12).step_by(2).map(entry).collect::<Vec<_>>());
    check_consistency(&ql);
}

#[test]
fn iter_delete_current_reverse() {
    let mut ql = list(3, 0);
    for i in 0..12 {
        ql.push_tail(&entry(i));
    }
    let mut it = ql.iter(Direction::Tail);
    let mut index = 12;
    while let Some(value) = it.next() {
        index -= 1;
        assert_eq!(value, entry(index));
        if index % 3 == 0 {
            it.delete_current();
        }
    }
    drop(it);

    assert_eq!(ql.count(), 8);
    let expect: Vec<Vec<u8>> = (0..12).filter(|i| i % 3 != 0).map(entry).collect();
    assert_eq!(contents(&mut ql), expect);
    check_consistency(&ql);
}

#[test]
fn iter_delete_every_entry() {
    // one entry per node, so every deletion unlinks a node under the cursor
    let mut ql = list(1, 0);
    for i in 0..5 {
        ql.push_tail(&entry(i));
    }
    assert_eq!(ql.node_count(), 5);

    let mut it = ql.iter(Direction::Head);
    while it.next().is_some() {
        it.delete_current();
    }
    drop(it);

    assert!(ql.is_empty());
    check_consistency(&ql);
}

#[test]
fn stress_against_model() {
    let mut rng = rand::rng();
    let mut ql = list(4, 2);
    let mut model: Vec<Vec<u8>> = Vec::new();
    let mut serial = 0usize;

    for step in 0..2000 {
        let len = model.len();
        match rng.random_range(0..7) {
            0 => {
                let value = padded(serial);
                serial += 1;
                ql.push_head(&value);
                model.insert(0, value);
            }
            1 => {
                let value = padded(serial);
                serial += 1;
                ql.push_tail(&value);
                model.push(value);
            }
            2 => {
                let popped = ql.pop_head().map(|b| b.to_vec());
                let expect = if len == 0 { None } else { Some(model.remove(0)) };
                assert_eq!(popped, expect);
            }
            3 => {
                let popped = ql.pop_tail().map(|b| b.to_vec());
                assert_eq!(popped, model.pop());
            }
            4 => {
                ql.rotate();
                if len > 1 {
                    let value = model.pop().unwrap();
                    model.insert(0, value);
                }
            }
            5 if len > 0 => {
                let start = rng.random_range(-(len as i64)..len as i64);
                let want = rng.random_range(1..=4usize);
                let removed = ql.del_range(start, want);
                let abs = if start >= 0 {
                    start as usize
                } else {
                    len - (-start) as usize
                };
                let expect = want.min(len - abs);
                assert_eq!(removed, expect);
                model.drain(abs..abs + expect);
            }
            6 if len > 0 => {
                let at = rng.random_range(0..len);
                let value = padded(serial);
                serial += 1;
                let loc = ql.locate(at as i64).unwrap();
                if rng.random_bool(0.5) {
                    ql.insert_before(&loc, &value);
                    model.insert(at, value);
                } else {
                    ql.insert_after(&loc, &value);
                    model.insert(at + 1, value);
                }
            }
            _ => {}
        }

        assert_eq!(ql.count() as usize, model.len());
        let len = model.len();
        if len > 0 {
            for _ in 0..3 {
                let i = rng.random_range(0..len);
                assert_eq!(ql.index(i as i64).unwrap().to_vec(), model[i]);
                assert_eq!(ql.index(-((i + 1) as i64)).unwrap().to_vec(), model[len - 1 - i]);
            }
        }
        assert!(ql.index(len as i64).is_none());

        if step % 250 == 0 {
            check_consistency(&ql);
            assert_eq!(contents(&mut ql), model);
        }
    }
    check_consistency(&ql);
    assert_eq!(contents(&mut ql), model);
}
