use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};

use log::{debug, trace};

use crate::error::{HuffmanError, Result};

/// Symbol -> bit string of '0'/'1', ordered by symbol.
pub type CodeTable = BTreeMap<u8, String>;
/// Symbol -> occurrence count. Ordered by symbol so every walk over it is reproducible.
pub type FreqTable = BTreeMap<u8, u64>;

#[derive(Debug, Eq, PartialEq)]
pub enum Node {
    Leaf {
        byte: u8,
        freq: u64,
    },
    Internal {
        freq: u64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn freq(&self) -> u64 {
        match self {
            Node::Leaf { freq, .. } => *freq,
            Node::Internal { freq, .. } => *freq,
        }
    }
}

pub type HuffmanTree = Node;

/// Queue entry. `seq` breaks frequency ties: leaves use their byte value,
/// merged nodes are numbered after all possible leaves in creation order.
#[derive(Eq, PartialEq)]
struct HeapNode {
    freq: u64,
    seq: u32,
    node: Box<Node>,
}

impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for Min-Heap behavior in BinaryHeap (which is max-heap by default)
        other
            .freq
            .cmp(&self.freq)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

pub fn count_frequencies(data: &[u8]) -> FreqTable {
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }

    let freq: FreqTable = counts
        .iter()
        .enumerate()
        .filter(|(_, count)| **count > 0)
        .map(|(byte, &count)| (byte as u8, count))
        .collect();

    trace!(
        "Counted {} distinct symbols in {} bytes",
        freq.len(),
        data.len()
    );
    freq
}

pub fn entropy_from_freq(freq: &FreqTable) -> f64 {
    let total = freq.values().fold(0u64, |acc, &count| acc.saturating_add(count));
    if total == 0 {
        return 0.0;
    }
    let total_f = total as f64;

    let entropy: f64 = freq
        .values()
        .map(|&count| {
            let p = count as f64 / total_f;
            -p * p.log2()
        })
        .sum();

    debug!(
        "Calculated entropy: {:.4} bits/symbol (Total samples: {})",
        entropy, total
    );
    entropy
}

pub fn build_huffman_tree(frequencies: &FreqTable) -> Result<Box<HuffmanTree>> {
    if frequencies.is_empty() {
        return Err(HuffmanError::EmptyInput);
    }
    debug!(
        "Building Huffman Tree from {} unique symbols",
        frequencies.len()
    );

    let mut heap = BinaryHeap::with_capacity(frequencies.len());
    for (&byte, &freq) in frequencies {
        heap.push(HeapNode {
            freq,
            seq: byte as u32,
            node: Box::new(Node::Leaf { byte, freq }),
        });
    }

    let mut next_seq = 256u32;
    loop {
        let Some(left) = heap.pop() else {
            return Err(HuffmanError::EmptyInput);
        };
        let Some(right) = heap.pop() else {
            debug!("Tree construction complete, root weight {}", left.freq);
            return Ok(left.node);
        };

        let freq = left
            .freq
            .checked_add(right.freq)
            .ok_or_else(|| HuffmanError::corrupt("frequency total overflows"))?;
        heap.push(HeapNode {
            freq,
            seq: next_seq,
            node: Box::new(Node::Internal {
                freq,
                left: left.node,
                right: right.node,
            }),
        });
        next_seq += 1;
    }
}

/// Indented dump of the tree, right subtree above its parent and left below,
/// so the picture reads like the tree rotated a quarter turn.
pub fn render_tree(root: &Node) -> String {
    let mut out = String::new();
    render_node(root, 0, &mut out);
    out
}

fn render_node(node: &Node, depth: usize, out: &mut String) {
    let indent = "    ".repeat(depth);
    match node {
        Node::Leaf { byte, freq } => {
            out.push_str(&format!(
                "{}| {}: {} |\n",
                indent,
                (*byte as char).escape_default(),
                freq
            ));
        }
        Node::Internal { freq, left, right } => {
            render_node(right, depth + 1, out);
            out.push_str(&format!("{}| {} |\n", indent, freq));
            render_node(left, depth + 1, out);
        }
    }
}

pub fn build_code_table(root: &Node) -> CodeTable {
    let mut table = CodeTable::new();
    match root {
        // A lone leaf still needs one bit per symbol, otherwise nothing could be decoded.
        Node::Leaf { byte, .. } => {
            table.insert(*byte, String::from("0"));
        }
        Node::Internal { .. } => assign_codes(root, String::new(), &mut table),
    }
    table
}

fn assign_codes(node: &Node, prefix: String, table: &mut CodeTable) {
    match node {
        Node::Leaf { byte, .. } => {
            trace!(
                "Assigning code to byte {:#04x} ('{}') : '{}'",
                byte,
                (*byte as char).escape_default(),
                prefix
            );
            table.insert(*byte, prefix);
        }
        Node::Internal { left, right, .. } => {
            assign_codes(left, format!("{}0", prefix), table);
            assign_codes(right, format!("{}1", prefix), table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(pairs: &[(u8, u64)]) -> FreqTable {
        pairs.iter().copied().collect()
    }

    #[test]
    fn counts_only_present_symbols() {
        let freq = count_frequencies(b"abracadabra");
        assert_eq!(freq, table_of(&[(b'a', 5), (b'b', 2), (b'c', 1), (b'd', 1), (b'r', 2)]));
        assert!(count_frequencies(&[]).is_empty());
    }

    #[test]
    fn empty_table_is_rejected() {
        assert!(matches!(
            build_huffman_tree(&FreqTable::new()),
            Err(HuffmanError::EmptyInput)
        ));
    }

    #[test]
    fn two_symbols_lower_weight_goes_left() {
        let tree = build_huffman_tree(&count_frequencies(b"aaab")).unwrap();
        match tree.as_ref() {
            Node::Internal { freq, left, right } => {
                assert_eq!(*freq, 4);
                assert_eq!(**left, Node::Leaf { byte: b'b', freq: 1 });
                assert_eq!(**right, Node::Leaf { byte: b'a', freq: 3 });
            }
            other => panic!("expected internal root, got {:?}", other),
        }

        let codes = build_code_table(&tree);
        assert_eq!(codes[&b'b'], "0");
        assert_eq!(codes[&b'a'], "1");
    }

    #[test]
    fn single_leaf_gets_zero_code() {
        let tree = build_huffman_tree(&table_of(&[(b'z', 1000)])).unwrap();
        assert_eq!(*tree, Node::Leaf { byte: b'z', freq: 1000 });
        let codes = build_code_table(&tree);
        assert_eq!(codes.len(), 1);
        assert_eq!(codes[&b'z'], "0");
    }

    #[test]
    fn equal_weights_break_ties_by_symbol() {
        let freq = table_of(&[(b'd', 1), (b'c', 1), (b'b', 1), (b'a', 1)]);
        let codes = build_code_table(&build_huffman_tree(&freq).unwrap());
        // a+b merge first, then c+d, then the two pairs in creation order.
        assert_eq!(codes[&b'a'], "00");
        assert_eq!(codes[&b'b'], "01");
        assert_eq!(codes[&b'c'], "10");
        assert_eq!(codes[&b'd'], "11");
    }

    #[test]
    fn leaf_wins_tie_against_merged_node() {
        // a+b -> weight 2, which ties with c; c was queued first and goes left.
        let freq = table_of(&[(b'a', 1), (b'b', 1), (b'c', 2)]);
        let codes = build_code_table(&build_huffman_tree(&freq).unwrap());
        assert_eq!(codes[&b'c'], "0");
        assert_eq!(codes[&b'a'], "10");
        assert_eq!(codes[&b'b'], "11");
    }

    #[test]
    fn rebuilding_gives_identical_codes() {
        let freq = table_of(&[(0, 5), (7, 5), (9, 5), (200, 1), (201, 1), (255, 10)]);
        let first = build_code_table(&build_huffman_tree(&freq).unwrap());
        let second = build_code_table(&build_huffman_tree(&freq).unwrap());
        assert_eq!(first, second);
    }

    #[test]
    fn all_byte_values_produce_prefix_free_codes() {
        let freq: FreqTable = (0..=255u8).map(|b| (b, (b as u64 % 17) + 1)).collect();
        let codes = build_code_table(&build_huffman_tree(&freq).unwrap());
        assert_eq!(codes.len(), 256);
        for (a, code_a) in &codes {
            for (b, code_b) in &codes {
                if a != b {
                    assert!(!code_b.starts_with(code_a.as_str()), "{} prefixes {}", a, b);
                }
            }
        }
    }

    #[test]
    fn overflowing_weights_are_rejected() {
        let freq = table_of(&[(b'a', u64::MAX), (b'b', 1)]);
        assert!(matches!(
            build_huffman_tree(&freq),
            Err(HuffmanError::CorruptStream(_))
        ));
    }

    #[test]
    fn tree_dump_puts_right_branch_first() {
        let tree = build_huffman_tree(&count_frequencies(b"aaab")).unwrap();
        assert_eq!(render_tree(&tree), "    | a: 3 |\n| 4 |\n    | b: 1 |\n");

        let lone = build_huffman_tree(&table_of(&[(b'\n', 2)])).unwrap();
        assert_eq!(render_tree(&lone), "| \\n: 2 |\n");
    }

    #[test]
    fn entropy_of_uniform_and_single_symbol() {
        let uniform = table_of(&[(1, 4), (2, 4), (3, 4), (4, 4)]);
        assert!((entropy_from_freq(&uniform) - 2.0).abs() < 1e-9);
        assert_eq!(entropy_from_freq(&table_of(&[(1, 9)])), 0.0);
        assert_eq!(entropy_from_freq(&FreqTable::new()), 0.0);
    }
}
