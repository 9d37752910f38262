use std::collections::HashMap;

use crate::text::{Symbol, Text, TextSet};

pub(crate) type NodeId = usize;

pub(crate) const ROOT: NodeId = 0;

/// A labeled transition: the label is `text[begin..end]`, never a copy.
/// `end == None` means the edge is open-ended and runs to the current end of
/// the text; open edges are only ever frozen by a split.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
    begin: usize,
    end: Option<usize>,
    pub(crate) target: NodeId,
}

impl Edge {
    fn end_at(&self, current_end: usize) -> usize {
        self.end.unwrap_or(current_end)
    }

    fn span(&self, current_end: usize) -> usize {
        self.end_at(current_end) - self.begin
    }
}

#[derive(Debug, Default)]
struct Node {
    edges: HashMap<Symbol, Edge>,
    suffix_link: Option<NodeId>,
    /// Minimal suffix start among the leaves below, filled in after the build.
    min_suffix_start: usize,
}

/// Generalized suffix tree over a [`TextSet`], built online in amortized
/// linear time with Ukkonen's algorithm. Every suffix of the combined text
/// corresponds to exactly one leaf; every internal node is the longest common
/// prefix of the suffixes below it, which makes internal nodes with two or
/// more descendant leaves the repeated-fragment candidates.
pub struct SuffixTree {
    nodes: Vec<Node>,
    text: TextSet,
}

impl SuffixTree {
    pub fn build(text: TextSet) -> Self {
        let total = text.len();
        let mut nodes: Vec<Node> = vec![Node::default()];

        let mut active_node = ROOT;
        let mut active_edge = 0usize;
        let mut active_len = 0usize;
        let mut remainder = 0usize;

        for position in 0..total {
            let current = text.symbol(position);
            remainder += 1;
            let mut pending_link: Option<NodeId> = None;

            while remainder > 0 {
                if active_len == 0 {
                    active_edge = position;
                }
                let lead = text.symbol(active_edge);

                match nodes[active_node].edges.get(&lead).copied() {
                    None => {
                        let leaf = push_node(&mut nodes);
                        nodes[active_node].edges.insert(
                            lead,
                            Edge {
                                begin: position,
                                end: None,
                                target: leaf,
                            },
                        );
                        if let Some(from) = pending_link.take() {
                            nodes[from].suffix_link = Some(active_node);
                        }
                    }
                    Some(edge) => {
                        // Open edges implicitly include the symbol being added.
                        let span = edge.span(position + 1);
                        if active_len >= span {
                            active_node = edge.target;
                            active_edge += span;
                            active_len -= span;
                            continue;
                        }
                        if text.symbol(edge.begin + active_len) == current {
                            // Already present as an implicit suffix; extend the
                            // active point and stop this phase.
                            if active_node != ROOT
                                && let Some(from) = pending_link.take()
                            {
                                nodes[from].suffix_link = Some(active_node);
                            }
                            active_len += 1;
                            break;
                        }

                        let split = push_node(&mut nodes);
                        let leaf = push_node(&mut nodes);
                        nodes[active_node].edges.insert(
                            lead,
                            Edge {
                                begin: edge.begin,
                                end: Some(edge.begin + active_len),
                                target: split,
                            },
                        );
                        let rest = Edge {
                            begin: edge.begin + active_len,
                            end: edge.end,
                            target: edge.target,
                        };
                        nodes[split].edges.insert(text.symbol(rest.begin), rest);
                        nodes[split].edges.insert(
                            current,
                            Edge {
                                begin: position,
                                end: None,
                                target: leaf,
                            },
                        );
                        if let Some(from) = pending_link.take() {
                            nodes[from].suffix_link = Some(split);
                        }
                        pending_link = Some(split);
                    }
                }

                remainder -= 1;
                if active_node == ROOT && active_len > 0 {
                    active_len -= 1;
                    active_edge = position - remainder + 1;
                } else if active_node != ROOT {
                    active_node = nodes[active_node].suffix_link.unwrap_or(ROOT);
                }
            }
        }

        // Each sequence ends in a sentinel no earlier symbol can equal, so
        // every pending suffix became explicit.
        debug_assert_eq!(remainder, 0);

        let mut tree = Self { nodes, text };
        tree.annotate(total);
        tree
    }

    /// Fills `min_suffix_start` bottom-up: reversed pre-order visits every
    /// child before its parent.
    fn annotate(&mut self, total: usize) {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(ROOT, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            order.push((node, depth));
            for edge in self.nodes[node].edges.values() {
                stack.push((edge.target, depth + edge.span(total)));
            }
        }
        for &(node, depth) in order.iter().rev() {
            let min = if self.nodes[node].edges.is_empty() {
                total - depth
            } else {
                self.nodes[node]
                    .edges
                    .values()
                    .map(|edge| self.nodes[edge.target].min_suffix_start)
                    .min()
                    .unwrap_or(usize::MAX)
            };
            self.nodes[node].min_suffix_start = min;
        }
    }

    /// First absolute position at which `needle` occurs, walking edges by
    /// leading symbol (each node has at most one outgoing edge per leading
    /// symbol) and failing fast on the first mismatch.
    pub fn index_of<T: Text + ?Sized>(&self, needle: &T) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }
        let total = self.text.len();
        let mut node = ROOT;
        let mut matched = 0usize;
        loop {
            let lead = needle.symbol_at(matched);
            let edge = *self.nodes[node].edges.get(&lead)?;
            let end = edge.end_at(total);
            let mut offset = 0usize;
            while edge.begin + offset < end && matched < needle.len() {
                if self.text.symbol(edge.begin + offset) != needle.symbol_at(matched) {
                    return None;
                }
                offset += 1;
                matched += 1;
            }
            if matched == needle.len() {
                // The earliest suffix below this locus starts the earliest
                // occurrence of the needle.
                return Some(self.nodes[edge.target].min_suffix_start);
            }
            node = edge.target;
        }
    }

    pub fn contains<T: Text + ?Sized>(&self, needle: &T) -> bool {
        self.index_of(needle).is_some()
    }

    pub fn text(&self) -> &TextSet {
        &self.text
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Leaves: non-root nodes without outgoing edges, one per suffix.
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .skip(1)
            .filter(|node| node.edges.is_empty())
            .count()
    }

    /// Internal nodes: non-root nodes with outgoing edges.
    pub fn internal_count(&self) -> usize {
        self.nodes
            .iter()
            .skip(1)
            .filter(|node| !node.edges.is_empty())
            .count()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|node| node.edges.len()).sum()
    }

    pub(crate) fn is_leaf(&self, node: NodeId) -> bool {
        self.nodes[node].edges.is_empty()
    }

    pub(crate) fn edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.nodes[node].edges.values()
    }

    pub(crate) fn edge_span(&self, edge: &Edge) -> usize {
        edge.span(self.text.len())
    }
}

fn push_node(nodes: &mut Vec<Node>) -> NodeId {
    nodes.push(Node::default());
    nodes.len() - 1
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const SAMPLES: &[&str] = &[
        "banana",
        "mississippi",
        "book",
        "bookke",
        "cacao",
        "googol",
        "abababc",
    ];

    fn tree_over(word: &str) -> SuffixTree {
        let mut text = TextSet::new();
        text.push(Arc::from("w"), word.as_bytes());
        SuffixTree::build(text)
    }

    #[test]
    fn structural_laws_hold_for_sample_words() {
        for word in SAMPLES {
            let tree = tree_over(word);
            let n = word.len();
            assert_eq!(tree.leaf_count(), n + 1, "leaves for {word:?}");
            assert_eq!(
                tree.edge_count(),
                tree.internal_count() + tree.leaf_count(),
                "edges for {word:?}"
            );
            assert!(tree.internal_count() < n, "internal nodes for {word:?}");
        }
    }

    #[test]
    fn index_of_matches_first_occurrence_for_every_substring() {
        for word in SAMPLES {
            let tree = tree_over(word);
            for start in 0..word.len() {
                for end in (start + 1)..=word.len() {
                    let needle = &word[start..end];
                    assert_eq!(
                        tree.index_of(needle.as_bytes()),
                        word.find(needle),
                        "substring {needle:?} of {word:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn index_of_rejects_absent_needles() {
        let tree = tree_over("banana");
        assert_eq!(tree.index_of(b"nanan".as_slice()), None);
        assert_eq!(tree.index_of(b"bananas".as_slice()), None);
        assert_eq!(tree.index_of(b"x".as_slice()), None);
        assert!(!tree.contains(b"ab".as_slice()));
        assert!(tree.contains(b"anan".as_slice()));
    }

    #[test]
    fn empty_needle_matches_at_zero() {
        let tree = tree_over("book");
        assert_eq!(tree.index_of(b"".as_slice()), Some(0));
    }

    #[test]
    fn empty_text_builds_a_root_only_tree() {
        let tree = SuffixTree::build(TextSet::new());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.leaf_count(), 0);
        assert_eq!(tree.internal_count(), 0);
        assert_eq!(tree.index_of(b"a".as_slice()), None);
    }

    #[test]
    fn sentinels_keep_sequences_apart() {
        let mut text = TextSet::new();
        text.push(Arc::from("a"), b"ab".as_slice());
        text.push(Arc::from("b"), b"ba".as_slice());
        let tree = SuffixTree::build(text);

        assert!(tree.contains(b"ab".as_slice()));
        assert!(tree.contains(b"ba".as_slice()));
        // "abba" would only exist if a suffix could cross the boundary.
        assert!(!tree.contains(b"bb".as_slice()));
        assert!(!tree.contains(b"abb".as_slice()));
    }

    #[test]
    fn generalized_tree_has_one_leaf_per_suffix_of_each_sequence() {
        let mut text = TextSet::new();
        text.push(Arc::from("a"), b"abc".as_slice());
        text.push(Arc::from("b"), b"bcd".as_slice());
        let tree = SuffixTree::build(text);

        // Suffixes of "abc$0bcd$1": 8 total, one leaf each.
        assert_eq!(tree.leaf_count(), 8);
        assert_eq!(
            tree.edge_count(),
            tree.internal_count() + tree.leaf_count()
        );
    }
}
