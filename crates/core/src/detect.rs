use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::index::CloneIndex;
use crate::suffix_tree::{ROOT, SuffixTree};
use crate::text::TextSet;
use crate::types::{Block, CloneGroup, ClonePart, DetectError, validate_blocks};

/// Detects duplicated block runs between `resource` and everything already in
/// the index (including repeats inside the file itself).
///
/// Every returned group contains at least one part from `resource`; parts and
/// groups are deterministically ordered, so repeated runs produce identical
/// output.
pub fn detect_clones(index: &CloneIndex, resource: &str) -> Result<Vec<CloneGroup>, DetectError> {
    if resource.is_empty() {
        return Err(DetectError::EmptyResourceKey);
    }
    let origin_blocks = index
        .blocks_for(resource)
        .ok_or_else(|| DetectError::UnknownResource(resource.to_string()))?;
    if origin_blocks.is_empty() {
        return Ok(Vec::new());
    }

    let mut fingerprints = HashSet::new();
    let mut has_internal_repeat = false;
    for block in origin_blocks {
        if !fingerprints.insert(block.fingerprint) {
            has_internal_repeat = true;
        }
    }

    let mut candidates: Vec<Arc<str>> = Vec::new();
    let mut seen: HashSet<Arc<str>> = HashSet::new();
    for &fingerprint in &fingerprints {
        for location in index.occurrences_of(fingerprint) {
            if location.resource.as_ref() != resource
                && seen.insert(Arc::clone(&location.resource))
            {
                candidates.push(Arc::clone(&location.resource));
            }
        }
    }
    candidates.sort();

    if candidates.is_empty() && !has_internal_repeat {
        debug!(resource, "no shared fingerprints, skipping tree construction");
        return Ok(Vec::new());
    }

    let origin_key = Arc::clone(&origin_blocks[0].resource);
    let mut text = TextSet::new();
    text.push(origin_key, origin_blocks);
    for candidate in &candidates {
        if let Some(blocks) = index.blocks_for(candidate) {
            text.push(Arc::clone(candidate), blocks);
        }
    }

    debug!(
        resource,
        candidates = candidates.len(),
        symbols = text.len(),
        "building suffix tree"
    );
    let tree = SuffixTree::build(text);
    let groups = collect_groups(&tree)?;
    debug!(resource, groups = groups.len(), "detection finished");
    Ok(groups)
}

/// Self-contained detection over explicit per-file block sequences; the first
/// sequence is the origin, and only groups it participates in are reported.
pub fn detect_clone_groups(
    files: &[(Arc<str>, Vec<Block>)],
) -> Result<Vec<CloneGroup>, DetectError> {
    for (resource, blocks) in files {
        validate_blocks(resource, blocks)?;
    }
    let Some((_, origin_blocks)) = files.first() else {
        return Ok(Vec::new());
    };
    if origin_blocks.is_empty() {
        return Ok(Vec::new());
    }

    let mut occurrences: HashMap<u64, usize> = HashMap::new();
    for (_, blocks) in files {
        for block in blocks {
            *occurrences.entry(block.fingerprint).or_insert(0) += 1;
        }
    }
    if occurrences.values().all(|&count| count < 2) {
        debug!(files = files.len(), "no repeated fingerprints, skipping tree construction");
        return Ok(Vec::new());
    }

    let mut text = TextSet::new();
    for (resource, blocks) in files {
        text.push(Arc::clone(resource), blocks.as_slice());
    }
    let tree = SuffixTree::build(text);
    collect_groups(&tree)
}

/// A candidate group before materialization: parts stay as raw
/// (sequence, start) pairs so rejected candidates never allocate resources.
#[derive(Debug)]
struct Candidate {
    length: usize,
    parts: Vec<(u32, u32)>,
}

/// Walks every internal node and turns the ones with two or more descendant
/// leaves into candidate groups; a group only exists for suffixes hanging off
/// one shared tree node, so two sequences are never paired on content they do
/// not both carry at that node.
fn collect_groups(tree: &SuffixTree) -> Result<Vec<CloneGroup>, DetectError> {
    let total = tree.text().len();

    let mut order = Vec::with_capacity(tree.node_count());
    let mut stack = vec![(ROOT, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        order.push((node, depth));
        for edge in tree.edges(node) {
            stack.push((edge.target, depth + tree.edge_span(edge)));
        }
    }

    // Reversed pre-order reaches children before parents, so each node can
    // take its children's suffix starts by move.
    let mut starts: Vec<Vec<usize>> = vec![Vec::new(); tree.node_count()];
    let mut filter = GroupFilter::default();
    for &(node, depth) in order.iter().rev() {
        if tree.is_leaf(node) {
            starts[node] = vec![total - depth];
            continue;
        }
        let mut merged: Vec<usize> = Vec::new();
        for edge in tree.edges(node) {
            let mut child = std::mem::take(&mut starts[edge.target]);
            merged.append(&mut child);
        }
        if node != ROOT && merged.len() >= 2 {
            add_candidate(tree, depth, &merged, &mut filter)?;
        }
        starts[node] = merged;
    }

    Ok(filter.finish(tree.text()))
}

fn add_candidate(
    tree: &SuffixTree,
    length: usize,
    suffix_starts: &[usize],
    filter: &mut GroupFilter,
) -> Result<(), DetectError> {
    let mut parts = Vec::with_capacity(suffix_starts.len());
    let mut has_origin = false;
    for &start in suffix_starts {
        let (sequence, local) = tree.text().locate(start).ok_or_else(|| {
            DetectError::Internal(format!("leaf at position {start} has no source location"))
        })?;
        if local + length > tree.text().sequence_len(sequence) {
            return Err(DetectError::Internal(format!(
                "occurrence at position {start} extends past its sequence"
            )));
        }
        if sequence == 0 {
            has_origin = true;
        }
        parts.push((sequence as u32, local as u32));
    }
    if has_origin {
        filter.add(Candidate { length, parts });
    }
    Ok(())
}

/// Keeps only groups not positionally covered by a longer (or equal-length)
/// kept group. Insertion evicts previously accepted groups the new one
/// covers, so the survivors do not depend on traversal order.
#[derive(Debug, Default)]
struct GroupFilter {
    accepted: Vec<Candidate>,
}

impl GroupFilter {
    fn add(&mut self, candidate: Candidate) {
        for existing in &self.accepted {
            if contained_in(&candidate, existing) {
                return;
            }
        }
        self.accepted
            .retain(|existing| !contained_in(existing, &candidate));
        self.accepted.push(candidate);
    }

    fn finish(self, text: &TextSet) -> Vec<CloneGroup> {
        let mut groups: Vec<CloneGroup> = self
            .accepted
            .into_iter()
            .map(|candidate| {
                let mut parts: Vec<ClonePart> = candidate
                    .parts
                    .iter()
                    .map(|&(sequence, start)| ClonePart {
                        resource: Arc::clone(text.resource(sequence as usize)),
                        start_block: start,
                        length_in_blocks: candidate.length as u32,
                    })
                    .collect();
                parts.sort_by(|a, b| {
                    (a.resource.as_ref(), a.start_block).cmp(&(b.resource.as_ref(), b.start_block))
                });
                CloneGroup {
                    length_in_blocks: candidate.length as u32,
                    parts,
                }
            })
            .collect();
        groups.sort_by(|a, b| {
            (
                a.length_in_blocks,
                a.origin().resource.as_ref(),
                a.origin().start_block,
                a.parts.len(),
            )
                .cmp(&(
                    b.length_in_blocks,
                    b.origin().resource.as_ref(),
                    b.origin().start_block,
                    b.parts.len(),
                ))
        });
        groups
    }
}

/// True when every part of `inner` sits inside a part of `outer`, which can
/// only happen when the inner run is a sub-run of the outer one at the same
/// positions.
fn contained_in(inner: &Candidate, outer: &Candidate) -> bool {
    if inner.length > outer.length {
        return false;
    }
    inner.parts.iter().all(|&(sequence, start)| {
        outer.parts.iter().any(|&(outer_sequence, outer_start)| {
            outer_sequence == sequence
                && outer_start <= start
                && start as usize + inner.length <= outer_start as usize + outer.length
        })
    })
}
