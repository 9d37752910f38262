use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Block, DetectError, validate_blocks};

/// Where one fingerprint occurs: which resource, at which block position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLocation {
    pub resource: Arc<str>,
    pub index_in_file: u32,
}

/// Append-only per-run index of every analyzed file's blocks.
///
/// Holds the ordered block list per resource and a fingerprint → occurrences
/// map, so detection can decide whether a file shares anything with the rest
/// of the codebase before paying for a suffix tree.
#[derive(Debug, Default)]
pub struct CloneIndex {
    by_resource: HashMap<Arc<str>, Vec<Block>>,
    by_fingerprint: HashMap<u64, Vec<BlockLocation>>,
}

impl CloneIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one file's ordered block list. Rejects malformed lists and
    /// re-registration; the index never removes anything within a run.
    pub fn insert_blocks(
        &mut self,
        resource: Arc<str>,
        blocks: Vec<Block>,
    ) -> Result<(), DetectError> {
        validate_blocks(&resource, &blocks)?;
        if self.by_resource.contains_key(&resource) {
            return Err(DetectError::DuplicateResource(resource));
        }
        for block in &blocks {
            self.by_fingerprint
                .entry(block.fingerprint)
                .or_default()
                .push(BlockLocation {
                    resource: Arc::clone(&block.resource),
                    index_in_file: block.index_in_file,
                });
        }
        self.by_resource.insert(resource, blocks);
        Ok(())
    }

    pub fn blocks_for(&self, resource: &str) -> Option<&[Block]> {
        self.by_resource.get(resource).map(Vec::as_slice)
    }

    pub fn occurrences_of(&self, fingerprint: u64) -> &[BlockLocation] {
        self.by_fingerprint
            .get(&fingerprint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resources holding at least one block with this fingerprint, sorted and
    /// deduplicated.
    pub fn candidate_resources(&self, fingerprint: u64) -> Vec<Arc<str>> {
        let mut resources: Vec<Arc<str>> = self
            .occurrences_of(fingerprint)
            .iter()
            .map(|location| Arc::clone(&location.resource))
            .collect();
        resources.sort();
        resources.dedup();
        resources
    }

    pub fn resource_count(&self) -> usize {
        self.by_resource.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_resource.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_blocks(resource: &Arc<str>, fingerprints: &[u64]) -> Vec<Block> {
        fingerprints
            .iter()
            .enumerate()
            .map(|(index, &fingerprint)| {
                Block::new(Arc::clone(resource), index as u32, fingerprint)
            })
            .collect()
    }

    #[test]
    fn indexes_blocks_by_resource_and_fingerprint() {
        let a: Arc<str> = Arc::from("a.rs");
        let b: Arc<str> = Arc::from("b.rs");
        let mut index = CloneIndex::new();
        index
            .insert_blocks(Arc::clone(&a), file_blocks(&a, &[1, 2, 3]))
            .unwrap();
        index
            .insert_blocks(Arc::clone(&b), file_blocks(&b, &[3, 4]))
            .unwrap();

        assert_eq!(index.resource_count(), 2);
        assert_eq!(index.blocks_for("a.rs").unwrap().len(), 3);
        assert_eq!(index.blocks_for("missing"), None);
        assert_eq!(index.occurrences_of(3).len(), 2);
        assert_eq!(index.occurrences_of(9), &[]);
        assert_eq!(index.candidate_resources(3), vec![a, b]);
    }

    #[test]
    fn rejects_empty_resource_key() {
        let empty: Arc<str> = Arc::from("");
        let mut index = CloneIndex::new();
        let err = index.insert_blocks(Arc::clone(&empty), Vec::new());
        assert_eq!(err, Err(DetectError::EmptyResourceKey));
    }

    #[test]
    fn rejects_gapped_block_indexes() {
        let a: Arc<str> = Arc::from("a.rs");
        let blocks = vec![
            Block::new(Arc::clone(&a), 0, 1),
            Block::new(Arc::clone(&a), 2, 2),
        ];
        let mut index = CloneIndex::new();
        let err = index.insert_blocks(Arc::clone(&a), blocks);
        assert_eq!(
            err,
            Err(DetectError::NonContiguousBlocks {
                resource: a,
                expected: 1,
                found: 2,
            })
        );
    }

    #[test]
    fn rejects_blocks_from_another_resource() {
        let a: Arc<str> = Arc::from("a.rs");
        let b: Arc<str> = Arc::from("b.rs");
        let blocks = vec![Block::new(Arc::clone(&b), 0, 1)];
        let mut index = CloneIndex::new();
        let err = index.insert_blocks(Arc::clone(&a), blocks);
        assert_eq!(
            err,
            Err(DetectError::MixedResources {
                expected: a,
                found: b,
            })
        );
    }

    #[test]
    fn rejects_reinserting_a_resource() {
        let a: Arc<str> = Arc::from("a.rs");
        let mut index = CloneIndex::new();
        index
            .insert_blocks(Arc::clone(&a), file_blocks(&a, &[1]))
            .unwrap();
        let err = index.insert_blocks(Arc::clone(&a), file_blocks(&a, &[1]));
        assert_eq!(err, Err(DetectError::DuplicateResource(a)));
    }
}
