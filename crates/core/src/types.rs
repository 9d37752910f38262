use std::sync::Arc;

use thiserror::Error;

/// One fingerprinted unit of a file: the block at ordinal position
/// `index_in_file` whose normalized content hashes to `fingerprint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub resource: Arc<str>,
    pub index_in_file: u32,
    pub fingerprint: u64,
}

impl Block {
    pub fn new(resource: Arc<str>, index_in_file: u32, fingerprint: u64) -> Self {
        Self {
            resource,
            index_in_file,
            fingerprint,
        }
    }
}

/// One occurrence of a repeated block run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClonePart {
    pub resource: Arc<str>,
    pub start_block: u32,
    pub length_in_blocks: u32,
}

impl ClonePart {
    pub fn end_block(&self) -> u32 {
        self.start_block + self.length_in_blocks
    }
}

/// A maximal set of positions sharing one repeated block run.
///
/// `parts` is sorted ascending by (resource key, start block) and always has
/// at least two entries; the first entry is the canonical origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneGroup {
    pub length_in_blocks: u32,
    pub parts: Vec<ClonePart>,
}

impl CloneGroup {
    /// The deterministic origin occurrence: lexicographically first part by
    /// (resource key, start block).
    pub fn origin(&self) -> &ClonePart {
        &self.parts[0]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectError {
    #[error("resource key must not be empty")]
    EmptyResourceKey,
    #[error("block list for {expected} contains a block for {found}")]
    MixedResources { expected: Arc<str>, found: Arc<str> },
    #[error(
        "block list for {resource} is not contiguous: expected index {expected}, found {found}"
    )]
    NonContiguousBlocks {
        resource: Arc<str>,
        expected: u32,
        found: u32,
    },
    #[error("resource {0} is already indexed")]
    DuplicateResource(Arc<str>),
    #[error("resource {0} is not indexed")]
    UnknownResource(String),
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

/// Checks the caller contract for one file's block list: a non-empty resource
/// key shared by every block, and block indexes running 0, 1, 2, ... without
/// gaps or reordering.
pub(crate) fn validate_blocks(resource: &Arc<str>, blocks: &[Block]) -> Result<(), DetectError> {
    if resource.is_empty() {
        return Err(DetectError::EmptyResourceKey);
    }
    for (position, block) in blocks.iter().enumerate() {
        if block.resource != *resource {
            return Err(DetectError::MixedResources {
                expected: Arc::clone(resource),
                found: Arc::clone(&block.resource),
            });
        }
        if block.index_in_file as usize != position {
            return Err(DetectError::NonContiguousBlocks {
                resource: Arc::clone(resource),
                expected: position as u32,
                found: block.index_in_file,
            });
        }
    }
    Ok(())
}
