use std::fmt;
use std::sync::Arc;

use crate::types::Block;

/// A single comparable unit in a suffix tree text.
///
/// Sentinels terminate one sequence each inside a [`TextSet`]; keeping them in
/// a separate variant guarantees they can never collide with a 64-bit content
/// fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Fingerprint(u64),
    Sentinel(u32),
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Fingerprint(value) => write!(f, "#{value:x}"),
            Symbol::Sentinel(sequence) => write!(f, "${sequence}"),
        }
    }
}

/// Read-only ordered sequence of symbols.
pub trait Text {
    fn len(&self) -> usize;
    fn symbol_at(&self, index: usize) -> Symbol;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bytes as symbols, used by suffix-tree tests where the alphabet is text.
impl Text for [u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn symbol_at(&self, index: usize) -> Symbol {
        Symbol::Fingerprint(u64::from(self[index]))
    }
}

/// Block fingerprints as symbols, the production alphabet.
impl Text for [Block] {
    fn len(&self) -> usize {
        <[Block]>::len(self)
    }

    fn symbol_at(&self, index: usize) -> Symbol {
        Symbol::Fingerprint(self[index].fingerprint)
    }
}

#[derive(Debug)]
struct Sequence {
    resource: Arc<str>,
    start: usize,
    len: usize,
}

/// One or more texts concatenated into a single symbol buffer, each followed
/// by a sentinel unique to that sequence, so no suffix of the combined text
/// can run from one sequence into the next and still repeat.
#[derive(Debug, Default)]
pub struct TextSet {
    symbols: Vec<Symbol>,
    sequences: Vec<Sequence>,
}

impl TextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` followed by its sentinel. Pushing an empty text is a
    /// no-op, so an empty input yields a root-only tree.
    pub fn push<T: Text + ?Sized>(&mut self, resource: Arc<str>, text: &T) {
        if text.is_empty() {
            return;
        }
        let start = self.symbols.len();
        let len = text.len();
        self.symbols.reserve(len + 1);
        for index in 0..len {
            self.symbols.push(text.symbol_at(index));
        }
        self.symbols.push(Symbol::Sentinel(self.sequences.len() as u32));
        self.sequences.push(Sequence {
            resource,
            start,
            len,
        });
    }

    /// Total symbol count, sentinels included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbol(&self, position: usize) -> Symbol {
        self.symbols[position]
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn resource(&self, sequence: usize) -> &Arc<str> {
        &self.sequences[sequence].resource
    }

    pub(crate) fn sequence_len(&self, sequence: usize) -> usize {
        self.sequences[sequence].len
    }

    /// Maps an absolute position back to (sequence, local block index).
    /// Sentinel positions have no source location and map to `None`.
    pub fn locate(&self, position: usize) -> Option<(usize, usize)> {
        let sequence = self
            .sequences
            .partition_point(|s| s.start + s.len + 1 <= position);
        let entry = self.sequences.get(sequence)?;
        let local = position.checked_sub(entry.start)?;
        if local < entry.len {
            Some((sequence, local))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_maps_positions_back_to_sequences() {
        let mut text = TextSet::new();
        text.push(Arc::from("a"), b"xyz".as_slice());
        text.push(Arc::from("b"), b"pq".as_slice());

        assert_eq!(text.len(), 7);
        assert_eq!(text.locate(0), Some((0, 0)));
        assert_eq!(text.locate(2), Some((0, 2)));
        assert_eq!(text.locate(3), None);
        assert_eq!(text.locate(4), Some((1, 0)));
        assert_eq!(text.locate(5), Some((1, 1)));
        assert_eq!(text.locate(6), None);
        assert_eq!(text.locate(7), None);
    }

    #[test]
    fn sentinels_are_unique_per_sequence() {
        let mut text = TextSet::new();
        text.push(Arc::from("a"), b"x".as_slice());
        text.push(Arc::from("b"), b"x".as_slice());

        assert_eq!(text.symbol(1), Symbol::Sentinel(0));
        assert_eq!(text.symbol(3), Symbol::Sentinel(1));
        assert_ne!(text.symbol(1), text.symbol(3));
        assert_eq!(text.symbol(0), text.symbol(2));
    }

    #[test]
    fn pushing_an_empty_text_is_a_no_op() {
        let mut text = TextSet::new();
        text.push(Arc::from("empty"), b"".as_slice());
        assert!(text.is_empty());
        assert_eq!(text.sequence_count(), 0);
    }
}
