mod detect;
mod index;
mod suffix_tree;
mod text;
mod types;

pub use detect::{detect_clone_groups, detect_clones};
pub use index::{BlockLocation, CloneIndex};
pub use suffix_tree::SuffixTree;
pub use text::{Symbol, Text, TextSet};
pub use types::{Block, CloneGroup, ClonePart, DetectError};
