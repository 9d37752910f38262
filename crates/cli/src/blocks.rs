use std::sync::Arc;

use clone_check_core::Block;

/// One file's fingerprinted blocks plus the 1-based source line of each block.
#[derive(Debug)]
pub(crate) struct FileBlocks {
    pub(crate) blocks: Vec<Block>,
    pub(crate) lines: Vec<u32>,
}

/// Turns every non-blank line into one block: the fingerprint is FNV-1a over
/// the line with all whitespace removed, so indentation and spacing changes
/// do not break a match. Blank lines produce no block at all.
pub(crate) fn fingerprint_lines(resource: &Arc<str>, bytes: &[u8]) -> FileBlocks {
    let text = String::from_utf8_lossy(bytes);
    let mut blocks = Vec::new();
    let mut lines = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let normalized = normalize_line(line);
        if normalized.is_empty() {
            continue;
        }
        blocks.push(Block::new(
            Arc::clone(resource),
            blocks.len() as u32,
            fnv1a64(&normalized),
        ));
        lines.push((number + 1) as u32);
    }

    FileBlocks { blocks, lines }
}

fn normalize_line(line: &str) -> Vec<u8> {
    line.bytes().filter(|b| !b.is_ascii_whitespace()).collect()
}

/// A NUL byte in the leading window marks the file as binary.
pub(crate) fn is_probably_binary(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(8192)];
    window.contains(&0)
}

pub(crate) fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let mut hash = FNV_OFFSET_BASIS;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_produce_no_blocks() {
        let resource: Arc<str> = Arc::from("a.rs");
        let file = fingerprint_lines(&resource, b"fn main() {\n\n   \n}\n");

        assert_eq!(file.blocks.len(), 2);
        assert_eq!(file.lines, vec![1, 4]);
        assert_eq!(file.blocks[0].index_in_file, 0);
        assert_eq!(file.blocks[1].index_in_file, 1);
    }

    #[test]
    fn indentation_does_not_change_the_fingerprint() {
        let resource: Arc<str> = Arc::from("a.rs");
        let plain = fingerprint_lines(&resource, b"let x = 1;\n");
        let indented = fingerprint_lines(&resource, b"    let x  =  1;\n");

        assert_eq!(plain.blocks[0].fingerprint, indented.blocks[0].fingerprint);
    }

    #[test]
    fn different_lines_get_different_fingerprints() {
        let resource: Arc<str> = Arc::from("a.rs");
        let file = fingerprint_lines(&resource, b"let x = 1;\nlet y = 1;\n");

        assert_ne!(file.blocks[0].fingerprint, file.blocks[1].fingerprint);
    }

    #[test]
    fn nul_bytes_mark_a_file_as_binary() {
        assert!(is_probably_binary(b"ab\0cd"));
        assert!(!is_probably_binary(b"plain text"));
        assert!(!is_probably_binary(b""));
    }
}
