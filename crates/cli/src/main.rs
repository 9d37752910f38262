mod blocks;
mod json;
mod walk;

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clone_check_core::{CloneGroup, CloneIndex, detect_clones};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::json::{JsonCloneGroup, JsonClonePart, write_json};

const DEFAULT_MIN_BLOCK_LEN: u32 = 5;
const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

const HELP_TEXT: &str = concat!(
    "clone-check (duplicated block runs across source files)\n",
    "\n",
    "Usage:\n",
    "  clone-check [options] [root ...]\n",
    "\n",
    "Options:\n",
    "  --json                 Output JSON\n",
    "  --min-block-len <n>    Minimum clone length in blocks (default: 5)\n",
    "  --no-gitignore         Do not respect .gitignore rules\n",
    "  --max-file-size <n>    Skip files larger than n bytes (default: 10485760)\n",
    "  --ignore-dir <name>    Add an ignored directory name (repeatable)\n",
    "  -h, --help             Show help\n",
    "\n",
    "Examples:\n",
    "  clone-check .\n",
    "  clone-check --min-block-len 10 src tests\n",
    "  clone-check --ignore-dir vendor --ignore-dir target .\n",
    "\n"
);

#[derive(Debug, Clone)]
struct ParsedArgs {
    json: bool,
    min_block_len: u32,
    respect_gitignore: bool,
    max_file_size: u64,
    ignore_dirs: Vec<String>,
    roots: Vec<PathBuf>,
}

fn print_help() {
    print!("{HELP_TEXT}");
}

fn parse_u64(name: &str, raw: &str) -> Result<u64, String> {
    raw.parse::<u64>()
        .map_err(|_| format!("{name} must be an integer"))
}

fn parse_u32_in_range(name: &str, raw: &str, min: u32, max: u32) -> Result<u32, String> {
    let value = raw
        .parse::<u32>()
        .map_err(|_| format!("{name} must be an integer"))?;
    if !(min..=max).contains(&value) {
        return Err(format!("{name} must be {min}..{max}"));
    }
    Ok(value)
}

fn parse_args(argv: &[String]) -> Result<Option<ParsedArgs>, String> {
    let mut roots: Vec<PathBuf> = Vec::new();
    let mut ignore_dirs: Vec<String> = Vec::new();
    let mut json = false;
    let mut respect_gitignore = true;
    let mut min_block_len = DEFAULT_MIN_BLOCK_LEN;
    let mut max_file_size = DEFAULT_MAX_FILE_SIZE;

    let mut i = 0;
    while i < argv.len() {
        let arg = &argv[i];
        if arg == "--" {
            roots.extend(argv[(i + 1)..].iter().map(PathBuf::from));
            break;
        }
        if arg == "--json" {
            json = true;
            i += 1;
            continue;
        }
        if arg == "--no-gitignore" {
            respect_gitignore = false;
            i += 1;
            continue;
        }
        if arg == "--gitignore" {
            respect_gitignore = true;
            i += 1;
            continue;
        }
        if arg == "--min-block-len" {
            let raw = argv.get(i + 1).ok_or("--min-block-len requires a value")?;
            min_block_len = parse_u32_in_range("--min-block-len", raw, 1, u32::MAX)?;
            i += 2;
            continue;
        }
        if arg == "--max-file-size" {
            let raw = argv.get(i + 1).ok_or("--max-file-size requires a value")?;
            max_file_size = parse_u64("--max-file-size", raw)?;
            i += 2;
            continue;
        }
        if arg == "--ignore-dir" {
            let value = argv.get(i + 1).ok_or("--ignore-dir requires a value")?;
            ignore_dirs.push(value.to_string());
            i += 2;
            continue;
        }
        if arg == "-h" || arg == "--help" {
            return Ok(None);
        }
        if arg.starts_with('-') {
            return Err(format!("Unknown option: {arg}"));
        }
        roots.push(PathBuf::from(arg));
        i += 1;
    }

    let roots = if roots.is_empty() {
        vec![env::current_dir().map_err(|e| format!("failed to get cwd: {e}"))?]
    } else {
        roots
    };

    Ok(Some(ParsedArgs {
        json,
        min_block_len,
        respect_gitignore,
        max_file_size,
        ignore_dirs,
        roots,
    }))
}

fn format_text(groups: &[JsonCloneGroup]) -> String {
    let mut out = String::new();
    out.push_str(&format!("clone groups: {}\n", groups.len()));

    for group in groups {
        out.push('\n');
        out.push_str(&format!(
            "length_blocks={} parts={}\n",
            group.length_in_blocks,
            group.parts.len()
        ));
        for part in &group.parts {
            out.push_str(&format!(
                "- {}:{}-{}\n",
                part.path, part.start_line, part.end_line
            ));
        }
    }

    out.push('\n');
    out
}

fn to_json_group(group: &CloneGroup, line_tables: &HashMap<Arc<str>, Vec<u32>>) -> JsonCloneGroup {
    JsonCloneGroup {
        length_in_blocks: group.length_in_blocks,
        parts: group
            .parts
            .iter()
            .map(|part| {
                let lines = &line_tables[part.resource.as_ref()];
                JsonClonePart {
                    path: part.resource.to_string(),
                    start_block: part.start_block,
                    start_line: lines[part.start_block as usize],
                    end_line: lines[(part.end_block() - 1) as usize],
                }
            })
            .collect(),
    }
}

fn run(parsed: &ParsedArgs) -> io::Result<i32> {
    let mut paths: Vec<PathBuf> = Vec::new();
    for root in &parsed.roots {
        if root.is_file() {
            paths.push(root.clone());
        } else {
            paths.extend(walk::collect_files(
                root,
                parsed.respect_gitignore,
                &parsed.ignore_dirs,
            ));
        }
    }
    paths.sort();
    paths.dedup();

    let mut index = CloneIndex::new();
    let mut line_tables: HashMap<Arc<str>, Vec<u32>> = HashMap::new();
    let mut resources: Vec<Arc<str>> = Vec::new();
    for path in &paths {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                continue;
            }
        };
        if bytes.len() as u64 > parsed.max_file_size || blocks::is_probably_binary(&bytes) {
            continue;
        }
        let resource: Arc<str> = Arc::from(path.to_string_lossy().as_ref());
        let file = blocks::fingerprint_lines(&resource, &bytes);
        if file.blocks.is_empty() {
            continue;
        }
        index
            .insert_blocks(Arc::clone(&resource), file.blocks)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        line_tables.insert(Arc::clone(&resource), file.lines);
        resources.push(resource);
    }

    // Every group is reported exactly once: by the file owning its origin
    // part, which is always among the resources iterated here.
    let mut all_groups: Vec<CloneGroup> = Vec::new();
    for resource in &resources {
        let groups = detect_clones(&index, resource)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        for group in groups {
            if group.length_in_blocks >= parsed.min_block_len
                && group.origin().resource == *resource
            {
                all_groups.push(group);
            }
        }
    }
    all_groups.sort_by(|a, b| {
        (
            a.origin().resource.as_ref(),
            a.origin().start_block,
            a.length_in_blocks,
        )
            .cmp(&(
                b.origin().resource.as_ref(),
                b.origin().start_block,
                b.length_in_blocks,
            ))
    });

    let json_groups: Vec<JsonCloneGroup> = all_groups
        .iter()
        .map(|group| to_json_group(group, &line_tables))
        .collect();

    if parsed.json {
        write_json(&json_groups)?;
    } else {
        print!("{}", format_text(&json_groups));
    }

    Ok(0)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let parsed = match parse_args(&args) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_help();
            return;
        }
        Err(message) => {
            eprintln!("Error: {message}\n");
            print_help();
            std::process::exit(2);
        }
    };

    match run(&parsed) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_apply_when_no_options_are_given() {
        let parsed = parse_args(&argv(&["."])).unwrap().unwrap();
        assert!(!parsed.json);
        assert!(parsed.respect_gitignore);
        assert_eq!(parsed.min_block_len, DEFAULT_MIN_BLOCK_LEN);
        assert_eq!(parsed.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(parsed.roots, vec![PathBuf::from(".")]);
    }

    #[test]
    fn options_are_parsed() {
        let parsed = parse_args(&argv(&[
            "--json",
            "--min-block-len",
            "10",
            "--no-gitignore",
            "--ignore-dir",
            "vendor",
            "src",
        ]))
        .unwrap()
        .unwrap();
        assert!(parsed.json);
        assert!(!parsed.respect_gitignore);
        assert_eq!(parsed.min_block_len, 10);
        assert_eq!(parsed.ignore_dirs, vec!["vendor".to_string()]);
        assert_eq!(parsed.roots, vec![PathBuf::from("src")]);
    }

    #[test]
    fn unknown_options_are_rejected() {
        let err = parse_args(&argv(&["--bogus"])).unwrap_err();
        assert!(err.contains("Unknown option"));
    }

    #[test]
    fn min_block_len_must_be_positive() {
        let err = parse_args(&argv(&["--min-block-len", "0"])).unwrap_err();
        assert!(err.contains("--min-block-len"));
    }

    #[test]
    fn help_short_circuits_parsing() {
        assert!(parse_args(&argv(&["-h"])).unwrap().is_none());
        assert!(parse_args(&argv(&["--help", "."])).unwrap().is_none());
    }
}
