use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::warn;

/// Collects candidate files under `root`, honoring .gitignore rules when
/// asked and pruning the named directories anywhere in the tree. Symlinks
/// are never followed.
pub(crate) fn collect_files(
    root: &Path,
    respect_gitignore: bool,
    ignore_dirs: &[String],
) -> Vec<PathBuf> {
    let is_git_repo = root.join(".git").exists();
    let ignore_dirs = ignore_dirs.to_vec();

    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .follow_links(false)
        .ignore(false)
        .git_ignore(respect_gitignore)
        .git_global(respect_gitignore && is_git_repo)
        .git_exclude(respect_gitignore && is_git_repo)
        .parents(false)
        .require_git(false);

    let walker = builder
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            if entry.path_is_symlink() {
                return false;
            }
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if is_dir
                && let Some(name) = entry.file_name().to_str()
                && ignore_dirs.iter().any(|d| d == name)
            {
                return false;
            }
            true
        })
        .build();

    let mut files = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => warn!("walk error under {}: {err}", root.display()),
        }
    }
    files
}
