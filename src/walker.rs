//! Directory walking for recursive-mode file discovery
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Collects the files to inspect for `path`.
///
/// - If `path` is a file, returns `[path]` regardless of `recursive`.
/// - If `path` is a directory and `recursive` is `false`, returns its
///   immediate file children.
/// - If `path` is a directory and `recursive` is `true`, descends fully.
pub fn collect_files(path: &Path, recursive: bool) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(path)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}
