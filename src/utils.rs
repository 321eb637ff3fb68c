use std::path::{Path, PathBuf};

use indicatif::ProgressStyle;
use regex::Regex;
use walkdir::WalkDir;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .expect("failed to build progress style")
        .progress_chars("#>-")
}

/// Case-insensitive regex matching any of the comma separated suffixes
pub fn suffix_regex(suffix: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?i)^({})$", suffix.replace(',', "|")))
}

/// Recursively collect files under `root` whose extension matches `re`, sorted by path
pub fn scan_images(root: impl AsRef<Path>, re: &Regex) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension().map(|ext| re.is_match(&ext.to_string_lossy())) == Some(true)
        })
        .collect();
    paths.sort();
    paths
}
