use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{info, warn};
use rayon::prelude::*;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::dataset::DatasetStore;
use crate::feature::compose;
use crate::image::Image;
use crate::index::{DatasetRow, ImageId};
use crate::utils::{pb_style, scan_images, suffix_regex};

#[derive(Parser, Debug, Clone)]
pub struct ExtractCommand {
    /// Dataset root, one sub directory per class
    pub root: PathBuf,
    /// File suffixes to scan, comma separated
    #[arg(short, long, default_value = "jpg,jpeg,png")]
    pub suffix: String,
}

impl SubCommandExtend for ExtractCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let re = suffix_regex(&self.suffix).context("invalid suffix list")?;
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("failed to open dataset root {}", self.root.display()))?;

        info!("scanning {}", root.display());
        let paths = scan_images(&root, &re);
        info!("found {} images", paths.len());

        let rows = block_in_place(|| extract_rows(&root, paths));
        if rows.is_empty() {
            return Err(anyhow!("no usable image under {}", root.display()));
        }

        let store = DatasetStore::new(opts.conf_dir.clone());
        block_in_place(|| store.save(&root, &rows))?;
        Ok(())
    }
}

/// Identifier of `path` relative to `root`: its parent directory and file name
pub fn image_id(root: &Path, path: &Path) -> Option<ImageId> {
    let relative = path.strip_prefix(root).ok()?;
    let filename = relative.file_name()?.to_string_lossy().into_owned();
    let folder_name = relative
        .parent()
        .map(|parent| parent.to_string_lossy().into_owned())
        .unwrap_or_default();
    Some(ImageId { folder_name, filename })
}

/// Compute feature rows for every image in parallel, skipping undecodable files.
///
/// The result is sorted by identifier, independent of scheduling.
pub fn extract_rows(root: &Path, paths: Vec<PathBuf>) -> Vec<DatasetRow> {
    let pb = ProgressBar::new(paths.len() as u64)
        .with_style(pb_style())
        .with_message("extracting features...");

    let mut rows: Vec<DatasetRow> = paths
        .into_par_iter()
        .progress_with(pb.clone())
        .filter_map(|path| {
            let id = image_id(root, &path)?;
            match Image::open(&path).and_then(|image| compose(&image)) {
                Ok(features) => Some(DatasetRow::new(id, features)),
                Err(e) => {
                    warn!("skipping {}: {}", path.display(), e);
                    None
                }
            }
        })
        .collect();
    pb.finish_with_message("feature extraction done");

    rows.sort_by(|a, b| a.id.cmp(&b.id));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_from_nested_path() {
        let id = image_id(Path::new("/data"), Path::new("/data/Apple___scab/img1.jpg")).unwrap();
        assert_eq!(id, ImageId::new("Apple___scab", "img1.jpg"));
        assert_eq!(id.path("/data"), PathBuf::from("/data/Apple___scab/img1.jpg"));
    }

    #[test]
    fn id_at_root() {
        let id = image_id(Path::new("/data"), Path::new("/data/img1.jpg")).unwrap();
        assert_eq!(id, ImageId::new("", "img1.jpg"));
    }

    #[test]
    fn id_outside_root() {
        assert!(image_id(Path::new("/data"), Path::new("/other/img1.jpg")).is_none());
    }
}
