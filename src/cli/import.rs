use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use log::{info, warn};
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::dataset::{DatasetStore, read_feature_table};
use crate::feature::FEATURE_LEN;

#[derive(Parser, Debug, Clone)]
pub struct ImportCommand {
    /// Feature table: `folder_name`, `filename`, then one column per feature
    pub table: PathBuf,
    /// Dataset root the table's image identifiers are relative to
    pub root: PathBuf,
}

impl SubCommandExtend for ImportCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let rows = block_in_place(|| read_feature_table(&self.table))?;
        if rows.is_empty() {
            return Err(anyhow!("no rows in {}", self.table.display()));
        }
        if let Some(row) = rows.iter().find(|row| row.features.len() != FEATURE_LEN) {
            return Err(anyhow!(
                "{}/{} has {} features, expected {}",
                row.id.folder_name,
                row.id.filename,
                row.features.len(),
                FEATURE_LEN
            ));
        }
        info!("imported {} rows from {}", rows.len(), self.table.display());

        let root = self.root.canonicalize().unwrap_or_else(|e| {
            warn!("dataset root {}: {}", self.root.display(), e);
            self.root.clone()
        });
        let store = DatasetStore::new(opts.conf_dir.clone());
        block_in_place(|| store.save(&root, &rows))?;
        Ok(())
    }
}
