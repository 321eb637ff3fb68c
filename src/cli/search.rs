use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use log::debug;
use serde::Serialize;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::config::{Opts, SearchOptions};
use crate::dataset::DatasetStore;
use crate::image::Image;
use crate::pipeline::retrieve;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub search: SearchOptions,
    /// Path of the query image
    pub image: PathBuf,
    /// Output format
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub distance: f64,
    pub folder_name: String,
    pub path: PathBuf,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let store = DatasetStore::new(opts.conf_dir.clone());
        if !store.exists() {
            return Err(anyhow!(
                "no feature store in {}, run `extract` first",
                opts.conf_dir.path().display()
            ));
        }

        let (meta, index) = block_in_place(|| store.open_index())?;
        debug!("loaded {} rows of dimension {}", index.len(), index.dim());
        let root = self.search.root.clone().unwrap_or(meta.root);

        let query = block_in_place(|| Image::open(&self.image))?;

        let start = Instant::now();
        let result = retrieve(&query, &index, self.search.k)?;
        debug!("search took {:.2}ms", start.elapsed().as_secs_f64() * 1000.);

        let hits = result
            .into_iter()
            .map(|r| SearchHit {
                distance: r.distance,
                folder_name: r.row.id.folder_name.clone(),
                path: r.row.id.path(&root),
            })
            .collect::<Vec<_>>();

        print_result(&hits, self)
    }
}

fn print_result(result: &[SearchHit], opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for hit in result {
                println!("{:.2}\t{}", hit.distance, hit.path.display());
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
