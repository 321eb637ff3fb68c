use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static DEFAULT_CONF_DIR: LazyLock<String> = LazyLock::new(|| {
    ProjectDirs::from("", "leafsearch", "leafsearch")
        .map(|dirs| dirs.data_dir().to_string_lossy().into_owned())
        .unwrap_or_else(|| ".leafsearch".to_string())
});

fn default_config_dir() -> &'static str {
    DEFAULT_CONF_DIR.as_str()
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Number of similar images to return
    #[arg(short, value_name = "K", default_value_t = 5)]
    pub k: usize,
    /// Dataset root used to print result paths, defaults to the one recorded at extraction
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "leafsearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// Directory holding the feature store
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// Extract features from a directory of images into the store
    Extract(ExtractCommand),
    /// Build the store from an existing feature table
    Import(ImportCommand),
    /// Search the store for images similar to the given one
    Search(SearchCommand),
    /// Print the descriptors of one image
    Show(ShowCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// N x D feature matrix
    pub fn features(&self) -> PathBuf {
        self.path.join("features.npy")
    }

    /// Image identifiers, one per feature row
    pub fn images(&self) -> PathBuf {
        self.path.join("images.json")
    }

    pub fn meta(&self) -> PathBuf {
        self.path.join("meta.json")
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<PathBuf> for ConfDir {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}
