pub mod cli;
pub mod color;
pub mod config;
pub mod dataset;
pub mod error;
pub mod feature;
pub mod image;
pub mod index;
pub mod pipeline;
pub mod shape;
pub mod texture;
pub mod utils;

pub use config::Opts;
pub use crate::image::{GrayImage, Image};
pub use error::{Error, Result};
pub use feature::{FEATURE_LEN, FeatureVector, compose};
pub use index::{DatasetRow, ImageId, RankedResult, SimilarityIndex};
pub use pipeline::retrieve;
