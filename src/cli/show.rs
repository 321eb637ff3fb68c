use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio::task::block_in_place;

use crate::cli::SubCommandExtend;
use crate::color::BINS;
use crate::config::Opts;
use crate::feature::Features;
use crate::image::Image;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// Image path
    pub image: PathBuf,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        let (image, features) = block_in_place(|| -> Result<_> {
            let image = Image::open(&self.image)?;
            let features = Features::extract(&image)?;
            Ok((image, features))
        })?;

        println!("{}: {}x{}", self.image.display(), image.width(), image.height());
        for (name, hist) in ["hue", "saturation", "value"].iter().zip(features.color.channels()) {
            // first bin wins on equal counts
            let peak = (0..BINS).fold(0, |best, i| if hist[i] > hist[best] { i } else { best });
            println!(
                "{:<12}pixels={} peak_bin={} peak_count={}",
                name,
                hist.iter().sum::<u32>(),
                peak,
                hist[peak]
            );
        }

        let t = &features.texture;
        println!("{:<12}{:.6}", "contrast", t.contrast);
        println!("{:<12}{:.6}", "correlation", t.correlation);
        println!("{:<12}{:.6}", "energy", t.energy);
        println!("{:<12}{:.6}", "homogeneity", t.homogeneity);

        for (i, hu) in features.shape.0.iter().enumerate() {
            println!("{:<12}{:e}", format!("hu{}", i + 1), hu);
        }
        Ok(())
    }
}
