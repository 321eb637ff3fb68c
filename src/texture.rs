use ndarray::{Array2, ArrayView2};

use crate::error::{Error, Result};
use crate::image::GrayImage;

/// Gray levels of an 8-bit image
pub const LEVELS: usize = 256;
pub const TEXTURE_LEN: usize = 4;

/// Pixel offsets `(row, col)` at distance 1 for 0, 45, 90 and 135 degrees
pub const OFFSETS: [(isize, isize); 4] = [(0, 1), (1, 1), (1, 0), (1, -1)];

/// Below this product of standard deviations, correlation is defined as 1
const STD_EPSILON: f64 = 1e-15;

/// GLCM statistics averaged over [`OFFSETS`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextureSignature {
    pub contrast: f64,
    pub correlation: f64,
    pub energy: f64,
    pub homogeneity: f64,
}

impl TextureSignature {
    pub fn to_array(&self) -> [f64; TEXTURE_LEN] {
        [self.contrast, self.correlation, self.energy, self.homogeneity]
    }
}

/// Symmetric, normalized co-occurrence matrix for one pixel offset.
///
/// An offset that yields no pixel pairs leaves the matrix all zero.
pub fn co_occurrence(image: ArrayView2<u8>, (dr, dc): (isize, isize)) -> Array2<f64> {
    let (rows, cols) = image.dim();
    let (rows, cols) = (rows as isize, cols as isize);
    let mut counts = Array2::<u64>::zeros((LEVELS, LEVELS));

    let (r0, r1) = (0isize.max(-dr), rows.min(rows - dr));
    let (c0, c1) = (0isize.max(-dc), cols.min(cols - dc));
    for r in r0..r1 {
        for c in c0..c1 {
            let i = image[[r as usize, c as usize]] as usize;
            let j = image[[(r + dr) as usize, (c + dc) as usize]] as usize;
            counts[[i, j]] += 1;
            counts[[j, i]] += 1;
        }
    }

    let total = counts.iter().sum::<u64>();
    let total = if total == 0 { 1.0 } else { total as f64 };
    counts.mapv(|c| c as f64 / total)
}

/// Contrast, correlation, energy and homogeneity of one probability matrix
fn glcm_props(p: &Array2<f64>) -> TextureSignature {
    let (mut mu_i, mut mu_j) = (0.0, 0.0);
    for ((i, j), &v) in p.indexed_iter() {
        mu_i += i as f64 * v;
        mu_j += j as f64 * v;
    }

    let mut sig = TextureSignature::default();
    let (mut var_i, mut var_j, mut cov) = (0.0, 0.0, 0.0);
    for ((i, j), &v) in p.indexed_iter() {
        let d = i as f64 - j as f64;
        let (di, dj) = (i as f64 - mu_i, j as f64 - mu_j);
        sig.contrast += d * d * v;
        sig.energy += v * v;
        sig.homogeneity += v / (1.0 + d.abs());
        var_i += v * di * di;
        var_j += v * dj * dj;
        cov += v * di * dj;
    }

    let (std_i, std_j) = (var_i.sqrt(), var_j.sqrt());
    sig.correlation = if std_i < STD_EPSILON || std_j < STD_EPSILON {
        1.0
    } else {
        (cov / (std_i * std_j)).clamp(-1.0, 1.0)
    };
    sig
}

pub fn extract_texture(image: &GrayImage) -> Result<TextureSignature> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::InvalidImage("empty image".to_string()));
    }
    let mut sum = TextureSignature::default();
    for offset in OFFSETS {
        let props = glcm_props(&co_occurrence(image.view(), offset));
        sum.contrast += props.contrast;
        sum.correlation += props.correlation;
        sum.energy += props.energy;
        sum.homogeneity += props.homogeneity;
    }
    let n = OFFSETS.len() as f64;
    Ok(TextureSignature {
        contrast: sum.contrast / n,
        correlation: sum.correlation / n,
        energy: sum.energy / n,
        homogeneity: sum.homogeneity / n,
    })
}
