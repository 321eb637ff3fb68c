use crate::color::{COLOR_LEN, ColorSignature, extract_color};
use crate::error::Result;
use crate::image::Image;
use crate::shape::{SHAPE_LEN, ShapeSignature, extract_shape};
use crate::texture::{TEXTURE_LEN, TextureSignature, extract_texture};

/// Length of every feature vector: color, then texture, then shape
pub const FEATURE_LEN: usize = COLOR_LEN + TEXTURE_LEN + SHAPE_LEN;

pub type FeatureVector = Vec<f64>;

/// All three descriptors of one image, before concatenation
#[derive(Debug, Clone, PartialEq)]
pub struct Features {
    pub color: ColorSignature,
    pub texture: TextureSignature,
    pub shape: ShapeSignature,
}

impl Features {
    pub fn extract(image: &Image) -> Result<Self> {
        let gray = image.gray();
        Ok(Self {
            color: extract_color(image)?,
            texture: extract_texture(&gray)?,
            shape: extract_shape(&gray)?,
        })
    }

    /// Concatenate without any per-block weighting
    pub fn to_vector(&self) -> FeatureVector {
        let mut v = Vec::with_capacity(FEATURE_LEN);
        v.extend(self.color.to_vec());
        v.extend(self.texture.to_array());
        v.extend(self.shape.0);
        v
    }
}

/// Compute the feature vector of an image
pub fn compose(image: &Image) -> Result<FeatureVector> {
    Ok(Features::extract(image)?.to_vector())
}
