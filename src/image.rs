use std::path::Path;

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::{Error, Result};

/// Fixed-point precision of the luma conversion
const GRAY_SHIFT: u32 = 14;
const GRAY_R: u32 = 4899;
const GRAY_G: u32 = 9617;
const GRAY_B: u32 = 1868;

/// An 8-bit RGB image, stored as a `height x width x 3` array
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Array3<u8>,
}

/// An 8-bit single channel image, stored as a `height x width` array
#[derive(Debug, Clone, PartialEq)]
pub struct GrayImage {
    data: Array2<u8>,
}

impl Image {
    /// Build an image from interleaved RGB bytes in row-major order
    pub fn from_rgb(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidImage(format!("zero-sized image: {}x{}", width, height)));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(3))
            .ok_or_else(|| Error::InvalidImage(format!("image too large: {}x{}", width, height)))?;
        if pixels.len() != expected {
            return Err(Error::InvalidImage(format!(
                "expected {} bytes for {}x{} RGB, got {}",
                expected,
                width,
                height,
                pixels.len()
            )));
        }
        let data = Array3::from_shape_vec((height, width, 3), pixels)
            .map_err(|e| Error::InvalidImage(e.to_string()))?;
        Ok(Self { data })
    }

    /// Build an image from a `height x width x 3` array
    pub fn from_array(data: Array3<u8>) -> Result<Self> {
        let (h, w, c) = data.dim();
        if h == 0 || w == 0 || c != 3 {
            return Err(Error::InvalidImage(format!("unsupported shape: {}x{}x{}", h, w, c)));
        }
        Ok(Self { data })
    }

    /// Decode an image file of any format supported by the `image` crate
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = ::image::open(path)
            .map_err(|e| Error::InvalidImage(format!("{}: {}", path.display(), e)))?;
        Self::from_dynamic(img)
    }

    /// Decode an in-memory encoded image
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img =
            ::image::load_from_memory(bytes).map_err(|e| Error::InvalidImage(e.to_string()))?;
        Self::from_dynamic(img)
    }

    fn from_dynamic(img: ::image::DynamicImage) -> Result<Self> {
        let rgb = img.into_rgb8();
        let (width, height) = rgb.dimensions();
        Self::from_rgb(width as usize, height as usize, rgb.into_raw())
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }

    pub fn as_array(&self) -> &Array3<u8> {
        &self.data
    }

    /// Iterate over `[r, g, b]` triples in row-major order
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.lanes(Axis(2)).into_iter().map(|px| [px[0], px[1], px[2]])
    }

    /// Luma view: `Y = 0.299 R + 0.587 G + 0.114 B`, rounded
    pub fn gray(&self) -> GrayImage {
        let data = Array2::from_shape_fn((self.height(), self.width()), |(y, x)| {
            let r = self.data[[y, x, 0]] as u32;
            let g = self.data[[y, x, 1]] as u32;
            let b = self.data[[y, x, 2]] as u32;
            ((r * GRAY_R + g * GRAY_G + b * GRAY_B + (1 << (GRAY_SHIFT - 1))) >> GRAY_SHIFT) as u8
        });
        GrayImage { data }
    }
}

impl GrayImage {
    pub fn from_array(data: Array2<u8>) -> Result<Self> {
        let (h, w) = data.dim();
        if h == 0 || w == 0 {
            return Err(Error::InvalidImage(format!("zero-sized image: {}x{}", w, h)));
        }
        Ok(Self { data })
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn view(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }
}
