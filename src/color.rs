use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::image::Image;

/// Histogram bins per HSV channel
pub const BINS: usize = 256;
/// Length of the flattened color signature
pub const COLOR_LEN: usize = 3 * BINS;

const HSV_SHIFT: i32 = 12;
/// 8-bit hue range, degrees halved to fit a byte
const HUE_RANGE: i32 = 180;

struct DivTables {
    sat: [i32; 256],
    hue: [i32; 256],
}

static DIV_TABLES: LazyLock<DivTables> = LazyLock::new(|| {
    let mut sat = [0; 256];
    let mut hue = [0; 256];
    for i in 1..256 {
        sat[i] = ((255 << HSV_SHIFT) as f64 / i as f64).round_ties_even() as i32;
        hue[i] = ((HUE_RANGE << HSV_SHIFT) as f64 / (6. * i as f64)).round_ties_even() as i32;
    }
    DivTables { sat, hue }
});

/// Per-channel HSV histograms with raw counts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorSignature {
    pub hue: [u32; BINS],
    pub saturation: [u32; BINS],
    pub value: [u32; BINS],
}

impl ColorSignature {
    pub fn channels(&self) -> [&[u32; BINS]; 3] {
        [&self.hue, &self.saturation, &self.value]
    }

    /// Flatten as `hue ++ saturation ++ value`
    pub fn to_vec(&self) -> Vec<f64> {
        self.channels().iter().flat_map(|ch| ch.iter().map(|&c| c as f64)).collect()
    }
}

/// Convert one RGB pixel to 8-bit HSV.
///
/// H lies in `[0, 180)`, S and V in `[0, 255]`. Divisions go through 12-bit
/// fixed-point tables so that the result is exact on every platform.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let tables = &*DIV_TABLES;
    let (r, g, b) = (r as i32, g as i32, b as i32);
    let v = r.max(g).max(b);
    let diff = v - r.min(g).min(b);
    let round = 1 << (HSV_SHIFT - 1);

    let s = (diff * tables.sat[v as usize] + round) >> HSV_SHIFT;
    let h = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut h = (h * tables.hue[diff as usize] + round) >> HSV_SHIFT;
    if h < 0 {
        h += HUE_RANGE;
    }
    [h as u8, s as u8, v as u8]
}

pub fn extract_color(image: &Image) -> Result<ColorSignature> {
    if image.pixel_count() == 0 {
        return Err(Error::InvalidImage("empty image".to_string()));
    }
    let mut sig = ColorSignature { hue: [0; BINS], saturation: [0; BINS], value: [0; BINS] };
    for px in image.pixels() {
        let [h, s, v] = rgb_to_hsv(px);
        sig.hue[h as usize] += 1;
        sig.saturation[s as usize] += 1;
        sig.value[v as usize] += 1;
    }
    Ok(sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_colors() {
        assert_eq!(rgb_to_hsv([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv([0, 0, 255]), [120, 255, 255]);
    }

    #[test]
    fn grays_have_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hsv([128, 128, 128]), [0, 0, 128]);
        assert_eq!(rgb_to_hsv([255, 255, 255]), [0, 0, 255]);
    }

    #[test]
    fn negative_hue_wraps() {
        // magenta-ish red: g < b, so the raw hue is negative
        let [h, _, v] = rgb_to_hsv([255, 0, 128]);
        assert!(h > 150 && h < 180, "hue {}", h);
        assert_eq!(v, 255);
    }

    #[test]
    fn hue_stays_below_range() {
        for r in (0..=255).step_by(15) {
            for g in (0..=255).step_by(15) {
                for b in (0..=255).step_by(15) {
                    let [h, _, _] = rgb_to_hsv([r as u8, g as u8, b as u8]);
                    assert!((h as i32) <= HUE_RANGE);
                }
            }
        }
    }

    #[test]
    fn channels_sum_to_pixel_count() {
        let pixels: Vec<u8> = (0..7 * 5 * 3).map(|i| (i * 37 % 256) as u8).collect();
        let img = Image::from_rgb(7, 5, pixels).unwrap();
        let sig = extract_color(&img).unwrap();
        for ch in sig.channels() {
            assert_eq!(ch.iter().sum::<u32>(), 35);
        }
        assert_eq!(sig.to_vec().len(), COLOR_LEN);
    }
}
