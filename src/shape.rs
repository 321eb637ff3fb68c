use crate::error::{Error, Result};
use crate::image::GrayImage;

pub const SHAPE_LEN: usize = 7;

/// The seven Hu moment invariants
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ShapeSignature(pub [f64; SHAPE_LEN]);

/// Spatial moments up to third order, `x` being the column and `y` the row
#[derive(Debug, Clone, Copy, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
    pub m20: f64,
    pub m11: f64,
    pub m02: f64,
    pub m30: f64,
    pub m21: f64,
    pub m12: f64,
    pub m03: f64,
}

/// Scale-normalized central moments
#[derive(Debug, Clone, Copy, Default)]
struct NormalizedMoments {
    nu20: f64,
    nu11: f64,
    nu02: f64,
    nu30: f64,
    nu21: f64,
    nu12: f64,
    nu03: f64,
}

impl Moments {
    /// Accumulate row by row; each row sum is exact in integers
    pub fn of(image: &GrayImage) -> Self {
        let mut m = Moments::default();
        for (y, row) in image.view().outer_iter().enumerate() {
            let (mut x0, mut x1, mut x2, mut x3) = (0u128, 0u128, 0u128, 0u128);
            for (x, &p) in row.iter().enumerate() {
                let (p, x) = (p as u128, x as u128);
                let xp = x * p;
                let xxp = xp * x;
                x0 += p;
                x1 += xp;
                x2 += xxp;
                x3 += xxp * x;
            }
            let (x0, x1, x2, x3) = (x0 as f64, x1 as f64, x2 as f64, x3 as f64);
            let y = y as f64;
            let y2 = y * y;
            m.m00 += x0;
            m.m10 += x1;
            m.m01 += x0 * y;
            m.m20 += x2;
            m.m11 += x1 * y;
            m.m02 += x0 * y2;
            m.m30 += x3;
            m.m21 += x2 * y;
            m.m12 += x1 * y2;
            m.m03 += x0 * y2 * y;
        }
        m
    }

    fn normalized(&self) -> NormalizedMoments {
        if self.m00.abs() <= f64::EPSILON {
            return NormalizedMoments::default();
        }
        let inv_m00 = 1.0 / self.m00;
        let (cx, cy) = (self.m10 * inv_m00, self.m01 * inv_m00);

        let mu20 = self.m20 - self.m10 * cx;
        let mu11 = self.m11 - self.m10 * cy;
        let mu02 = self.m02 - self.m01 * cy;
        let mu30 = self.m30 - cx * (3.0 * mu20 + cx * self.m10);
        let mu21 = self.m21 - cx * (2.0 * mu11 + cx * self.m01) - cy * mu20;
        let mu12 = self.m12 - cy * (2.0 * mu11 + cy * self.m10) - cx * mu02;
        let mu03 = self.m03 - cy * (3.0 * mu02 + cy * self.m01);

        let s2 = inv_m00 * inv_m00;
        let s3 = s2 * inv_m00.sqrt();
        NormalizedMoments {
            nu20: mu20 * s2,
            nu11: mu11 * s2,
            nu02: mu02 * s2,
            nu30: mu30 * s3,
            nu21: mu21 * s3,
            nu12: mu12 * s3,
            nu03: mu03 * s3,
        }
    }
}

fn hu_moments(n: &NormalizedMoments) -> [f64; SHAPE_LEN] {
    let mut t0 = n.nu30 + n.nu12;
    let mut t1 = n.nu21 + n.nu03;
    let (mut q0, mut q1) = (t0 * t0, t1 * t1);
    let n4 = 4.0 * n.nu11;
    let s = n.nu20 + n.nu02;
    let d = n.nu20 - n.nu02;

    let mut hu = [0.0; SHAPE_LEN];
    hu[0] = s;
    hu[1] = d * d + n4 * n.nu11;
    hu[3] = q0 + q1;
    hu[5] = d * (q0 - q1) + n4 * t0 * t1;

    t0 *= q0 - 3.0 * q1;
    t1 *= 3.0 * q0 - q1;
    q0 = n.nu30 - 3.0 * n.nu12;
    q1 = 3.0 * n.nu21 - n.nu03;

    hu[2] = q0 * q0 + q1 * q1;
    hu[4] = q0 * t0 + q1 * t1;
    hu[6] = q1 * t0 - q0 * t1;
    hu
}

pub fn extract_shape(image: &GrayImage) -> Result<ShapeSignature> {
    let view = image.view();
    let Some(&first) = view.iter().next() else {
        return Err(Error::InvalidImage("empty image".to_string()));
    };
    // constant intensity carries no shape
    if view.iter().all(|&p| p == first) {
        return Ok(ShapeSignature::default());
    }
    Ok(ShapeSignature(hu_moments(&Moments::of(image).normalized())))
}
