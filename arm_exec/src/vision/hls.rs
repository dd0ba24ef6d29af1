//! # HLS colour space
//!
//! 8-bit hue, lightness, saturation images. Hue is stored halved, in `0..180`, so that it fits in
//! a byte, while lightness and saturation span the full `0..=255`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{GrayImage, Luma, Rgb, RgbImage};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Inclusive per-channel bounds of an HLS image, stored as `[h, l, s]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HlsBounds {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HlsBounds {
    /// Build the bounds from ranges in natural units.
    ///
    /// Hue is given in degrees and halved, lightness and saturation are given in percent and
    /// scaled to `0..=255`.
    pub fn new(hue: [f64; 2], lightness: [f64; 2], saturation: [f64; 2]) -> Self {
        let bound = |i: usize| [
            saturate(hue[i] / 2.0),
            saturate(lightness[i] / 100.0 * 255.0),
            saturate(saturation[i] / 100.0 * 255.0),
        ];

        Self {
            lower: bound(0),
            upper: bound(1),
        }
    }

    pub fn contains(&self, hls: &[u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hls[c] && hls[c] <= self.upper[c])
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert one RGB pixel to HLS.
pub fn rgb_to_hls(rgb: [u8; 3]) -> [u8; 3] {
    let r = rgb[0] as f32 / 255.0;
    let g = rgb[1] as f32 / 255.0;
    let b = rgb[2] as f32 / 255.0;

    let vmax = r.max(g).max(b);
    let vmin = r.min(g).min(b);
    let diff = vmax - vmin;
    let l = (vmax + vmin) * 0.5;

    let (h, s) = if diff > f32::EPSILON {
        let s = if l < 0.5 {
            diff / (vmax + vmin)
        }
        else {
            diff / (2.0 - vmax - vmin)
        };

        let mut h = if (vmax - r).abs() < f32::EPSILON {
            (g - b) * 60.0 / diff
        }
        else if (vmax - g).abs() < f32::EPSILON {
            120.0 + (b - r) * 60.0 / diff
        }
        else {
            240.0 + (r - g) * 60.0 / diff
        };

        if h < 0.0 {
            h += 360.0;
        }

        (h, s)
    }
    else {
        (0.0, 0.0)
    };

    [
        saturate(h as f64 / 2.0),
        saturate(l as f64 * 255.0),
        saturate(s as f64 * 255.0),
    ]
}

/// Convert one HLS pixel to RGB.
pub fn hls_to_rgb(hls: [u8; 3]) -> [u8; 3] {
    let l = hls[1] as f32 / 255.0;
    let s = hls[2] as f32 / 255.0;

    if s <= 0.0 {
        let v = saturate(l as f64 * 255.0);
        return [v, v, v];
    }

    let p2 = if l <= 0.5 {
        l * (1.0 + s)
    }
    else {
        l + s - l * s
    };
    let p1 = 2.0 * l - p2;

    // Hue in sextants, wrapped into 0..6
    let mut h = hls[0] as f32 * 2.0 / 60.0;
    while h < 0.0 {
        h += 6.0;
    }
    while h >= 6.0 {
        h -= 6.0;
    }

    let sector = h.floor() as usize;
    let frac = h - sector as f32;

    let tab = [
        p2,
        p1,
        p1 + (p2 - p1) * (1.0 - frac),
        p1 + (p2 - p1) * frac,
    ];

    // Indices into `tab` of the (b, g, r) values for each sector
    const SECTOR_DATA: [[usize; 3]; 6] = [
        [1, 3, 0],
        [1, 0, 2],
        [3, 0, 1],
        [0, 2, 1],
        [0, 1, 3],
        [2, 1, 0],
    ];
    let idx = SECTOR_DATA[sector.min(5)];

    [
        saturate(tab[idx[2]] as f64 * 255.0),
        saturate(tab[idx[1]] as f64 * 255.0),
        saturate(tab[idx[0]] as f64 * 255.0),
    ]
}

/// Convert a whole RGB image to HLS, with the channels stored as `[h, l, s]`.
pub fn image_to_hls(img: &RgbImage) -> RgbImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0 = rgb_to_hls(p.0);
    }
    out
}

/// Convert a whole HLS image back to RGB.
pub fn image_from_hls(img: &RgbImage) -> RgbImage {
    let mut out = img.clone();
    for p in out.pixels_mut() {
        p.0 = hls_to_rgb(p.0);
    }
    out
}

/// Binary mask of the pixels within the bounds, `255` in bounds and `0` elsewhere.
pub fn in_range(hls: &RgbImage, bounds: &HlsBounds) -> GrayImage {
    GrayImage::from_fn(hls.width(), hls.height(), |x, y| {
        match bounds.contains(&hls.get_pixel(x, y).0) {
            true => Luma([255]),
            false => Luma([0])
        }
    })
}

/// Zero every pixel of `img` which is not set in the mask.
pub fn apply_mask(img: &mut RgbImage, mask: &GrayImage) {
    for (p, m) in img.pixels_mut().zip(mask.pixels()) {
        if m.0[0] == 0 {
            *p = Rgb([0, 0, 0]);
        }
    }
}

/// Round and clamp into a byte.
pub(crate) fn saturate(v: f64) -> u8 {
    if v.is_nan() {
        0
    }
    else {
        v.round().max(0.0).min(255.0) as u8
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_rgb_to_hls() {
        assert_eq!(rgb_to_hls([0, 255, 0]), [60, 128, 255]);
        assert_eq!(rgb_to_hls([255, 0, 0]), [0, 128, 255]);
        assert_eq!(rgb_to_hls([0, 0, 255]), [120, 128, 255]);
        assert_eq!(rgb_to_hls([255, 255, 255]), [0, 255, 0]);
        assert_eq!(rgb_to_hls([0, 0, 0]), [0, 0, 0]);
        assert_eq!(rgb_to_hls([100, 100, 100]), [0, 100, 0]);
    }

    #[test]
    fn test_hls_to_rgb() {
        assert_eq!(hls_to_rgb([60, 127, 255]), [0, 254, 0]);
        assert_eq!(hls_to_rgb([0, 77, 0]), [77, 77, 77]);

        // A fully set mask pixel converts to white
        assert_eq!(hls_to_rgb([255, 255, 255]), [255, 255, 255]);
        assert_eq!(hls_to_rgb([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn test_bounds() {
        let bounds = HlsBounds::new([100.0, 140.0], [20.0, 80.0], [50.0, 100.0]);

        assert_eq!(bounds.lower, [50, 51, 128]);
        assert_eq!(bounds.upper, [70, 204, 255]);

        assert!(bounds.contains(&rgb_to_hls([0, 255, 0])));
        assert!(!bounds.contains(&rgb_to_hls([255, 0, 0])));
        assert!(!bounds.contains(&rgb_to_hls([0, 40, 0])));
    }

    #[test]
    fn test_in_range_apply_mask() {
        let mut img = RgbImage::from_pixel(3, 1, Rgb([60, 128, 255]));
        img.put_pixel(1, 0, Rgb([10, 128, 255]));

        let mask = in_range(&img, &HlsBounds { lower: [50, 0, 0], upper: [70, 255, 255] });
        assert_eq!(mask.as_raw(), &vec![255, 0, 255]);

        apply_mask(&mut img, &mask);
        assert_eq!(img.get_pixel(0, 0), &Rgb([60, 128, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([0, 0, 0]));
    }
}
