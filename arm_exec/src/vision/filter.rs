//! # Image filters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{GrayImage, Luma, RgbImage};

use super::hls::saturate;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Fixed point luma weights for red, green, and blue, shifted by [`LUMA_SHIFT`].
const LUMA_WEIGHTS: [u32; 3] = [4899, 9617, 1868];

const LUMA_SHIFT: u32 = 14;

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert an RGB image to grayscale.
pub fn to_gray(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let p = img.get_pixel(x, y).0;
        let sum: u32 = p.iter()
            .zip(LUMA_WEIGHTS.iter())
            .map(|(c, w)| *c as u32 * w)
            .sum();

        Luma([((sum + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8])
    })
}

/// Normalised 1D gaussian kernel with `ksize` taps.
///
/// A non-positive `sigma` is derived from the kernel size.
pub fn gaussian_kernel(ksize: usize, sigma: f64) -> Vec<f32> {
    let sigma = if sigma > 0.0 {
        sigma
    }
    else {
        0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };

    let centre = (ksize as f64 - 1.0) / 2.0;
    let weights: Vec<f64> = (0..ksize)
        .map(|i| {
            let x = i as f64 - centre;
            (-(x * x) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();

    weights.iter().map(|w| (w / total) as f32).collect()
}

/// Separable gaussian blur with a square `ksize` kernel, mirroring the image at its edges without
/// repeating the edge pixel.
pub fn gaussian_blur(img: &GrayImage, ksize: usize, sigma: f64) -> GrayImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let kernel = gaussian_kernel(ksize, sigma);
    let radius = (ksize / 2) as i64;
    let (w, h) = (width as usize, height as usize);
    let src = img.as_raw();

    // Horizontal pass
    let mut rows = vec![0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            rows[y * w + x] = kernel.iter()
                .enumerate()
                .map(|(k, wt)| {
                    let xs = reflect_101(x as i64 + k as i64 - radius, w as i64);
                    wt * src[y * w + xs] as f32
                })
                .sum();
        }
    }

    // Vertical pass
    GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as usize, y as usize);
        let v: f32 = kernel.iter()
            .enumerate()
            .map(|(k, wt)| {
                let ys = reflect_101(y as i64 + k as i64 - radius, h as i64);
                wt * rows[ys * w + x]
            })
            .sum();

        Luma([saturate(v as f64)])
    })
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Map an out of bounds index back into `0..n` by mirroring about the edge pixels.
fn reflect_101(i: i64, n: i64) -> usize {
    if n <= 1 {
        return 0;
    }

    let period = 2 * n - 2;
    let i = i.rem_euclid(period);

    (if i >= n { period - i } else { i }) as usize
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reflect_101() {
        let idx: Vec<usize> = (-3..8).map(|i| reflect_101(i, 5)).collect();
        assert_eq!(idx, vec![3, 2, 1, 0, 1, 2, 3, 4, 3, 2, 1]);
        assert_eq!(reflect_101(-7, 1), 0);
    }

    #[test]
    fn test_gaussian_kernel() {
        let k = gaussian_kernel(15, 0.0);

        assert_eq!(k.len(), 15);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert_eq!(k[0], k[14]);
        assert!(k[7] > k[6] && k[6] > k[0]);
    }

    #[test]
    fn test_blur_uniform() {
        let img = GrayImage::from_pixel(20, 9, Luma([255]));
        let blurred = gaussian_blur(&img, 15, 0.0);

        assert!(blurred.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_blur_spreads_edge() {
        let mut img = GrayImage::new(40, 1);
        for x in 20..40 {
            img.put_pixel(x, 0, Luma([255]));
        }

        let blurred = gaussian_blur(&img, 15, 0.0);

        assert_eq!(blurred.get_pixel(0, 0).0[0], 0);
        assert!(blurred.get_pixel(19, 0).0[0] > 0);
        assert!(blurred.get_pixel(20, 0).0[0] < 255);
        assert_eq!(blurred.get_pixel(39, 0).0[0], 255);
    }

    #[test]
    fn test_to_gray() {
        let img = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgb([255, 255, 255]),
            1 => image::Rgb([0, 255, 0]),
            _ => image::Rgb([0, 0, 0]),
        });

        assert_eq!(to_gray(&img).as_raw(), &vec![255, 150, 0]);
    }
}
