//! # Vision
//!
//! Locates a coloured target in camera frames. The pipeline is fixed:
//!
//! 1. convert the frame to HLS,
//! 2. mask the pixels within the calibrated HLS bounds,
//! 3. turn the mask into a grayscale working image,
//! 4. smooth it with a 15x15 gaussian blur,
//! 5. binarise it at 200 to drop the pixels the blur made uncertain,
//! 6. extract the contours and pick the one with the most boundary points,
//! 7. take the mean of that contour's boundary points as the target centroid.
//!
//! The centroid is a mean of boundary points, not an area centroid.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod filter;
pub mod hls;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::{GrayImage, Rgb, RgbImage};
use imageproc::{contours::find_contours, drawing::draw_filled_circle_mut};
use log::trace;

pub use hls::HlsBounds;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Size of the smoothing kernel.
pub const BLUR_KSIZE: usize = 15;

/// Working image pixels above this value are part of a target.
pub const BINARY_THRESHOLD: u8 = 200;

/// Radius of the marker drawn at the centroid.
///
/// Units: pixels
pub const MARKER_RADIUS: i32 = 26;

/// Half the width of the contour outline.
///
/// Units: pixels
pub const OUTLINE_RADIUS: i32 = 10;

pub const MARKER_COLOUR: Rgb<u8> = Rgb([0, 0, 255]);

pub const OUTLINE_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A pixel position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Result of running the pipeline on one frame.
#[derive(Debug, Clone)]
pub struct Detection {
    /// The input frame, annotated with the target marker and outline if a target was found.
    pub frame: RgbImage,

    /// The input frame with every pixel outside the bounds zeroed.
    pub masked: RgbImage,

    /// Centroid of the target, in frame pixels.
    pub centroid: Option<Point>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Rescale a point from a frame of `from` pixels to one of `to` pixels.
    ///
    /// Returns `None` if the source frame is empty.
    pub fn scale(&self, from: (u32, u32), to: (u32, u32)) -> Option<Self> {
        if from.0 == 0 || from.1 == 0 {
            return None;
        }

        Some(Self {
            x: (self.x as f64 / from.0 as f64 * to.0 as f64) as i32,
            y: (self.y as f64 / from.1 as f64 * to.1 as f64) as i32,
        })
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Locate the target in a frame.
///
/// If no contour has at least `min_points` boundary points the returned frame is an unmodified
/// copy of the input and the centroid is `None`.
pub fn locate(frame: &RgbImage, bounds: &HlsBounds, min_points: usize) -> Detection {
    let hls_frame = hls::image_to_hls(frame);
    let mask = hls::in_range(&hls_frame, bounds);

    let mut masked = hls_frame;
    hls::apply_mask(&mut masked, &mask);
    let masked = hls::image_from_hls(&masked);

    let working = working_image(&mask);
    let working = filter::gaussian_blur(&working, BLUR_KSIZE, 0.0);
    let working = imageproc::contrast::threshold(&working, BINARY_THRESHOLD);

    let contours = find_contours::<i32>(&working);

    // First contour with the most points
    let mut best: Option<&Vec<imageproc::point::Point<i32>>> = None;
    for c in contours.iter() {
        if best.map(|b| c.points.len() > b.len()).unwrap_or(true) {
            best = Some(&c.points);
        }
    }

    let points: Vec<Point> = match best {
        Some(b) if b.len() >= min_points => b.iter().map(|p| Point::new(p.x, p.y)).collect(),
        Some(b) => {
            trace!("Largest contour has {} points, need {}", b.len(), min_points);
            return no_target(frame, masked);
        },
        None => return no_target(frame, masked)
    };

    let centroid = match contour_centroid(&points) {
        Some(c) => c,
        None => return no_target(frame, masked)
    };

    let mut annotated = frame.clone();
    draw_filled_circle_mut(&mut annotated, (centroid.x, centroid.y), MARKER_RADIUS, MARKER_COLOUR);
    for p in points.iter() {
        draw_filled_circle_mut(&mut annotated, (p.x, p.y), OUTLINE_RADIUS, OUTLINE_COLOUR);
    }

    Detection {
        frame: annotated,
        masked,
        centroid: Some(centroid),
    }
}

/// Mean of a contour's boundary points, truncated towards zero.
///
/// Returns `None` for an empty contour.
pub fn contour_centroid(points: &[Point]) -> Option<Point> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as i64;
    let (sx, sy) = points.iter().fold((0i64, 0i64), |(sx, sy), p| {
        (sx + p.x as i64, sy + p.y as i64)
    });

    Some(Point::new((sx / n) as i32, (sy / n) as i32))
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Grayscale working image from the mask.
///
/// The mask is replicated into all three channels, read back as an HLS image and reduced to
/// gray, so set pixels become white and the rest black.
fn working_image(mask: &GrayImage) -> GrayImage {
    let rgb = RgbImage::from_fn(mask.width(), mask.height(), |x, y| {
        let m = mask.get_pixel(x, y).0[0];
        Rgb(hls::hls_to_rgb([m, m, m]))
    });

    filter::to_gray(&rgb)
}

fn no_target(frame: &RgbImage, masked: RgbImage) -> Detection {
    Detection {
        frame: frame.clone(),
        masked,
        centroid: None,
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn green_bounds() -> HlsBounds {
        HlsBounds::new([100.0, 140.0], [20.0, 80.0], [50.0, 100.0])
    }

    /// Black frame with a green square covering `x0..x1`, `y0..y1`.
    fn frame_with_square(x0: u32, y0: u32, x1: u32, y1: u32) -> RgbImage {
        RgbImage::from_fn(640, 480, |x, y| {
            if x >= x0 && x < x1 && y >= y0 && y < y1 {
                Rgb([0, 255, 0])
            }
            else {
                Rgb([0, 0, 0])
            }
        })
    }

    #[test]
    fn test_no_match() {
        let frame = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, 0, (y * 5) as u8]));

        let det = locate(&frame, &green_bounds(), 20);

        assert_eq!(det.centroid, None);
        assert_eq!(det.frame, frame);
        assert!(det.masked.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn test_small_blob() {
        let frame = frame_with_square(100, 100, 112, 112);

        let det = locate(&frame, &green_bounds(), 100);

        assert_eq!(det.centroid, None);
        assert_eq!(det.frame, frame);
    }

    #[test]
    fn test_square_target() {
        let frame = frame_with_square(200, 150, 300, 250);

        let det = locate(&frame, &green_bounds(), 100);
        let c = det.centroid.expect("Target not found");

        assert!((c.x - 250).abs() <= 1, "{:?}", c);
        assert!((c.y - 200).abs() <= 1, "{:?}", c);

        // Marker drawn at the centroid, the far corner untouched
        assert_eq!(det.frame.get_pixel(c.x as u32, c.y as u32), &MARKER_COLOUR);
        assert_eq!(det.frame.get_pixel(639, 479), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_contour_centroid() {
        let square = [
            Point::new(10, 10),
            Point::new(20, 10),
            Point::new(20, 20),
            Point::new(10, 20),
        ];
        assert_eq!(contour_centroid(&square), Some(Point::new(15, 15)));

        let uneven = [Point::new(0, 0), Point::new(3, 0), Point::new(3, 2)];
        assert_eq!(contour_centroid(&uneven), Some(Point::new(2, 0)));

        assert_eq!(contour_centroid(&[]), None);
    }

    #[test]
    fn test_point_scale() {
        let p = Point::new(320, 120);

        assert_eq!(p.scale((640, 480), (1280, 960)), Some(Point::new(640, 240)));
        assert_eq!(p.scale((640, 480), (100, 100)), Some(Point::new(50, 25)));
        assert_eq!(p.scale((0, 480), (100, 100)), None);
    }
}
