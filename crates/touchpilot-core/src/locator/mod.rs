//! Screen locator: finds the device's display inside a captured frame.
//!
//! Capture cards usually deliver a phone screen letterboxed by black bars.
//! The locator binarizes the frame, extracts the outer contours, and takes the
//! bounding box of the largest one as the device screen.
//!
//! # Fallback
//!
//! When nothing large enough is found (dark screen, busy scene, no letterbox)
//! the locator returns the full frame.  That is a degraded-but-safe result, not
//! an error: taps still land, just with coarser framing.
//!
//! # Why contour area instead of bounding-box area? (for beginners)
//!
//! A thin diagonal line has a huge bounding box but encloses almost nothing.
//! Using the polygon area enclosed by the contour (the "shoelace" formula)
//! makes stray lines and text lose against the solid bright screen rectangle.

use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::contrast::otsu_level;
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, trace};

use crate::domain::frame::{Frame, ScreenRegion};

/// How the grayscale frame is turned into a foreground mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdPolicy {
    /// Choose the level automatically with Otsu's method.
    Otsu,
    /// Blur with a Gaussian of `blur_sigma` (skipped when `<= 0`), then cut at `level`.
    Fixed { level: u8, blur_sigma: f32 },
}

/// Tunables for [`ScreenLocator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatorConfig {
    pub policy: ThresholdPolicy,
    /// Minimum contour area as a fraction of the frame area.
    pub min_area_ratio: f64,
    /// Pixels added on every side of the detected box before clipping.
    pub margin: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            policy: ThresholdPolicy::Otsu,
            min_area_ratio: 0.1,
            margin: 4,
        }
    }
}

/// How a [`LocatedRegion`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionSource {
    /// A contour passed the area test.
    Detected { contour_area: f64 },
    /// No usable contour; the region is the whole frame.
    FullFrameFallback,
}

/// Result of locating the screen in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedRegion {
    pub region: ScreenRegion,
    pub source: RegionSource,
}

impl LocatedRegion {
    pub fn is_fallback(&self) -> bool {
        matches!(self.source, RegionSource::FullFrameFallback)
    }
}

/// Stateless screen locator.  Every call works on one frame only.
#[derive(Debug, Clone, Default)]
pub struct ScreenLocator {
    config: LocatorConfig,
}

impl ScreenLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Locates the device screen inside `frame`.
    pub fn locate(&self, frame: &Frame) -> LocatedRegion {
        let full = ScreenRegion::full(frame.extent());
        let mask = self.binarize(frame.to_gray());

        let contours = find_contours::<i32>(&mask);
        let best = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| (polygon_area(c), c))
            .max_by(|a, b| a.0.total_cmp(&b.0));

        let Some((area, contour)) = best else {
            debug!("no contour found; using full frame");
            return LocatedRegion {
                region: full,
                source: RegionSource::FullFrameFallback,
            };
        };

        let min_area = self.config.min_area_ratio * frame.extent().area() as f64;
        if area < min_area {
            debug!(area, min_area, "largest contour too small; using full frame");
            return LocatedRegion {
                region: full,
                source: RegionSource::FullFrameFallback,
            };
        }

        let region = self.bounding_region(contour, frame);
        trace!(?region, area, "screen located");
        LocatedRegion {
            region,
            source: RegionSource::Detected { contour_area: area },
        }
    }

    fn binarize(&self, gray: GrayImage) -> GrayImage {
        let (mut image, level) = match self.config.policy {
            ThresholdPolicy::Otsu => {
                let level = otsu_level(&gray);
                (gray, level)
            }
            ThresholdPolicy::Fixed { level, blur_sigma } => {
                let blurred = if blur_sigma > 0.0 {
                    gaussian_blur_f32(&gray, blur_sigma)
                } else {
                    gray
                };
                (blurred, level)
            }
        };
        for pixel in image.pixels_mut() {
            pixel.0[0] = if pixel.0[0] > level { 255 } else { 0 };
        }
        image
    }

    fn bounding_region(&self, contour: &Contour<i32>, frame: &Frame) -> ScreenRegion {
        let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
        let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
        for p in &contour.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }

        let margin = self.config.margin as i32;
        let width = frame.width() as i32;
        let height = frame.height() as i32;
        let x0 = (min_x - margin).clamp(0, width - 1);
        let y0 = (min_y - margin).clamp(0, height - 1);
        let x1 = (max_x + 1 + margin).clamp(x0 + 1, width);
        let y1 = (max_y + 1 + margin).clamp(y0 + 1, height);

        ScreenRegion::new(x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32)
    }
}

/// Area enclosed by a contour polygon (shoelace formula).
fn polygon_area(contour: &Contour<i32>) -> f64 {
    let points = &contour.points;
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += i64::from(p.x) * i64::from(q.y) - i64::from(q.x) * i64::from(p.y);
    }
    twice_area.abs() as f64 / 2.0
}

// ── Tests ─────────────────────────────────────────────────────────────────────
