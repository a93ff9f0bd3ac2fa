//! Coordinate mapping between the raw frame, the cropped screen, and the
//! destination HID space.
//!
//! Every mapping here is a pure function of extents and offsets.  There is no
//! hidden state, so the same inputs always give the same output.
//!
//! # Pipeline
//!
//! ```text
//! NormalizedPoint (0..1 inside the region)
//!     │  px = offset_x + round(nx · width)
//!     ▼
//! frame pixel (RawFrame space)
//!     │  dx = round((px − offset_x) / width · dest_width)
//!     ▼
//! DestinationPoint (DestinationDevice space)
//! ```
//!
//! # Rounding
//!
//! Each step rounds half to even (`412.5 → 412`), so a point exactly between
//! two destination pixels does not drift in one direction over many taps.

use crate::domain::action::{Action, NormalizedPoint};
use crate::domain::frame::{Extent, ScreenRegion};

/// The three coordinate spaces, each with its own extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFrame {
    /// The full captured frame, in frame pixels.
    RawFrame(Extent),
    /// The located device screen, in pixels relative to its top-left corner.
    CroppedScreen(Extent),
    /// The HID destination space (digitizer units or device pixels).
    DestinationDevice(Extent),
}

impl CoordinateFrame {
    pub fn extent(&self) -> Extent {
        match self {
            CoordinateFrame::RawFrame(e)
            | CoordinateFrame::CroppedScreen(e)
            | CoordinateFrame::DestinationDevice(e) => *e,
        }
    }
}

/// A point in destination units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestinationPoint {
    pub x: i32,
    pub y: i32,
}

impl DestinationPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A scale-then-translate transform: `p' = p · scale + offset` per axis.
///
/// Maps never round; rounding happens once when a point is materialized in a
/// pixel space.  Composition with [`AffineMap::then`] is associative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineMap {
    pub scale_x: f64,
    pub scale_y: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl AffineMap {
    pub fn identity() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Normalized-in-region → frame pixels.
    pub fn normalized_to_frame(region: &ScreenRegion) -> Self {
        Self {
            scale_x: f64::from(region.width),
            scale_y: f64::from(region.height),
            offset_x: f64::from(region.offset_x),
            offset_y: f64::from(region.offset_y),
        }
    }

    /// Frame pixels inside `region` → destination units.
    pub fn frame_to_destination(region: &ScreenRegion, destination: Extent) -> Self {
        let scale_x = ratio(destination.width, region.width);
        let scale_y = ratio(destination.height, region.height);
        Self {
            scale_x,
            scale_y,
            offset_x: -f64::from(region.offset_x) * scale_x,
            offset_y: -f64::from(region.offset_y) * scale_y,
        }
    }

    /// Applies `self` first, then `next`.
    pub fn then(&self, next: &AffineMap) -> AffineMap {
        AffineMap {
            scale_x: self.scale_x * next.scale_x,
            scale_y: self.scale_y * next.scale_y,
            offset_x: self.offset_x * next.scale_x + next.offset_x,
            offset_y: self.offset_y * next.scale_y + next.offset_y,
        }
    }

    /// The inverse transform, or `None` if an axis collapses to zero.
    pub fn inverse(&self) -> Option<AffineMap> {
        if self.scale_x == 0.0 || self.scale_y == 0.0 {
            return None;
        }
        Some(AffineMap {
            scale_x: 1.0 / self.scale_x,
            scale_y: 1.0 / self.scale_y,
            offset_x: -self.offset_x / self.scale_x,
            offset_y: -self.offset_y / self.scale_y,
        })
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (x * self.scale_x + self.offset_x, y * self.scale_y + self.offset_y)
    }

    /// Applies the map and rounds half to even.
    pub fn apply_rounded(&self, x: f64, y: f64) -> (i32, i32) {
        let (x, y) = self.apply(x, y);
        (round_even(x), round_even(y))
    }
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}

fn round_even(v: f64) -> i32 {
    v.round_ties_even() as i32
}

// ── Step functions ────────────────────────────────────────────────────────────

/// Normalized-in-region → frame pixel: `px = offset + round(n · extent)`.
pub fn normalized_to_frame(point: NormalizedPoint, region: &ScreenRegion) -> (i32, i32) {
    (
        region.offset_x as i32 + round_even(point.x * f64::from(region.width)),
        region.offset_y as i32 + round_even(point.y * f64::from(region.height)),
    )
}

/// Frame pixel → destination units: `d = round((p − offset) / extent · dest)`.
pub fn frame_to_destination(
    pixel: (i32, i32),
    region: &ScreenRegion,
    destination: Extent,
) -> DestinationPoint {
    let local_x = f64::from(pixel.0 - region.offset_x as i32);
    let local_y = f64::from(pixel.1 - region.offset_y as i32);
    DestinationPoint::new(
        round_even(local_x * ratio(destination.width, region.width)),
        round_even(local_y * ratio(destination.height, region.height)),
    )
}

/// Frame pixel → normalized-in-region (inverse of [`normalized_to_frame`]).
pub fn frame_to_normalized(pixel: (i32, i32), region: &ScreenRegion) -> NormalizedPoint {
    NormalizedPoint::new(
        f64::from(pixel.0 - region.offset_x as i32) / f64::from(region.width.max(1)),
        f64::from(pixel.1 - region.offset_y as i32) / f64::from(region.height.max(1)),
    )
}

/// Destination point → fraction of the destination extent.
pub fn destination_fraction(point: DestinationPoint, destination: Extent) -> NormalizedPoint {
    NormalizedPoint::new(
        f64::from(point.x) / f64::from(destination.width.max(1)),
        f64::from(point.y) / f64::from(destination.height.max(1)),
    )
}

// ── Resolved actions ──────────────────────────────────────────────────────────

/// The gesture part of a [`ResolvedAction`].
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Tap {
        normalized: NormalizedPoint,
        destination: DestinationPoint,
    },
    DoubleTap {
        normalized: NormalizedPoint,
        destination: DestinationPoint,
    },
    Swipe {
        dx: f64,
        dy: f64,
    },
    TypeText(String),
}

/// An action with clamped coordinates resolved into destination units.
///
/// Encoders pick whichever representation their transport needs: the
/// normalized point, the destination point, or its fraction of `destination`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAction {
    pub gesture: Gesture,
    pub destination: Extent,
}

impl ResolvedAction {
    /// The destination point as a fraction of the destination extent, for taps.
    pub fn destination_fraction(&self) -> Option<NormalizedPoint> {
        match &self.gesture {
            Gesture::Tap { destination, .. } | Gesture::DoubleTap { destination, .. } => {
                Some(destination_fraction(*destination, self.destination))
            }
            _ => None,
        }
    }
}

/// Resolves actions for one frame: a located region plus the destination space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    region: ScreenRegion,
    destination: Extent,
}

impl CoordinateMapper {
    pub fn new(region: ScreenRegion, destination: Extent) -> Self {
        Self {
            region,
            destination,
        }
    }

    pub fn region(&self) -> &ScreenRegion {
        &self.region
    }

    pub fn destination(&self) -> Extent {
        self.destination
    }

    /// Maps a normalized point to destination units through the frame pixel.
    pub fn to_destination(&self, point: NormalizedPoint) -> DestinationPoint {
        let pixel = normalized_to_frame(point.clamped(), &self.region);
        frame_to_destination(pixel, &self.region, self.destination)
    }

    /// Clamps and resolves `action`.  Returns `None` for actions without HID output.
    pub fn resolve(&self, action: &Action) -> Option<ResolvedAction> {
        let gesture = match action.clamped() {
            Action::Tap(p) => Gesture::Tap {
                normalized: p,
                destination: self.to_destination(p),
            },
            Action::DoubleTap(p) => Gesture::DoubleTap {
                normalized: p,
                destination: self.to_destination(p),
            },
            Action::Swipe { dx, dy } => Gesture::Swipe { dx, dy },
            Action::TypeText(text) => Gesture::TypeText(text),
            Action::None | Action::Done => return None,
        };
        Some(ResolvedAction {
            gesture,
            destination: self.destination,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_map_close(a: &AffineMap, b: &AffineMap) {
        for (l, r) in [
            (a.scale_x, b.scale_x),
            (a.scale_y, b.scale_y),
            (a.offset_x, b.offset_x),
            (a.offset_y, b.offset_y),
        ] {
            assert!((l - r).abs() < 1e-9, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_normalized_center_maps_to_region_center() {
        // Arrange
        let region = ScreenRegion::new(0, 0, 1000, 800);

        // Act
        let pixel = normalized_to_frame(NormalizedPoint::center(), &region);

        // Assert
        assert_eq!(pixel, (500, 400));
    }

    #[test]
    fn test_round_trip_center_with_identity_destination() {
        // Arrange: destination shares the region's extent
        let region = ScreenRegion::new(100, 50, 1000, 800);
        let pixel = normalized_to_frame(NormalizedPoint::center(), &region);

        // Act
        let dest = frame_to_destination(pixel, &region, region.extent());
        let back = destination_fraction(dest, region.extent());

        // Assert
        assert_eq!(dest, DestinationPoint::new(500, 400));
        assert_eq!(back, NormalizedPoint::new(0.5, 0.5));
        assert_eq!(frame_to_normalized(pixel, &region), NormalizedPoint::new(0.5, 0.5));
    }

    #[test]
    fn test_offset_region_maps_to_fixed_destination() {
        // Arrange
        let region = ScreenRegion::new(100, 50, 1000, 800);
        let mapper = CoordinateMapper::new(region, Extent::new(280, 550));

        // Act
        let dest = mapper.to_destination(NormalizedPoint::new(0.25, 0.75));

        // Assert – 600/800·550 = 412.5 rounds half to even
        assert_eq!(dest, DestinationPoint::new(70, 412));
    }

    #[test]
    fn test_to_destination_clamps_out_of_range_point() {
        let mapper = CoordinateMapper::new(ScreenRegion::new(0, 0, 100, 100), Extent::new(10, 10));
        assert_eq!(mapper.to_destination(NormalizedPoint::new(2.0, -1.0)), DestinationPoint::new(10, 0));
    }

    #[test]
    fn test_identity_map_when_extents_match() {
        let region = ScreenRegion::new(0, 0, 640, 480);
        let map = AffineMap::frame_to_destination(&region, region.extent());
        assert_map_close(&map, &AffineMap::identity());
    }

    #[test]
    fn test_affine_composition_matches_step_functions() {
        // Arrange
        let region = ScreenRegion::new(100, 50, 1000, 800);
        let destination = Extent::new(280, 550);
        let composed = AffineMap::normalized_to_frame(&region)
            .then(&AffineMap::frame_to_destination(&region, destination));

        // Act
        let (x, y) = composed.apply_rounded(0.25, 0.75);

        // Assert
        assert_eq!((x, y), (70, 412));
    }

    #[test]
    fn test_affine_composition_is_associative() {
        let a = AffineMap {
            scale_x: 2.0,
            scale_y: 0.5,
            offset_x: 3.0,
            offset_y: -1.0,
        };
        let b = AffineMap::normalized_to_frame(&ScreenRegion::new(10, 20, 300, 400));
        let c = AffineMap::frame_to_destination(&ScreenRegion::new(5, 5, 200, 100), Extent::new(32767, 32767));

        assert_map_close(&a.then(&b).then(&c), &a.then(&b.then(&c)));
    }

    #[test]
    fn test_inverse_undoes_map() {
        let map = AffineMap::normalized_to_frame(&ScreenRegion::new(100, 50, 1000, 800));
        let inverse = map.inverse().expect("invertible");
        assert_map_close(&map.then(&inverse), &AffineMap::identity());
    }

    #[test]
    fn test_inverse_of_collapsed_axis_is_none() {
        let map = AffineMap::normalized_to_frame(&ScreenRegion::new(0, 0, 0, 10));
        assert!(map.inverse().is_none());
    }

    #[test]
    fn test_resolve_skips_idle_actions() {
        let mapper = CoordinateMapper::new(ScreenRegion::new(0, 0, 10, 10), Extent::new(10, 10));
        assert_eq!(mapper.resolve(&Action::None), None);
        assert_eq!(mapper.resolve(&Action::Done), None);
    }

    #[test]
    fn test_resolve_clamps_swipe() {
        let mapper = CoordinateMapper::new(ScreenRegion::new(0, 0, 10, 10), Extent::new(10, 10));
        let resolved = mapper.resolve(&Action::Swipe { dx: 3.0, dy: -0.2 }).unwrap();
        assert_eq!(resolved.gesture, Gesture::Swipe { dx: 1.0, dy: -0.2 });
        assert_eq!(resolved.destination, Extent::new(10, 10));
    }

    #[test]
    fn test_resolved_tap_fraction_of_destination() {
        // Arrange
        let mapper = CoordinateMapper::new(ScreenRegion::new(100, 50, 1000, 800), Extent::new(280, 550));

        // Act
        let resolved = mapper.resolve(&Action::Tap(NormalizedPoint::new(0.25, 0.75))).unwrap();

        // Assert
        let fraction = resolved.destination_fraction().unwrap();
        assert_eq!(fraction.x, 0.25);
        assert!((fraction.y - 412.0 / 550.0).abs() < 1e-12);
    }

    #[test]
    fn test_coordinate_frame_extent() {
        let extent = Extent::new(280, 550);
        assert_eq!(CoordinateFrame::DestinationDevice(extent).extent(), extent);
        assert_eq!(CoordinateFrame::CroppedScreen(extent).extent(), extent);
    }
}
