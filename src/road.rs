//! Segmented road model
//!
//! A course is an ordered, cyclic sequence of fixed-length segments, each
//! carrying curvature, elevation, and a resolved color row. Geometry is
//! expanded from a compact descriptor of symbolic stretches; easing blends
//! curvature and elevation so stretch boundaries have no discontinuity.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::consts::{RUMBLE_LENGTH, SEGMENT_LENGTH};
use crate::data::CoursePalette;
use crate::projection::WorldPoint;
use crate::{ease_in, ease_in_out, ease_out};

/// An sRGB color triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Rgb = Rgb([200, 200, 200]);

    /// Blend toward `other` by `t` in 0..1 (fog fade)
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t) as u8;
        Rgb([
            mix(self.0[0], other.0[0]),
            mix(self.0[1], other.0[1]),
            mix(self.0[2], other.0[2]),
        ])
    }
}

/// Curve sharpness presets (signed at use sites)
pub mod curve {
    pub const NONE: f32 = 0.0;
    pub const EASY: f32 = 12.0;
    pub const MEDIUM: f32 = 16.0;
    pub const HARD: f32 = 24.0;
}

/// Hill height presets, in segment-length steps
pub mod hill {
    pub const NONE: f32 = 0.0;
    pub const LOW: f32 = 50.0;
    pub const MEDIUM: f32 = 90.0;
    pub const HIGH: f32 = 130.0;
}

/// One symbolic stretch of course geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StretchKind {
    Straight,
    SCurves,
    CurveLeft,
    CurveRight,
}

/// The compact course geometry descriptor: eight stretches, bookended by
/// straights so the start line always sits on flat road.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseLayout {
    pub stretches: [StretchKind; 8],
}

impl CourseLayout {
    /// Random walk through the non-straight stretch kinds. The first entry
    /// is always straight and the walk wraps 1..=3, so a generated course
    /// never repeats a stretch kind back-to-back.
    pub fn generate(rng: &mut impl Rng) -> Self {
        let kinds = [
            StretchKind::Straight,
            StretchKind::SCurves,
            StretchKind::CurveLeft,
            StretchKind::CurveRight,
        ];
        let mut stretches = [StretchKind::Straight; 8];
        let mut last: i32 = 0;
        for slot in stretches.iter_mut().take(7) {
            *slot = kinds[last as usize];
            last += if rng.random_bool(0.5) { 1 } else { -1 };
            if last < 1 {
                last = 3;
            } else if last > 3 {
                last = 1;
            }
        }
        Self { stretches }
    }
}

/// Resolved color row for one segment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegColors {
    pub road: Rgb,
    pub offroad: Rgb,
    pub wall: Rgb,
    pub rumble: Rgb,
    pub fog: Rgb,
    /// Present on light rows only; drawn as dashed lane markers
    pub lane: Option<Rgb>,
    pub ceiling: Rgb,
}

impl SegColors {
    fn light(p: &CoursePalette) -> Self {
        Self {
            road: p.light_road,
            offroad: p.light_offroad,
            wall: p.light_wall,
            rumble: p.light_rumble,
            fog: p.fog,
            lane: Some(Rgb::WHITE),
            ceiling: p.ceiling,
        }
    }

    fn dark(p: &CoursePalette) -> Self {
        Self {
            road: p.dark_road,
            offroad: p.dark_offroad,
            wall: p.dark_wall,
            rumble: p.dark_rumble,
            fog: p.fog,
            lane: None,
            ceiling: p.ceiling,
        }
    }

    /// Solid white band across the carriageway (start/finish lines)
    fn band(p: &CoursePalette, wall: Rgb) -> Self {
        Self {
            road: Rgb::WHITE,
            offroad: Rgb::WHITE,
            wall,
            rumble: Rgb::WHITE,
            fog: p.fog,
            lane: Some(Rgb::WHITE),
            ceiling: p.ceiling,
        }
    }
}

/// A fixed-length slice of track geometry.
///
/// `p1`/`p2` are the near/far boundary points; their camera/screen fields
/// are scratch space overwritten by the renderer every frame. `cars` holds
/// indices into the race's car list, maintained by the simulation.
#[derive(Debug, Clone)]
pub struct Segment {
    pub index: usize,
    pub p1: WorldPoint,
    pub p2: WorldPoint,
    pub curve: f32,
    pub colors: SegColors,
    pub cars: Vec<usize>,
}

/// The built road: cyclic segment sequence plus the course palette
#[derive(Debug, Clone)]
pub struct Road {
    pub segments: Vec<Segment>,
    pub palette: CoursePalette,
    pub track_length: f32,
}

impl Road {
    /// Expand a course descriptor into segments. Curve sharpness for the
    /// single-curve stretches is drawn per stretch from {medium, hard}.
    pub fn build(layout: &CourseLayout, palette: CoursePalette, rng: &mut impl Rng) -> Self {
        let mut road = Self {
            segments: Vec::new(),
            palette,
            track_length: 0.0,
        };

        for stretch in &layout.stretches {
            let sharpness = if rng.random_bool(0.5) {
                curve::MEDIUM
            } else {
                curve::HARD
            };
            match stretch {
                StretchKind::Straight => road.add_straight(30),
                StretchKind::SCurves => road.add_s_curves(30, rng),
                StretchKind::CurveLeft => road.add_curve(30, -sharpness, hill::NONE),
                StretchKind::CurveRight => road.add_curve(30, sharpness, hill::NONE),
            }
        }

        road.track_length = road.segments.len() as f32 * SEGMENT_LENGTH;

        // First two segments become the finish and start bands
        road.segments[0].colors = SegColors::band(&road.palette, road.palette.light_wall);
        road.segments[1].colors = SegColors::band(&road.palette, road.palette.dark_wall);

        road
    }

    fn last_y(&self) -> f32 {
        self.segments.last().map_or(0.0, |s| s.p2.y)
    }

    fn add_segment(&mut self, curve: f32, y: f32) {
        let n = self.segments.len();
        let colors = if (n / RUMBLE_LENGTH) % 2 == 1 {
            SegColors::dark(&self.palette)
        } else {
            SegColors::light(&self.palette)
        };
        self.segments.push(Segment {
            index: n,
            p1: WorldPoint::new(self.last_y(), n as f32 * SEGMENT_LENGTH),
            p2: WorldPoint::new(y, (n + 1) as f32 * SEGMENT_LENGTH),
            curve,
            colors,
            cars: Vec::new(),
        });
    }

    /// Add one stretch: quadratic ease into the curvature over `enter`
    /// segments, hold it, ease back out over `leave`; elevation ramps with a
    /// cosine blend across the whole stretch.
    pub fn add_road(&mut self, enter: usize, hold: usize, leave: usize, curve: f32, y_steps: f32) {
        let start_y = self.last_y();
        let end_y = start_y + y_steps.trunc() * SEGMENT_LENGTH;
        let total = (enter + hold + leave) as f32;

        for n in 0..enter {
            self.add_segment(
                ease_in(0.0, curve, n as f32 / enter as f32),
                ease_in_out(start_y, end_y, n as f32 / total),
            );
        }
        for n in 0..hold {
            self.add_segment(curve, ease_in_out(start_y, end_y, (enter + n) as f32 / total));
        }
        for n in 0..leave {
            self.add_segment(
                ease_out(curve, 0.0, n as f32 / leave as f32),
                ease_in_out(start_y, end_y, (enter + hold + n) as f32 / total),
            );
        }
    }

    pub fn add_straight(&mut self, num: usize) {
        self.add_road(num, num, num, curve::NONE, hill::NONE);
    }

    pub fn add_curve(&mut self, num: usize, curve: f32, height: f32) {
        self.add_road(num, num, num, curve, height);
    }

    pub fn add_hill(&mut self, num: usize, height: f32) {
        self.add_road(num, num, num, curve::NONE, height);
    }

    pub fn add_s_curves(&mut self, num: usize, rng: &mut impl Rng) {
        let c = if rng.random_bool(0.5) {
            curve::MEDIUM
        } else {
            curve::HARD
        };
        self.add_road(num, num, num, -c, hill::NONE);
        self.add_road(num, num, num, c, hill::NONE);
    }

    /// Index of the segment containing track position `z` (wrapping)
    #[inline]
    pub fn find_index(&self, z: f32) -> usize {
        ((z / SEGMENT_LENGTH).floor() as isize).rem_euclid(self.segments.len() as isize) as usize
    }

    #[inline]
    pub fn find_segment(&self, z: f32) -> &Segment {
        &self.segments[self.find_index(z)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn test_road(seed: u64) -> Road {
        let mut rng = Pcg32::seed_from_u64(seed);
        let layout = CourseLayout::generate(&mut rng);
        Road::build(&layout, CoursePalette::default(), &mut rng)
    }

    #[test]
    fn test_layout_starts_and_ends_straight() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..20 {
            let layout = CourseLayout::generate(&mut rng);
            assert_eq!(layout.stretches[0], StretchKind::Straight);
            assert_eq!(layout.stretches[7], StretchKind::Straight);
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = test_road(42);
        let b = test_road(42);
        assert_eq!(a.segments.len(), b.segments.len());
        assert_eq!(a.track_length, b.track_length);
        for (sa, sb) in a.segments.iter().zip(&b.segments) {
            assert_eq!(sa.curve, sb.curve);
            assert_eq!(sa.p2.y, sb.p2.y);
        }
    }

    #[test]
    fn test_segment_z_positions() {
        let road = test_road(1);
        for (n, seg) in road.segments.iter().enumerate() {
            assert_eq!(seg.p1.z, n as f32 * SEGMENT_LENGTH);
            assert_eq!(seg.p2.z, (n + 1) as f32 * SEGMENT_LENGTH);
        }
        assert_eq!(
            road.track_length,
            road.segments.len() as f32 * SEGMENT_LENGTH
        );
    }

    #[test]
    fn test_find_segment_wraparound() {
        let road = test_road(3);
        let count = road.segments.len();
        assert_eq!(road.find_index(0.0), 0);
        assert_eq!(road.find_index(road.track_length - 0.01), count - 1);
        assert_eq!(road.find_index(road.track_length + 0.01), 0);
        assert_eq!(road.find_index(SEGMENT_LENGTH * 2.5), 2);
        // Arbitrary positions match the closed form
        for p in [10.0, 4321.0, road.track_length * 1.75] {
            let expect = ((p / SEGMENT_LENGTH).floor() as usize) % count;
            assert_eq!(road.find_index(p), expect);
        }
    }

    #[test]
    fn test_stretch_boundaries_have_no_curvature_jump() {
        let road = test_road(11);
        for pair in road.segments.windows(2) {
            // Easing keeps adjacent curvature within one ease-in step
            assert!(
                (pair[1].curve - pair[0].curve).abs() <= curve::HARD / 15.0 + 1e-3,
                "jump at segment {}",
                pair[0].index
            );
        }
    }

    #[test]
    fn test_hills_return_to_level() {
        let mut road = Road {
            segments: Vec::new(),
            palette: CoursePalette::default(),
            track_length: 0.0,
        };
        road.add_hill(10, hill::MEDIUM);
        let peak = road.last_y();
        let rise = hill::MEDIUM * SEGMENT_LENGTH;
        // The ease lands one step short of the target, so compare loosely
        assert!((peak - rise).abs() < rise * 0.01);
        road.add_hill(10, -hill::MEDIUM);
        assert!(road.last_y().abs() < rise * 0.01);
    }

    #[test]
    fn test_start_finish_bands() {
        let road = test_road(9);
        assert_eq!(road.segments[0].colors.road, Rgb::WHITE);
        assert_eq!(road.segments[1].colors.road, Rgb::WHITE);
        assert_ne!(road.segments[2].colors.road, Rgb::WHITE);
    }

    #[test]
    fn test_rgb_lerp_endpoints() {
        let a = Rgb([0, 100, 200]);
        let b = Rgb([200, 0, 100]);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Rgb([100, 50, 150]));
    }
}
