//! Road rasterizer and frame assembly
//!
//! One frame is emitted in four passes from a viewer car's camera:
//! background rects, ground trapezoids front to back with a running
//! horizon clip, walls back to front faded into fog, then sprites back to
//! front. Curvature is faked by accumulating a per-segment x shear while
//! projecting, which is what bends the trapezoid stack into a curve.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::sprites::{draw_kart, place_sprite};
use crate::consts::*;
use crate::pace_factor;
use crate::projection::{ScreenPoint, camera_depth};
use crate::road::{Rgb, SegColors};
use crate::sim::{FieldItemKind, RaceState, SkillId};
use crate::{interpolate, percent_remaining};

/// One drawing instruction, in paint order
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOp {
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: Rgb,
    },
    Quad {
        points: [Vec2; 4],
        color: Rgb,
    },
    Circle {
        center: Vec2,
        radius: f32,
        color: Rgb,
        /// Ring stroke width; None fills
        stroke: Option<f32>,
    },
    Sprite {
        id: SpriteId,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
    },
    /// Full-screen color overlay
    Tint {
        color: Rgb,
        alpha: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KartPose {
    Left,
    Straight,
    Right,
}

/// What to draw at a sprite destination; the platform layer maps these to
/// its own textures
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpriteId {
    /// Spinning pickup box; negative width means the mirrored half-turn
    PickupBox { width: f32 },
    Fireball { rotation: f32 },
    IceShard,
    Kart {
        car: usize,
        pose: KartPose,
        frozen: bool,
    },
    Shadow,
    ItemIcon(SkillId),
    LightningOverlay(u8),
}

const HAMA_TINT: Rgb = Rgb([255, 255, 255]);
const MUDO_TINT: Rgb = Rgb([0, 0, 0]);

/// Per-viewer frame emitter.
///
/// Owns the fx RNG stream and the cosmetic animation counters (pickup box
/// spin, fireball rotation). Race state is only mutated through the
/// projection scratch space on segments.
#[derive(Debug)]
pub struct Renderer {
    fx: Pcg32,
    camera_depth: f32,
    /// Segments drawn ahead of the camera (`Settings::draw_distance`)
    draw_distance: usize,
    box_width: f32,
    box_widening: bool,
    fire_rot: f32,
}

impl Renderer {
    pub fn new(fx_seed: u64, draw_distance: usize) -> Self {
        Self {
            fx: Pcg32::seed_from_u64(fx_seed),
            camera_depth: camera_depth(),
            draw_distance,
            box_width: 64.0,
            box_widening: false,
            fire_rot: 0.0,
        }
    }

    /// Ping-pong the pickup box spin and roll the fireball
    fn advance_animations(&mut self, pace: f32) {
        if self.box_widening {
            self.box_width += 4.0 * pace;
            if self.box_width >= 64.0 {
                self.box_widening = false;
            }
        } else {
            self.box_width -= 4.0 * pace;
            if self.box_width <= -64.0 {
                self.box_widening = true;
            }
        }

        self.fire_rot += 10.0 * pace;
        if self.fire_rot >= 360.0 {
            self.fire_rot = 0.0;
        }
    }

    /// Emit one frame from `viewer`'s camera
    pub fn render_frame(
        &mut self,
        race: &mut RaceState,
        viewer: usize,
        actual_fps: f32,
    ) -> Vec<DrawOp> {
        let pace = pace_factor(actual_fps);
        self.advance_animations(pace);

        let mut ops = Vec::new();
        let width = VIEW_W;
        let height = VIEW_H;
        let seg_count = race.road.segments.len();
        let track_length = race.road.track_length;

        let (position, player_x, air) = {
            let v = &race.cars[viewer];
            (v.position, v.player_x, v.player_y)
        };

        let base_index = race.road.find_index(position);
        let base_percent = percent_remaining(position, SEGMENT_LENGTH);

        // Bounce the camera up a little while airborne
        let cam_height = CAMERA_HEIGHT + air * air / 2.5;
        let player_z = cam_height * self.camera_depth;
        let player_segment = race.road.find_segment(position + player_z);
        let player_percent = percent_remaining(position + player_z, SEGMENT_LENGTH);
        let player_y = interpolate(player_segment.p1.y, player_segment.p2.y, player_percent);

        self.background(&mut ops, race);

        // Ground pass, front to back, lowering the horizon as we go
        let mut x = 0.0;
        let mut dx = -race.road.segments[base_index].curve * base_percent;
        let mut max_y = height;
        let mut clip = Vec::with_capacity(self.draw_distance);

        for n in 0..self.draw_distance {
            let idx = (base_index + n) % seg_count;
            let looped = idx < base_index;
            clip.push(max_y);

            let cam_x = player_x * ROAD_WIDTH - x;
            let cam_y = cam_height + player_y;
            let cam_z = position - if looped { track_length } else { 0.0 };

            {
                let seg = &mut race.road.segments[idx];
                seg.p1.project(
                    cam_x,
                    cam_y,
                    cam_z,
                    self.camera_depth,
                    width,
                    height,
                    ROAD_WIDTH,
                );
                seg.p2.project(
                    cam_x - dx,
                    cam_y,
                    cam_z,
                    self.camera_depth,
                    width,
                    height,
                    ROAD_WIDTH,
                );
                x += dx;
                dx += seg.curve;
            }

            let (p1, p2) = {
                let seg = &race.road.segments[idx];
                (seg.p1, seg.p2)
            };

            // Behind the near plane, below the horizon, or back-facing
            if p1.camera.z <= self.camera_depth
                || p2.screen.y >= max_y
                || p2.screen.y >= p1.screen.y
            {
                continue;
            }

            let colors = race.road.segments[idx / race.road.palette.road].colors;
            emit_ground(&mut ops, width, p1.screen, p2.screen, &colors);
            max_y = p2.screen.y;
        }

        // Wall pass, back to front, fading into fog with distance
        for n in (1..self.draw_distance).rev() {
            let idx = (base_index + n) % seg_count;
            let (s1, s2) = {
                let seg = &race.road.segments[idx];
                (seg.p1.screen, seg.p2.screen)
            };
            let colors = race.road.segments[idx / race.road.palette.strip].colors;
            let color = colors
                .wall
                .lerp(colors.fog, n as f32 / self.draw_distance as f32);
            emit_walls(&mut ops, s1, s2, clip[n], color);
        }

        self.field_items(&mut ops, race, base_index, &clip);
        self.polarity_tints(&mut ops, race, viewer);
        self.karts(&mut ops, race, viewer, base_index);

        ops
    }

    /// Ceiling, fog band, and ground backdrop behind the road
    fn background(&self, ops: &mut Vec<DrawOp>, race: &RaceState) {
        let p = &race.road.palette;
        let sky_h = VIEW_H / 3.0 + 29.0;
        let fog_h = VIEW_H * 3.0 / 20.0;
        let ground_y = VIEW_H / 3.0 + 13.0 + fog_h;
        ops.push(DrawOp::Rect {
            x: 0.0,
            y: 0.0,
            w: VIEW_W,
            h: sky_h,
            color: p.ceiling,
        });
        ops.push(DrawOp::Rect {
            x: 0.0,
            y: sky_h,
            w: VIEW_W,
            h: fog_h,
            color: p.fog,
        });
        ops.push(DrawOp::Rect {
            x: 0.0,
            y: ground_y,
            w: VIEW_W,
            h: VIEW_H - ground_y,
            color: p.dark_offroad,
        });
    }

    /// Pickup boxes and projectiles, back to front. Pickups in the two
    /// segments underfoot are skipped so the box never smears across the
    /// camera as the car drives through it.
    fn field_items(
        &mut self,
        ops: &mut Vec<DrawOp>,
        race: &RaceState,
        base_index: usize,
        clip: &[f32],
    ) {
        let seg_count = race.road.segments.len() as isize;
        for n in (-4..self.draw_distance as isize).rev() {
            let idx = (base_index as isize + n).rem_euclid(seg_count) as usize;
            let clip_y = clip[n.rem_euclid(self.draw_distance as isize) as usize];

            for item in &race.items {
                if race.road.find_index(item.z) != idx {
                    continue;
                }
                let (base_w, id) = match item.kind {
                    FieldItemKind::Pickup => {
                        if n < 2 {
                            continue;
                        }
                        (
                            self.box_width.abs().max(1.0),
                            SpriteId::PickupBox {
                                width: self.box_width,
                            },
                        )
                    }
                    FieldItemKind::Fireball => (
                        64.0,
                        SpriteId::Fireball {
                            rotation: self.fire_rot,
                        },
                    ),
                    FieldItemKind::IceShard => (64.0, SpriteId::IceShard),
                };

                let seg = &race.road.segments[idx];
                let percent = percent_remaining(item.z, SEGMENT_LENGTH);
                let scale = interpolate(seg.p1.screen.scale, seg.p2.screen.scale, percent);
                let sx = interpolate(seg.p1.screen.x, seg.p2.screen.x, percent)
                    + scale * item.x * ROAD_WIDTH * VIEW_W / 2.0;
                let sy = interpolate(seg.p1.screen.y, seg.p2.screen.y, percent);

                if let Some(p) = place_sprite(base_w, 64.0, scale, sx, sy, -0.5, -1.0, clip_y, false)
                {
                    ops.push(DrawOp::Sprite {
                        id,
                        x: p.x,
                        y: p.y,
                        w: p.w,
                        h: p.h,
                    });
                }
            }
        }
    }

    /// Full-screen flashes for polarity debuffs: the victim-side overlay
    /// while reversed, the caster-side overlay while the cast rings out
    fn polarity_tints(&self, ops: &mut Vec<DrawOp>, race: &RaceState, viewer: usize) {
        let v = &race.cars[viewer];
        for (debuff, color) in [(&v.mudo, MUDO_TINT), (&v.hama, HAMA_TINT)] {
            if debuff.alpha > 0.0 {
                ops.push(DrawOp::Tint {
                    color,
                    alpha: debuff.alpha.min(150.0),
                });
            }
            if debuff.cast_alpha > 0.0 {
                ops.push(DrawOp::Tint {
                    color,
                    alpha: debuff.cast_alpha.min(128.0),
                });
            }
        }
    }

    /// All karts, back to front, looked up through per-segment membership.
    /// Screen placement reads the projection of a segment a little ahead,
    /// which keeps karts from jumping at segment boundaries.
    fn karts(&mut self, ops: &mut Vec<DrawOp>, race: &RaceState, viewer: usize, base_index: usize) {
        let seg_count = race.road.segments.len();
        let resolution = VIEW_H / 300.0;

        for n in (-4..self.draw_distance as isize).rev() {
            let idx = (base_index as isize + n).rem_euclid(seg_count as isize) as usize;
            let next_idx = (seg_count - 1)
                .min((base_index as isize + n + 6).rem_euclid(seg_count as isize) as usize);

            for &c in &race.road.segments[idx].cars {
                let car = &race.cars[c];
                let nseg = &race.road.segments[next_idx];
                let percent = percent_remaining(car.position, SEGMENT_LENGTH);
                let scale = interpolate(nseg.p1.screen.scale, nseg.p2.screen.scale, percent);
                let lift = car.player_y * scale * 7000.0;
                let sx = interpolate(nseg.p1.screen.x, nseg.p2.screen.x, percent)
                    + scale * car.player_x * ROAD_WIDTH * VIEW_W / 2.0;
                let sy = interpolate(nseg.p1.screen.y - lift, nseg.p2.screen.y - lift, percent);
                let shadow_y = interpolate(nseg.p1.screen.y, nseg.p2.screen.y, percent);

                draw_kart(
                    ops,
                    &mut self.fx,
                    car,
                    c,
                    c == viewer,
                    scale,
                    sx,
                    sy,
                    shadow_y,
                    resolution,
                );
            }
        }
    }
}

/// Offroad backdrop, rumble strips, carriageway, and dashed lane markers
/// for one segment row
fn emit_ground(ops: &mut Vec<DrawOp>, width: f32, s1: ScreenPoint, s2: ScreenPoint, colors: &SegColors) {
    let r1 = s1.w / 2.0;
    let r2 = s2.w / 2.0;

    ops.push(DrawOp::Rect {
        x: 0.0,
        y: s2.y,
        w: width,
        h: s1.y - s2.y,
        color: colors.offroad,
    });

    ops.push(quad(
        (s1.x - s1.w - r1, s1.y),
        (s1.x - s1.w, s1.y),
        (s2.x - s2.w, s2.y),
        (s2.x - s2.w - r2, s2.y),
        colors.rumble,
    ));
    ops.push(quad(
        (s1.x + s1.w + r1, s1.y),
        (s1.x + s1.w, s1.y),
        (s2.x + s2.w, s2.y),
        (s2.x + s2.w + r2, s2.y),
        colors.rumble,
    ));
    ops.push(quad(
        (s1.x - s1.w, s1.y),
        (s1.x + s1.w, s1.y),
        (s2.x + s2.w, s2.y),
        (s2.x - s2.w, s2.y),
        colors.road,
    ));

    if let Some(lane_color) = colors.lane {
        let lanes = LANES as f32;
        let l1 = s1.w / 10.0_f32.max(4.0 * lanes);
        let l2 = s2.w / 10.0_f32.max(4.0 * lanes);
        let lane_w1 = s1.w * 2.0 / lanes;
        let lane_w2 = s2.w * 2.0 / lanes;
        let mut lane_x1 = s1.x - s1.w + lane_w1;
        let mut lane_x2 = s2.x - s2.w + lane_w2;
        for _ in 1..LANES {
            ops.push(quad(
                (lane_x1 - l1 / 2.0, s1.y),
                (lane_x1 + l1 / 2.0, s1.y),
                (lane_x2 + l2 / 2.0, s2.y),
                (lane_x2 - l2 / 2.0, s2.y),
                lane_color,
            ));
            lane_x1 += lane_w1;
            lane_x2 += lane_w2;
        }
    }
}

/// Left and right walls for one segment row, clipped by the ground pass
fn emit_walls(ops: &mut Vec<DrawOp>, s1: ScreenPoint, s2: ScreenPoint, clip_y: f32, color: Rgb) {
    let r1 = s1.w / 0.45;
    let r2 = s2.w / 0.45;
    let y1 = clip_y.min(s1.y);
    let y2 = clip_y.min(s2.y);

    ops.push(quad(
        (s1.x - s1.w - r1, y1),
        (s2.x - s2.w - r2, y2),
        (s2.x - s2.w - r2, y2 - r2 - 20.0),
        (s1.x - s1.w - r1, y1 - r1 - 20.0),
        color,
    ));
    ops.push(quad(
        (s1.x + s1.w + r1, y1),
        (s2.x + s2.w + r2, y2),
        (s2.x + s2.w + r2, y2 - r2 - 20.0),
        (s1.x + s1.w + r1, y1 - r1 - 20.0),
        color,
    ));
}

fn quad(a: (f32, f32), b: (f32, f32), c: (f32, f32), d: (f32, f32), color: Rgb) -> DrawOp {
    DrawOp::Quad {
        points: [
            Vec2::new(a.0, a.1),
            Vec2::new(b.0, b.1),
            Vec2::new(c.0, c.1),
            Vec2::new(d.0, d.1),
        ],
        color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::tests::race;

    fn frame(state: &mut RaceState) -> Vec<DrawOp> {
        Renderer::new(9, DRAW_DISTANCE).render_frame(state, 0, 60.0)
    }

    fn ground_quads(ops: &[DrawOp]) -> usize {
        ops.iter()
            .filter(|op| matches!(op, DrawOp::Quad { .. }))
            .count()
    }

    #[test]
    fn test_frame_opens_with_background() {
        let mut state = race(2);
        let ops = frame(&mut state);
        assert!(ops.len() > 3);
        for op in &ops[..3] {
            assert!(matches!(op, DrawOp::Rect { .. }));
        }
    }

    #[test]
    fn test_frame_contains_road_rows_and_karts() {
        let mut state = race(2);
        let ops = frame(&mut state);
        let quads = ground_quads(&ops);
        // Ground rows plus walls for all drawn segments
        assert!(quads > DRAW_DISTANCE, "only {quads} quads emitted");
        for c in 0..2 {
            assert!(
                ops.iter().any(|op| matches!(
                    op,
                    DrawOp::Sprite { id: SpriteId::Kart { car, .. }, .. } if *car == c
                )),
                "kart {c} missing"
            );
        }
    }

    #[test]
    fn test_pickup_boxes_near_camera_are_hidden() {
        let mut state = race(1);
        // Every pickup sits in the camera's own segment
        let z = state.cars[0].position;
        for item in &mut state.items {
            item.z = z;
        }
        let ops = frame(&mut state);
        assert!(!ops
            .iter()
            .any(|op| matches!(op, DrawOp::Sprite { id: SpriteId::PickupBox { .. }, .. })));
    }

    #[test]
    fn test_polarity_overlay_follows_debuff() {
        let mut state = race(2);
        let before = frame(&mut state);
        assert!(!before.iter().any(|op| matches!(op, DrawOp::Tint { .. })));

        state.cars[0].hama.alpha = 400.0;
        let ops = frame(&mut state);
        let tint = ops
            .iter()
            .find_map(|op| match op {
                DrawOp::Tint { color, alpha } => Some((*color, *alpha)),
                _ => None,
            })
            .expect("no overlay emitted");
        assert_eq!(tint.0, HAMA_TINT);
        // Overlay strength saturates well below full opacity
        assert_eq!(tint.1, 150.0);
    }

    #[test]
    fn test_projection_scratch_marks_drawn_rows() {
        let mut state = race(1);
        frame(&mut state);
        let base = state.road.find_index(state.cars[0].position);
        let near = &state.road.segments[(base + 2) % state.road.segments.len()];
        assert!(near.p1.screen.scale > 0.0);
    }

    #[test]
    fn test_fx_stream_does_not_touch_sim_rng() {
        let mut a = race(3);
        let mut b = race(3);
        // Render only one of the two races
        for _ in 0..30 {
            frame(&mut a);
        }
        let ra: Vec<u32> = {
            use rand::Rng;
            (0..8).map(|_| a.rng.random()).collect()
        };
        let rb: Vec<u32> = {
            use rand::Rng;
            (0..8).map(|_| b.rng.random()).collect()
        };
        assert_eq!(ra, rb);
    }

    #[test]
    fn test_far_draw_distance_draws_more_road() {
        let mut state = race(1);
        let near = ground_quads(&Renderer::new(9, DRAW_DISTANCE).render_frame(&mut state, 0, 60.0));
        let far =
            ground_quads(&Renderer::new(9, DRAW_DISTANCE * 2).render_frame(&mut state, 0, 60.0));
        assert!(far > near, "far {far} vs near {near}");
    }

    #[test]
    fn test_box_spin_ping_pongs() {
        let mut r = Renderer::new(1, DRAW_DISTANCE);
        let mut widths = Vec::new();
        for _ in 0..80 {
            r.advance_animations(1.0);
            widths.push(r.box_width);
        }
        assert!(widths.iter().any(|w| *w < 0.0));
        assert!(widths.iter().all(|w| (-68.0..=68.0).contains(w)));
        // It comes back
        for _ in 0..40 {
            r.advance_animations(1.0);
        }
        assert!(r.box_width > -64.0);
        assert!(r.box_widening || r.box_width > 0.0);
    }
}
