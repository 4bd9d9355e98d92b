//! Sprite placement and kart decoration
//!
//! Converts a projected road-space position plus a nominal sprite size
//! into screen-space destination rects, with horizon clipping and an
//! oversize sanity cut for near-plane blowups.

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::frame::{DrawOp, KartPose, SpriteId};
use crate::consts::{ROAD_WIDTH, VIEW_W};
use crate::road::Rgb;
use crate::sim::Car;

const SMOKE: Rgb = Rgb([200, 200, 200]);
const BLACK_SMOKE: Rgb = Rgb([47, 47, 47]);
const BOOST1: Rgb = Rgb([128, 128, 255]);
const BOOST2: Rgb = Rgb([164, 164, 255]);
const ATTACK_RING: Rgb = Rgb([230, 230, 230]);

/// Destination rect for a placed sprite, plus how much of its bottom the
/// horizon clip removes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpritePlacement {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub clip_h: f32,
}

/// Projected size of a `base`-sized sprite at `scale`
#[inline]
pub fn sprite_extent(base: f32, scale: f32) -> f32 {
    base * scale * (VIEW_W / 2.0) * 0.3 * (1.0 / 40.0) * ROAD_WIDTH
}

/// Place a sprite of nominal size `base_w` x `base_h` at a projected road
/// position.
///
/// `anchored` marks camera-close sprites (karts): they keep their full
/// height instead of losing rows to the horizon clip, and ignore a zero
/// `clip_y`. Returns None when fully clipped or implausibly large (a
/// near-plane projection artifact).
pub fn place_sprite(
    base_w: f32,
    base_h: f32,
    scale: f32,
    dest_x: f32,
    dest_y: f32,
    offset_x: f32,
    offset_y: f32,
    clip_y: f32,
    anchored: bool,
) -> Option<SpritePlacement> {
    let dest_w = sprite_extent(base_w, scale);
    let dest_h = sprite_extent(base_h, scale);

    let x = dest_x + dest_w * offset_x;
    let mut y = dest_y;
    if !anchored {
        y += dest_h * offset_y;
    }

    let clip_h = if clip_y > 0.0 {
        (y + dest_h - clip_y).max(0.0)
    } else {
        0.0
    };

    if clip_h >= dest_h {
        return None;
    }
    if dest_h >= 260.0 || dest_w >= 260.0 {
        return None;
    }

    let h = if anchored { dest_h } else { dest_h - clip_h };
    Some(SpritePlacement {
        x,
        y,
        w: dest_w,
        h,
        clip_h,
    })
}

/// Emit one kart with all its decorations: shadow, body sprite, engine
/// bounce and shake offsets, exhaust or turbo smoke, the attack ring, the
/// held item icon, and the lightning overlay.
#[allow(clippy::too_many_arguments)]
pub fn draw_kart(
    ops: &mut Vec<DrawOp>,
    fx: &mut Pcg32,
    car: &Car,
    car_index: usize,
    is_viewer: bool,
    scale: f32,
    dest_x: f32,
    dest_y: f32,
    shadow_y: f32,
    resolution: f32,
) {
    const KART: f32 = 64.0;

    let speed_percent =
        car.speed / (crate::consts::MAX_SPEED * car.stats.max_speed_mod).max(1.0);
    let bounce = 1.5 * fx.random::<f32>() * speed_percent * resolution * sign(fx);
    let shake = if car.shake {
        3.0 * fx.random::<f32>() * sign(fx)
    } else {
        0.0
    };

    // Steering pose; spin-outs cycle poses off the control timer
    let steer = if car.inputs.left {
        -1.0
    } else if car.inputs.right {
        1.0
    } else {
        0.0
    };
    let pose = if car.no_control > 0.0 {
        match (car.no_control * 10.0).round() as i64 % 3 {
            0 => KartPose::Left,
            1 => KartPose::Straight,
            _ => KartPose::Right,
        }
    } else if steer < 0.0 {
        KartPose::Left
    } else if steer > 0.0 {
        KartPose::Right
    } else {
        KartPose::Straight
    };

    let Some(body) = place_sprite(
        KART,
        KART,
        scale,
        dest_x + shake,
        dest_y + bounce + shake,
        -0.5,
        -1.0,
        0.0,
        true,
    ) else {
        return;
    };

    if let Some(shadow) = place_sprite(KART, KART / 2.0, scale, dest_x, shadow_y, -0.5, 0.0, 0.0, true)
    {
        ops.push(DrawOp::Sprite {
            id: SpriteId::Shadow,
            x: body.x,
            y: shadow_y,
            w: shadow.w,
            h: shadow.h,
        });
    }

    ops.push(DrawOp::Sprite {
        id: SpriteId::Kart {
            car: car_index,
            pose,
            frozen: car.frozen > 0.0,
        },
        x: body.x,
        y: body.y,
        w: body.w,
        h: body.h,
    });

    // Exhaust: skipped while airborne, stopped, or frozen over
    if car.player_y == 0.0 && car.speed > 0.0 && car.frozen <= 0.0 {
        draw_exhaust(ops, fx, car, &body, scale, bounce);
    }

    if car.attack > 0.0 {
        let radius = sprite_extent(100.0 - car.attack, scale).max(3.0);
        ops.push(DrawOp::Circle {
            center: Vec2::new(body.x + body.w / 2.0, body.y + body.h / 2.0),
            radius,
            color: ATTACK_RING,
            stroke: Some(3.0),
        });
    }

    // Other karts show their held item above their heads; the viewer's own
    // item lives on the HUD instead
    if let Some(skill) = car.item
        && !is_viewer
    {
        let icon = sprite_extent(KART, scale) / 2.0;
        ops.push(DrawOp::Sprite {
            id: SpriteId::ItemIcon(skill),
            x: body.x,
            y: body.y - body.h,
            w: icon,
            h: icon,
        });
    }

    if car.lightning.abs() >= 0.1 {
        let frame = ((car.lightning * 10.0) as i64).rem_euclid(2) as u8;
        let bolt_w = sprite_extent(KART, scale);
        let bolt_h = sprite_extent(KART * 2.0, scale);
        ops.push(DrawOp::Sprite {
            id: SpriteId::LightningOverlay(frame),
            x: body.x,
            y: body.y - bolt_h,
            w: bolt_w,
            h: bolt_h,
        });
    }
}

/// Randomly sized exhaust circles behind the wheels. Size and color key
/// off the mini-turbo bank: grey idling, black after a failed turbo, blue
/// flicker while a charge is paying out.
fn draw_exhaust(
    ops: &mut Vec<DrawOp>,
    fx: &mut Pcg32,
    car: &Car,
    body: &SpritePlacement,
    scale: f32,
    bounce: f32,
) {
    let threshold = car.stats.threshold;
    let boost = car.boost;

    let color = if boost < 0.0 {
        BLACK_SMOKE
    } else if boost < threshold - 0.5 {
        SMOKE
    } else if boost < threshold {
        BOOST1
    } else if fx.random_bool(0.5) {
        BOOST1
    } else {
        BOOST2
    };

    let base = (12.0 * bounce).max(6.0);
    let (lo, extra) = if boost <= threshold - 0.5 {
        (1.0, 0.0)
    } else if boost <= threshold {
        (8.0, 8.0)
    } else {
        (10.0, 10.0)
    };

    let left = Vec2::new(body.x + body.w / 4.0, body.y + body.h);
    let right = Vec2::new(body.x + body.w * 7.0 / 8.0, body.y + body.h);

    for anchor in [left, right] {
        let puff = fx.random_range(lo..=base + extra);
        let radius = sprite_extent(puff, scale);
        if radius > 0.5 {
            let spread = fx.random_range(3.0..=17.0);
            let offset = sprite_extent(spread, scale) * sign(fx);
            ops.push(DrawOp::Circle {
                center: Vec2::new(anchor.x + offset, anchor.y),
                radius,
                color,
                stroke: None,
            });
        }
    }
}

#[inline]
fn sign(fx: &mut Pcg32) -> f32 {
    if fx.random_bool(0.5) { 1.0 } else { -1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_placement_applies_offsets() {
        let p = place_sprite(64.0, 64.0, 5e-4, 300.0, 200.0, -0.5, -1.0, 0.0, false).unwrap();
        // Centered horizontally, raised by its own height
        assert!((p.x - (300.0 - p.w / 2.0)).abs() < 1e-3);
        assert!((p.y - (200.0 - p.h)).abs() < 1e-3);
        assert_eq!(p.clip_h, 0.0);
    }

    #[test]
    fn test_horizon_clip_shortens_items() {
        // Clip line 40 px below the sprite top
        let p = place_sprite(64.0, 64.0, 5e-4, 300.0, 200.0, -0.5, 0.0, 200.0 + 40.0, false)
            .unwrap();
        let full = sprite_extent(64.0, 5e-4);
        assert!((p.clip_h - (full - 40.0)).abs() < 1e-3);
        assert!((p.h - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_fully_clipped_sprite_is_dropped() {
        assert!(place_sprite(64.0, 64.0, 5e-4, 300.0, 200.0, -0.5, 0.0, 100.0, false).is_none());
    }

    #[test]
    fn test_near_plane_blowups_are_dropped() {
        assert!(place_sprite(64.0, 64.0, 10.0, 300.0, 200.0, -0.5, 0.0, 0.0, false).is_none());
    }

    #[test]
    fn test_anchored_sprites_keep_full_height() {
        let p = place_sprite(64.0, 64.0, 5e-4, 300.0, 200.0, -0.5, -1.0, 250.0, true).unwrap();
        let full = sprite_extent(64.0, 5e-4);
        assert!((p.h - full).abs() < 1e-3);
        // y offset is ignored for anchored sprites
        assert_eq!(p.y, 200.0);
    }

    #[test]
    fn test_kart_draw_emits_body_and_shadow() {
        let mut ops = Vec::new();
        let mut fx = Pcg32::seed_from_u64(1);
        let car = Car::new(crate::sim::state::tests::default_stats(), false, 0.0);
        draw_kart(&mut ops, &mut fx, &car, 0, false, 5e-4, 360.0, 400.0, 410.0, 1.6);
        assert!(ops.iter().any(|op| matches!(
            op,
            DrawOp::Sprite {
                id: SpriteId::Kart { car: 0, .. },
                ..
            }
        )));
        assert!(ops
            .iter()
            .any(|op| matches!(op, DrawOp::Sprite { id: SpriteId::Shadow, .. })));
    }

    #[test]
    fn test_attack_ring_grows_as_window_closes() {
        let mut fx = Pcg32::seed_from_u64(1);
        let stats = crate::sim::state::tests::default_stats();
        let radius_at = |attack: f32, fx: &mut Pcg32| {
            let mut ops = Vec::new();
            let mut car = Car::new(stats.clone(), false, 0.0);
            car.attack = attack;
            draw_kart(&mut ops, fx, &car, 0, false, 5e-4, 360.0, 400.0, 410.0, 1.6);
            ops.iter()
                .find_map(|op| match op {
                    DrawOp::Circle {
                        radius,
                        stroke: Some(_),
                        ..
                    } => Some(*radius),
                    _ => None,
                })
                .unwrap()
        };
        assert!(radius_at(10.0, &mut fx) > radius_at(80.0, &mut fx));
    }
}
