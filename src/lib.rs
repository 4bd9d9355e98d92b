//! Retro Rally - a pseudo-3D segmented-road kart racer core
//!
//! Core modules:
//! - `sim`: Deterministic race simulation (car kinematics, items, CPU drivers)
//! - `render`: Backend-agnostic draw-op emission (road rasterizer, sprite placer)
//! - `road`: Segmented road model built from a course descriptor
//! - `projection`: World-to-screen perspective hack
//! - `data`: Stat/persona/palette resolution from `key = value` data files
//! - `settings`: User preferences

pub mod data;
pub mod projection;
pub mod render;
pub mod road;
pub mod settings;
pub mod sim;

pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Target frame rate the pace factor measures against
    pub const TARGET_FPS: f32 = 60.0;

    /// Render viewport
    pub const VIEW_W: f32 = 720.0;
    pub const VIEW_H: f32 = 480.0;

    /// World geometry
    pub const SEGMENT_LENGTH: f32 = 150.0;
    /// Half-width of the road in world units (full road spans -ROAD_WIDTH..ROAD_WIDTH)
    pub const ROAD_WIDTH: f32 = 1600.0;
    pub const CAMERA_HEIGHT: f32 = 800.0;
    /// Field of view, degrees
    pub const FIELD_OF_VIEW: f32 = 156.0;
    /// Number of segments drawn ahead of the camera
    pub const DRAW_DISTANCE: usize = 50;
    /// Segments per light/dark alternation
    pub const RUMBLE_LENGTH: usize = 1;
    pub const LANES: u32 = 2;

    /// Base speed terms. Top speed covers one segment per tick.
    pub const MAX_SPEED: f32 = SEGMENT_LENGTH * TARGET_FPS;
    pub const ACCEL: f32 = MAX_SPEED / 5.0;
    pub const BRAKING: f32 = -MAX_SPEED;
    pub const DECEL: f32 = -MAX_SPEED / 5.0;
    pub const OFFROAD_DECEL: f32 = -MAX_SPEED / 2.0;
    pub const OFFROAD_LIMIT: f32 = MAX_SPEED / 2.0;

    /// Vertical launch physics (knockback bounces)
    pub const GRAVITY: f32 = -3.0;
    pub const LAUNCH_RATE: f32 = 6.0;

    /// Lateral offset hard clamp, in road-width units
    pub const MAX_PLAYER_X: f32 = 2.5;

    /// Laps to finish: 3 real laps plus the lap granted on the start line
    pub const MAX_LAPS: u32 = 4;

    /// Pre-race countdown, seconds
    pub const COUNTDOWN_SECS: f32 = 3.0;
}

/// Per-tick frame-time compensation factor.
///
/// When a frame runs behind the target rate, several per-tick deltas are
/// scaled up so game speed stays roughly constant at low frame rates. This
/// is a compensation hack, not delta-time integration; it is computed once
/// per tick and threaded through the whole update.
#[inline]
pub fn pace_factor(actual_fps: f32) -> f32 {
    (1.0 + (consts::TARGET_FPS - actual_fps) / consts::TARGET_FPS).max(1.0)
}

/// Quadratic ease into a value (flat start)
#[inline]
pub fn ease_in(a: f32, b: f32, percent: f32) -> f32 {
    a + (b - a) * percent.powi(2)
}

/// Quadratic ease out of a value (flat end)
#[inline]
pub fn ease_out(a: f32, b: f32, percent: f32) -> f32 {
    a + (b - a) * (1.0 - (1.0 - percent).powi(2))
}

/// Cosine ease-in-out
#[inline]
pub fn ease_in_out(a: f32, b: f32, percent: f32) -> f32 {
    a + (b - a) * ((percent * std::f32::consts::PI).cos() * -0.5 + 0.5)
}

/// Linear interpolation
#[inline]
pub fn interpolate(a: f32, b: f32, percent: f32) -> f32 {
    a + (b - a) * percent
}

/// How far `n` sits into its current period of `total`, as 0..1
#[inline]
pub fn percent_remaining(n: f32, total: f32) -> f32 {
    n.rem_euclid(total) / total
}

/// Advance a value by `accel * dt`
#[inline]
pub fn accelerate(speed: f32, accel: f32, dt: f32) -> f32 {
    speed + accel * dt
}

/// Restrict a value to `[minimum, maximum]`
#[inline]
pub fn limit(value: f32, minimum: f32, maximum: f32) -> f32 {
    value.clamp(minimum, maximum)
}

/// Add `increment` to `start`, restricted to `[0, maximum]`
#[inline]
pub fn increase(start: f32, increment: f32, maximum: f32) -> f32 {
    (start + increment).clamp(0.0, maximum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ease_boundaries_exact() {
        for (f, name) in [
            (ease_in as fn(f32, f32, f32) -> f32, "ease_in"),
            (ease_out, "ease_out"),
            (ease_in_out, "ease_in_out"),
        ] {
            assert_eq!(f(3.0, 9.0, 0.0), 3.0, "{name} at 0");
            assert!((f(3.0, 9.0, 1.0) - 9.0).abs() < 1e-5, "{name} at 1");
        }
    }

    #[test]
    fn test_ease_monotonic() {
        for f in [ease_in as fn(f32, f32, f32) -> f32, ease_out, ease_in_out] {
            let mut last = f(-4.0, 4.0, 0.0);
            for i in 1..=100 {
                let v = f(-4.0, 4.0, i as f32 / 100.0);
                assert!(v >= last - 1e-6);
                last = v;
            }
        }
    }

    #[test]
    fn test_pace_factor_floors_at_one() {
        assert_eq!(pace_factor(60.0), 1.0);
        assert_eq!(pace_factor(120.0), 1.0);
        assert!((pace_factor(30.0) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_increase_clamps() {
        assert_eq!(increase(5.0, 10.0, 12.0), 12.0);
        assert_eq!(increase(5.0, -10.0, 12.0), 0.0);
        assert_eq!(increase(5.0, 2.0, 12.0), 7.0);
    }
}
