//! World-to-screen projection
//!
//! Not a real 3D transform: a fixed camera projects points by perspective
//! division along z only. Hills are folded into the camera's vertical offset
//! rather than rotated, which is what keeps the trapezoid illusion stable.

use crate::consts::FIELD_OF_VIEW;

/// Camera-relative coordinates, after subtracting the camera pose
#[derive(Debug, Clone, Copy, Default)]
pub struct CameraFrame {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Projected screen-space coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreenPoint {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
    /// Projected road half-width at this depth
    pub w: f32,
}

/// A point on the road in world space, with scratch space for the
/// per-frame projection results (overwritten on every render pass).
#[derive(Debug, Clone, Copy)]
pub struct WorldPoint {
    pub x: f32,
    /// Elevation
    pub y: f32,
    /// Distance along the track
    pub z: f32,
    pub camera: CameraFrame,
    pub screen: ScreenPoint,
}

impl WorldPoint {
    pub fn new(y: f32, z: f32) -> Self {
        Self {
            x: 0.0,
            y,
            z,
            camera: CameraFrame::default(),
            screen: ScreenPoint::default(),
        }
    }

    /// Project this point through the given camera pose.
    ///
    /// The `max(1, z + 1)` guard keeps the perspective division from
    /// blowing up or flipping sign for points at or behind the camera
    /// plane; such points still get a (meaningless) projection and are
    /// culled by the renderer's clip tests instead.
    #[allow(clippy::too_many_arguments)]
    pub fn project(
        &mut self,
        camera_x: f32,
        camera_y: f32,
        camera_z: f32,
        camera_depth: f32,
        width: f32,
        height: f32,
        road_width: f32,
    ) {
        self.camera = CameraFrame {
            x: self.x - camera_x,
            y: self.y - camera_y,
            z: self.z - camera_z,
        };
        let scale = camera_depth / (self.camera.z + 1.0).max(1.0);
        self.screen = ScreenPoint {
            scale,
            x: (width / 2.0 + scale * self.camera.x * width / 2.0).round(),
            y: (height / 2.0 - scale * self.camera.y * height / 2.0).round(),
            w: (scale * road_width * width / 2.0).round(),
        };
    }
}

/// Distance from the eye to the projection plane for the configured FOV
pub fn camera_depth() -> f32 {
    1.0 / ((FIELD_OF_VIEW / 2.0).to_radians().tan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{VIEW_H, VIEW_W};

    #[test]
    fn test_center_point_projects_to_screen_center() {
        let mut p = WorldPoint::new(0.0, 1000.0);
        p.project(0.0, 0.0, 0.0, camera_depth(), VIEW_W, VIEW_H, 1600.0);
        assert_eq!(p.screen.x, VIEW_W / 2.0);
        assert_eq!(p.screen.y, VIEW_H / 2.0);
        assert!(p.screen.scale > 0.0);
    }

    #[test]
    fn test_scale_shrinks_with_distance() {
        let depth = camera_depth();
        let mut near = WorldPoint::new(0.0, 500.0);
        let mut far = WorldPoint::new(0.0, 5000.0);
        near.project(0.0, 800.0, 0.0, depth, VIEW_W, VIEW_H, 1600.0);
        far.project(0.0, 800.0, 0.0, depth, VIEW_W, VIEW_H, 1600.0);
        assert!(near.screen.scale > far.screen.scale);
        assert!(near.screen.w > far.screen.w);
    }

    #[test]
    fn test_near_plane_division_is_guarded() {
        let depth = camera_depth();
        // Point exactly at the camera and one behind it
        for z in [0.0, -250.0] {
            let mut p = WorldPoint::new(0.0, z);
            p.project(0.0, 800.0, z, depth, VIEW_W, VIEW_H, 1600.0);
            assert!(p.screen.scale.is_finite());
            assert!(p.screen.scale <= depth);
        }
    }

    #[test]
    fn test_elevation_raises_screen_y() {
        let depth = camera_depth();
        let mut level = WorldPoint::new(0.0, 2000.0);
        let mut raised = WorldPoint::new(600.0, 2000.0);
        level.project(0.0, 800.0, 0.0, depth, VIEW_W, VIEW_H, 1600.0);
        raised.project(0.0, 800.0, 0.0, depth, VIEW_W, VIEW_H, 1600.0);
        // Screen y grows downward
        assert!(raised.screen.y < level.screen.y);
    }
}
