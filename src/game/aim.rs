//! Aim sampling for gauntlet actions.

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

use super::constants::player as player_consts;

/// Camera-equivalent aim: where the player looks from and which way.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimPose {
    pub origin: Point3<f32>,
    pub forward: Unit<Vector3<f32>>,
    pub up: Unit<Vector3<f32>>,
}

impl AimPose {
    /// Builds a pose from a forward direction, deriving `up` from world up.
    /// Returns `None` for a zero-length forward.
    pub fn looking(origin: Point3<f32>, forward: Vector3<f32>) -> Option<Self> {
        let forward = Unit::try_new(forward, 1.0e-6)?;
        let right = forward.cross(&Vector3::y());
        // Looking straight up/down: keep a stable up along -Z/+Z.
        let up = match Unit::try_new(right, 1.0e-6) {
            Some(right) => Unit::new_normalize(right.cross(&forward.into_inner())),
            None => Unit::new_normalize(Vector3::new(0.0, 0.0, -forward.y.signum())),
        };
        Some(Self { origin, forward, up })
    }

    /// Point `distance` units along the aim ray.
    pub fn point_at(&self, distance: f32) -> Point3<f32> {
        self.origin + self.forward.into_inner() * distance
    }

    /// Rotation whose local +Z faces `forward` and whose +Y leans toward `up`.
    pub fn look_rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::face_towards(&self.forward.into_inner(), &self.up.into_inner())
    }
}

/// Anything that can provide the current aim. `None` means no camera is
/// available, and actions depending on aim are skipped.
pub trait AimSource {
    fn aim_pose(&self) -> Option<AimPose>;
}

impl AimSource for AimPose {
    fn aim_pose(&self) -> Option<AimPose> {
        Some(*self)
    }
}

impl AimSource for Option<AimPose> {
    fn aim_pose(&self) -> Option<AimPose> {
        *self
    }
}

/// Yaw/pitch first person view mounted at eye height above the player's feet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstPersonAim {
    /// Radians around +Y, zero looking down +Z
    pub yaw: f32,
    /// Radians, positive looks up
    pub pitch: f32,
    pub eye_height: f32,
}

impl FirstPersonAim {
    pub fn new(eye_height: f32) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            eye_height,
        }
    }

    pub fn look(&mut self, delta_yaw: f32, delta_pitch: f32) {
        let limit = player_consts::MAX_PITCH_DEGREES.to_radians();
        self.yaw = (self.yaw + delta_yaw).rem_euclid(std::f32::consts::TAU);
        self.pitch = (self.pitch + delta_pitch).clamp(-limit, limit);
    }

    pub fn forward(&self) -> Vector3<f32> {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vector3::new(cp * sy, sp, cp * cy)
    }

    /// Aim pose for a player standing at `feet`.
    pub fn pose_from(&self, feet: Point3<f32>) -> Option<AimPose> {
        AimPose::looking(feet + Vector3::y() * self.eye_height, self.forward())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_pose_has_world_up() {
        let pose = AimPose::looking(Point3::origin(), Vector3::z()).unwrap();
        assert!((pose.up.into_inner() - Vector3::y()).norm() < 1.0e-5);
        assert!((pose.point_at(3.0) - Point3::new(0.0, 0.0, 3.0)).norm() < 1.0e-5);
    }

    #[test]
    fn test_look_rotation_maps_z_to_forward() {
        let pose = AimPose::looking(Point3::origin(), Vector3::new(1.0, 0.0, 0.0)).unwrap();
        let rotated = pose.look_rotation() * Vector3::z();
        assert!((rotated - Vector3::x()).norm() < 1.0e-5);
    }

    #[test]
    fn test_vertical_aim_still_has_up() {
        let pose = AimPose::looking(Point3::origin(), Vector3::new(0.0, -1.0, 0.0)).unwrap();
        assert!(pose.up.dot(&pose.forward.into_inner()).abs() < 1.0e-5);
    }

    #[test]
    fn test_zero_forward_has_no_pose() {
        assert!(AimPose::looking(Point3::origin(), Vector3::zeros()).is_none());
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut aim = FirstPersonAim::new(1.6);
        aim.look(0.0, 10.0);
        assert!(aim.pitch <= player_consts::MAX_PITCH_DEGREES.to_radians() + 1.0e-6);
        let pose = aim.pose_from(Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert!((pose.origin.y - 1.6).abs() < 1.0e-6);
        assert!(pose.forward.y > 0.99);
    }
}
