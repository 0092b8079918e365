//! Capabilities the gauntlet consumes from the physics engine.
//!
//! The gauntlet never steps the simulation itself. It issues queries, reads
//! and writes rigid body properties of the object it holds, and asks for the
//! player to be moved. `PhysicsWorld` implements this over rapier3d; unit
//! tests use the scripted `mock::MockPhysics`.

use nalgebra::{Point3, UnitQuaternion, Vector3};

use super::layers::{Layer, LayerMask};

/// Stable identifier of a body known to the physics backend.
pub type ObjectId = u64;

/// Result of a successful raycast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub distance: f32,
    /// Body owning the hit collider, `None` for anonymous geometry
    pub object: Option<ObjectId>,
    pub layer: Layer,
}

pub trait PhysicsBackend {
    /// First solid hit along `direction` whose layer is in `mask`.
    /// The player capsule never blocks queries.
    fn raycast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;

    /// Sweeps a sphere and reports whether anything in `mask` is touched,
    /// including geometry already overlapping the start position.
    fn sphere_cast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        radius: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> bool;

    /// Whether the body still exists.
    fn contains(&self, id: ObjectId) -> bool;

    fn layer(&self, id: ObjectId) -> Option<Layer>;
    fn set_layer(&mut self, id: ObjectId, layer: Layer);

    fn gravity_scale(&self, id: ObjectId) -> Option<f32>;
    fn set_gravity_scale(&mut self, id: ObjectId, scale: f32);

    fn linear_damping(&self, id: ObjectId) -> Option<f32>;
    fn set_linear_damping(&mut self, id: ObjectId, damping: f32);

    fn position(&self, id: ObjectId) -> Option<Point3<f32>>;
    fn set_position(&mut self, id: ObjectId, position: Point3<f32>);

    fn rotation(&self, id: ObjectId) -> Option<UnitQuaternion<f32>>;
    fn set_rotation(&mut self, id: ObjectId, rotation: UnitQuaternion<f32>);

    fn set_linear_velocity(&mut self, id: ObjectId, velocity: Vector3<f32>);
    fn set_angular_velocity(&mut self, id: ObjectId, velocity: Vector3<f32>);

    /// Instant change of momentum, like a one-step force in impulse mode.
    fn apply_impulse(&mut self, id: ObjectId, impulse: Vector3<f32>);

    /// Moves the player so that its feet rest at `feet`.
    fn teleport_player(&mut self, feet: Point3<f32>);
}
