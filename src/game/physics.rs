use nalgebra::{Point3, UnitQuaternion, Vector3};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::parry::shape::Ball;
use rapier3d::prelude::*;
use std::collections::{HashMap, HashSet};

use super::backend::{ObjectId, PhysicsBackend, RayHit};
use super::constants::physics as consts;
use super::layers::{Layer, LayerMask};

fn group(mask: LayerMask) -> Group {
    Group::from_bits_truncate(mask.0)
}

/// Collision groups for a layer. Membership is the layer bit; a held object
/// and the player never collide with each other.
fn layer_groups(layer: Layer) -> InteractionGroups {
    let filter = match layer {
        Layer::GRABBED_OBJECT => LayerMask::ALL.without(Layer::PLAYER),
        Layer::PLAYER => LayerMask::ALL.without(Layer::GRABBED_OBJECT),
        _ => LayerMask::ALL,
    };
    InteractionGroups::new(group(LayerMask::from_layers(&[layer])), group(filter))
}

fn collider_layer(collider: &Collider) -> Layer {
    Layer(collider.collision_groups().memberships.bits().trailing_zeros() as u8)
}

/// Player capsule, a kinematic body whose translation is the capsule center.
#[derive(Debug, Clone, Copy)]
pub struct PlayerBody {
    pub id: ObjectId,
    pub body_handle: RigidBodyHandle,
    pub half_height: f32,
}

/// Wrapper around Rapier3D physics world for the gauntlet sandbox.
/// Bodies are addressed by caller-chosen object ids.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Maps object id to Rapier rigid body handle
    pub object_to_body: HashMap<ObjectId, RigidBodyHandle>,
    /// Maps Rapier collider handle to object id (for queries and overlaps)
    pub collider_to_object: HashMap<ColliderHandle, ObjectId>,
    pub player: Option<PlayerBody>,
}

impl PhysicsWorld {
    /// Creates a new physics world with default gravity
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, -consts::DEFAULT_GRAVITY, 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            object_to_body: HashMap::new(),
            collider_to_object: HashMap::new(),
            player: None,
        }
    }

    /// Steps the physics simulation forward by dt seconds.
    /// Queries see bodies added or moved since the last step only after it.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Adds level geometry that never moves
    pub fn add_static_box(
        &mut self,
        position: Point3<f32>,
        half_extents: Vector3<f32>,
        layer: Layer,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed().translation(position.coords).build();
        let handle = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(layer_groups(layer))
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        handle
    }

    /// Adds a dynamic box the gauntlet can pick up
    pub fn add_pickable_box(
        &mut self,
        id: ObjectId,
        position: Point3<f32>,
        half_extents: Vector3<f32>,
        layer: Layer,
    ) -> RigidBodyHandle {
        // Held and thrown boxes move fast enough to tunnel through thin walls.
        let body = RigidBodyBuilder::dynamic()
            .translation(position.coords)
            .ccd_enabled(true)
            .build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .mass(consts::PICKABLE_MASS)
            .collision_groups(layer_groups(layer));
        self.insert_object(id, body, collider.build())
    }

    /// Adds a trigger volume. Sensors never block queries or bodies.
    pub fn add_sensor_box(
        &mut self,
        id: ObjectId,
        position: Point3<f32>,
        half_extents: Vector3<f32>,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed().translation(position.coords).build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .sensor(true)
            .collision_groups(layer_groups(Layer::TRIGGER))
            .build();
        self.insert_object(id, body, collider)
    }

    /// Adds the player capsule with its feet at `feet`
    pub fn add_player(
        &mut self,
        id: ObjectId,
        feet: Point3<f32>,
        radius: f32,
        height: f32,
    ) -> RigidBodyHandle {
        let half_height = height / 2.0;
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(feet.coords + Vector3::y() * half_height)
            .build();
        // Capsule half-height is the cylinder part, total height = 2*half_height + 2*radius
        let collider = ColliderBuilder::capsule_y((height - 2.0 * radius).max(0.0) / 2.0, radius)
            .collision_groups(layer_groups(Layer::PLAYER))
            .build();
        let body_handle = self.insert_object(id, body, collider);
        self.player = Some(PlayerBody {
            id,
            body_handle,
            half_height,
        });
        body_handle
    }

    fn insert_object(&mut self, id: ObjectId, body: RigidBody, collider: Collider) -> RigidBodyHandle {
        if self.object_to_body.contains_key(&id) {
            self.remove_body(id);
        }
        let handle = self.rigid_body_set.insert(body);
        let collider_handle = self
            .collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.object_to_body.insert(id, handle);
        self.collider_to_object.insert(collider_handle, id);
        handle
    }

    /// Removes a body and its colliders
    pub fn remove_body(&mut self, id: ObjectId) -> bool {
        let Some(handle) = self.object_to_body.remove(&id) else {
            return false;
        };
        // Remove collider->object mappings before destroying the body
        if let Some(body) = self.rigid_body_set.get(handle) {
            for ch in body.colliders() {
                self.collider_to_object.remove(ch);
            }
        }
        if self.player.is_some_and(|p| p.id == id) {
            self.player = None;
        }
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    pub fn get_handle(&self, id: ObjectId) -> Option<RigidBodyHandle> {
        self.object_to_body.get(&id).copied()
    }

    fn body(&self, id: ObjectId) -> Option<&RigidBody> {
        self.rigid_body_set.get(self.get_handle(id)?)
    }

    fn body_mut(&mut self, id: ObjectId) -> Option<&mut RigidBody> {
        let handle = self.get_handle(id)?;
        self.rigid_body_set.get_mut(handle)
    }

    /// Feet position of the player
    pub fn player_position(&self) -> Option<Point3<f32>> {
        let player = self.player?;
        let body = self.rigid_body_set.get(player.body_handle)?;
        Some(Point3::from(*body.translation() - Vector3::y() * player.half_height))
    }

    pub fn linear_velocity(&self, id: ObjectId) -> Option<Vector3<f32>> {
        self.body(id).map(|b| *b.linvel())
    }

    /// Whether any collider of the body is touching another solid collider
    pub fn in_contact(&self, id: ObjectId) -> bool {
        let Some(body) = self.body(id) else {
            return false;
        };
        body.colliders().iter().any(|&ch| {
            self.narrow_phase
                .contact_pairs_with(ch)
                .any(|pair| pair.has_any_active_contact)
        })
    }

    /// Objects currently overlapping the sensor `id`.
    /// Uses `intersections_with_shape` which works for all body type
    /// combinations (including kinematic+fixed which narrow_phase misses).
    pub fn sensor_overlaps(&self, id: ObjectId) -> HashSet<ObjectId> {
        let mut overlaps = HashSet::new();
        let Some(handle) = self.get_handle(id) else {
            return overlaps;
        };
        let Some(body) = self.rigid_body_set.get(handle) else {
            return overlaps;
        };
        let filter = QueryFilter::default()
            .exclude_rigid_body(handle)
            .exclude_sensors();

        for ch in body.colliders() {
            let Some(collider) = self.collider_set.get(*ch) else {
                continue;
            };
            self.query_pipeline.intersections_with_shape(
                &self.rigid_body_set,
                &self.collider_set,
                collider.position(),
                collider.shape(),
                filter,
                |other| {
                    if let Some(&other_id) = self.collider_to_object.get(&other) {
                        overlaps.insert(other_id);
                    }
                    true // continue searching
                },
            );
        }
        overlaps
    }

    /// Solid, non-player colliders whose layer is in `mask`
    fn query_filter(&self, mask: LayerMask) -> QueryFilter<'_> {
        let filter = QueryFilter::default()
            .exclude_sensors()
            .groups(InteractionGroups::new(Group::ALL, group(mask)));
        match self.player {
            Some(player) => filter.exclude_rigid_body(player.body_handle),
            None => filter,
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsBackend for PhysicsWorld {
    fn raycast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize(consts::EPSILON)?;
        let ray = Ray::new(*origin, direction);
        let (collider_handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true, // solid
            self.query_filter(mask),
        )?;
        let collider = self.collider_set.get(collider_handle)?;
        Some(RayHit {
            point: ray.point_at(hit.time_of_impact),
            normal: hit.normal,
            distance: hit.time_of_impact,
            object: self.collider_to_object.get(&collider_handle).copied(),
            layer: collider_layer(collider),
        })
    }

    fn sphere_cast(
        &self,
        origin: &Point3<f32>,
        direction: &Vector3<f32>,
        radius: f32,
        max_distance: f32,
        mask: LayerMask,
    ) -> bool {
        let velocity = direction
            .try_normalize(consts::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        let shape_pos = Isometry::translation(origin.x, origin.y, origin.z);
        self.query_pipeline
            .cast_shape(
                &self.rigid_body_set,
                &self.collider_set,
                &shape_pos,
                &velocity,
                &Ball::new(radius),
                ShapeCastOptions::with_max_time_of_impact(max_distance),
                self.query_filter(mask),
            )
            .is_some()
    }

    fn contains(&self, id: ObjectId) -> bool {
        self.body(id).is_some()
    }

    fn layer(&self, id: ObjectId) -> Option<Layer> {
        let body = self.body(id)?;
        let collider = self.collider_set.get(*body.colliders().first()?)?;
        Some(collider_layer(collider))
    }

    fn set_layer(&mut self, id: ObjectId, layer: Layer) {
        let Some(body) = self.body(id) else {
            return;
        };
        let colliders: Vec<_> = body.colliders().to_vec();
        for ch in colliders {
            if let Some(collider) = self.collider_set.get_mut(ch) {
                collider.set_collision_groups(layer_groups(layer));
            }
        }
    }

    fn gravity_scale(&self, id: ObjectId) -> Option<f32> {
        self.body(id).map(|b| b.gravity_scale())
    }

    fn set_gravity_scale(&mut self, id: ObjectId, scale: f32) {
        if let Some(body) = self.body_mut(id) {
            body.set_gravity_scale(scale, true);
        }
    }

    fn linear_damping(&self, id: ObjectId) -> Option<f32> {
        self.body(id).map(|b| b.linear_damping())
    }

    fn set_linear_damping(&mut self, id: ObjectId, damping: f32) {
        if let Some(body) = self.body_mut(id) {
            body.set_linear_damping(damping);
        }
    }

    fn position(&self, id: ObjectId) -> Option<Point3<f32>> {
        self.body(id).map(|b| Point3::from(*b.translation()))
    }

    fn set_position(&mut self, id: ObjectId, position: Point3<f32>) {
        if let Some(body) = self.body_mut(id) {
            body.set_translation(position.coords, true);
        }
    }

    fn rotation(&self, id: ObjectId) -> Option<UnitQuaternion<f32>> {
        self.body(id).map(|b| *b.rotation())
    }

    fn set_rotation(&mut self, id: ObjectId, rotation: UnitQuaternion<f32>) {
        if let Some(body) = self.body_mut(id) {
            body.set_rotation(rotation, true);
        }
    }

    fn set_linear_velocity(&mut self, id: ObjectId, velocity: Vector3<f32>) {
        if let Some(body) = self.body_mut(id) {
            if body.is_dynamic() {
                body.set_linvel(velocity, true);
            }
        }
    }

    fn set_angular_velocity(&mut self, id: ObjectId, velocity: Vector3<f32>) {
        if let Some(body) = self.body_mut(id) {
            if body.is_dynamic() {
                body.set_angvel(velocity, true);
            }
        }
    }

    fn apply_impulse(&mut self, id: ObjectId, impulse: Vector3<f32>) {
        if let Some(body) = self.body_mut(id) {
            body.apply_impulse(impulse, true);
        }
    }

    fn teleport_player(&mut self, feet: Point3<f32>) {
        let Some(player) = self.player else {
            return;
        };
        if let Some(body) = self.rigid_body_set.get_mut(player.body_handle) {
            body.set_translation(feet.coords + Vector3::y() * player.half_height, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: ObjectId = 1;
    const PLAYER: ObjectId = 100;
    const SENSOR: ObjectId = 200;

    fn world_with_floor() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.add_static_box(
            Point3::new(0.0, -0.5, 0.0),
            Vector3::new(20.0, 0.5, 20.0),
            Layer::TELEPORT_SURFACE,
        );
        world
    }

    fn settle(world: &mut PhysicsWorld, steps: usize) {
        for _ in 0..steps {
            world.step(consts::TIMESTEP);
        }
    }

    #[test]
    fn test_physics_world_creation() {
        let world = PhysicsWorld::new();
        assert_eq!(world.gravity.y, -consts::DEFAULT_GRAVITY);
        assert!(world.player_position().is_none());
    }

    #[test]
    fn test_pickable_box_falls_and_rests_on_floor() {
        let mut world = world_with_floor();
        world.add_pickable_box(CUBE, Point3::new(0.0, 3.0, 0.0), Vector3::repeat(0.25), Layer::PICKABLE);

        settle(&mut world, 120);

        let pos = world.position(CUBE).unwrap();
        assert!(pos.y < 3.0);
        assert!((pos.y - 0.25).abs() < 0.05, "cube rests at {}", pos.y);
        assert!(world.in_contact(CUBE));
    }

    #[test]
    fn test_zero_gravity_scale_keeps_body_floating() {
        let mut world = world_with_floor();
        world.add_pickable_box(CUBE, Point3::new(0.0, 3.0, 0.0), Vector3::repeat(0.25), Layer::PICKABLE);
        world.set_gravity_scale(CUBE, 0.0);

        settle(&mut world, 30);

        assert!((world.position(CUBE).unwrap().y - 3.0).abs() < 1.0e-3);
        assert!(!world.in_contact(CUBE));
    }

    #[test]
    fn test_raycast_reports_object_layer_and_normal() {
        let mut world = world_with_floor();
        world.add_pickable_box(CUBE, Point3::new(0.0, 1.0, 3.0), Vector3::repeat(0.25), Layer::PICKABLE);
        world.set_gravity_scale(CUBE, 0.0);
        settle(&mut world, 1);

        let hit = world
            .raycast(&Point3::new(0.0, 1.0, 0.0), &Vector3::z(), 10.0, LayerMask::ALL)
            .unwrap();
        assert_eq!(hit.object, Some(CUBE));
        assert_eq!(hit.layer, Layer::PICKABLE);
        assert!((hit.distance - 2.75).abs() < 1.0e-3);
        assert!((hit.normal - (-Vector3::z())).norm() < 1.0e-3);

        let floor = world
            .raycast(&Point3::new(0.0, 1.0, 0.0), &-Vector3::y(), 10.0, LayerMask::ALL)
            .unwrap();
        assert_eq!(floor.object, None);
        assert_eq!(floor.layer, Layer::TELEPORT_SURFACE);
    }

    #[test]
    fn test_raycast_mask_skips_layers() {
        let mut world = world_with_floor();
        world.add_pickable_box(CUBE, Point3::new(0.0, 1.0, 3.0), Vector3::repeat(0.25), Layer::PICKABLE);
        world.add_static_box(Point3::new(0.0, 1.0, 6.0), Vector3::new(2.0, 2.0, 0.1), Layer::DEFAULT);
        settle(&mut world, 1);

        let mask = LayerMask::ALL.without(Layer::PICKABLE);
        let hit = world
            .raycast(&Point3::new(0.0, 1.0, 0.0), &Vector3::z(), 10.0, mask)
            .unwrap();
        assert_eq!(hit.layer, Layer::DEFAULT);
        assert!(world
            .raycast(&Point3::new(0.0, 1.0, 0.0), &Vector3::z(), 2.0, mask)
            .is_none());
    }

    #[test]
    fn test_player_never_blocks_queries() {
        let mut world = world_with_floor();
        world.add_player(PLAYER, Point3::origin(), 0.5, 2.0);
        settle(&mut world, 1);

        let hit = world
            .raycast(&Point3::new(0.0, 1.6, 0.0), &-Vector3::y(), 5.0, LayerMask::ALL)
            .unwrap();
        assert_eq!(hit.layer, Layer::TELEPORT_SURFACE);
        assert!(!world.sphere_cast(
            &Point3::new(0.0, 1.0, 0.0),
            &Vector3::y(),
            0.4,
            0.5,
            LayerMask::ALL
        ));
    }

    #[test]
    fn test_sphere_cast_detects_overlap_and_sweep() {
        let mut world = world_with_floor();
        settle(&mut world, 1);

        // Overlapping the floor at the start.
        assert!(world.sphere_cast(&Point3::new(0.0, 0.2, 0.0), &Vector3::y(), 0.5, 1.0, LayerMask::ALL));
        // Sweeping down into it.
        assert!(world.sphere_cast(&Point3::new(0.0, 2.0, 0.0), &-Vector3::y(), 0.5, 2.0, LayerMask::ALL));
        // Clear above.
        assert!(!world.sphere_cast(&Point3::new(0.0, 0.6, 0.0), &Vector3::y(), 0.5, 1.0, LayerMask::ALL));
        // Ignored layers do not count.
        let mask = LayerMask::ALL.without(Layer::TELEPORT_SURFACE);
        assert!(!world.sphere_cast(&Point3::new(0.0, 0.2, 0.0), &Vector3::y(), 0.5, 1.0, mask));
    }

    #[test]
    fn test_set_layer_updates_every_collider() {
        let mut world = world_with_floor();
        world.add_pickable_box(CUBE, Point3::new(0.0, 1.0, 0.0), Vector3::repeat(0.25), Layer::PICKABLE);
        world.set_layer(CUBE, Layer::GRABBED_OBJECT);
        assert_eq!(world.layer(CUBE), Some(Layer::GRABBED_OBJECT));
        world.set_layer(CUBE, Layer::PICKABLE);
        assert_eq!(world.layer(CUBE), Some(Layer::PICKABLE));
    }

    #[test]
    fn test_grabbed_layer_ignores_player() {
        let grabbed = layer_groups(Layer::GRABBED_OBJECT);
        let player = layer_groups(Layer::PLAYER);
        let pickable = layer_groups(Layer::PICKABLE);
        assert!(!grabbed.test(player));
        assert!(pickable.test(player));
        assert!(grabbed.test(layer_groups(Layer::DEFAULT)));
    }

    #[test]
    fn test_teleport_player_places_feet() {
        let mut world = world_with_floor();
        world.add_player(PLAYER, Point3::origin(), 0.5, 2.0);
        world.teleport_player(Point3::new(3.0, 0.08, -2.0));
        let feet = world.player_position().unwrap();
        assert!((feet - Point3::new(3.0, 0.08, -2.0)).norm() < 1.0e-5);
    }

    #[test]
    fn test_sensor_reports_overlapping_objects() {
        let mut world = world_with_floor();
        world.add_sensor_box(SENSOR, Point3::new(0.0, 1.0, 0.0), Vector3::repeat(1.0));
        world.add_pickable_box(CUBE, Point3::new(0.0, 1.0, 0.0), Vector3::repeat(0.25), Layer::PICKABLE);
        world.add_player(PLAYER, Point3::new(10.0, 0.0, 0.0), 0.5, 2.0);
        world.set_gravity_scale(CUBE, 0.0);
        settle(&mut world, 1);

        assert_eq!(world.sensor_overlaps(SENSOR), HashSet::from([CUBE]));

        world.teleport_player(Point3::new(0.0, 0.0, 0.5));
        settle(&mut world, 1);
        assert_eq!(world.sensor_overlaps(SENSOR), HashSet::from([CUBE, PLAYER]));
    }

    #[test]
    fn test_remove_body() {
        let mut world = world_with_floor();
        world.add_pickable_box(CUBE, Point3::new(0.0, 1.0, 0.0), Vector3::repeat(0.25), Layer::PICKABLE);
        assert!(world.contains(CUBE));
        assert!(world.remove_body(CUBE));
        assert!(!world.contains(CUBE));
        assert!(!world.remove_body(CUBE));
        assert!(world.collider_to_object.is_empty());
        // Setters on a missing body are no-ops.
        world.set_gravity_scale(CUBE, 0.0);
        assert_eq!(world.gravity_scale(CUBE), None);
    }
}
