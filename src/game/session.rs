//! Composition root for one play session.
//!
//! Owns the physics world, the pickable registry, the dispatcher, the first
//! person aim and the respawn areas, and drives them in a fixed order: every
//! frame tick runs before the physics step that follows it.

use nalgebra::{Point3, Vector3};
use tracing::debug;

use super::actions::{ActionContext, ActionId};
use super::aim::{AimPose, AimSource, FirstPersonAim};
use super::backend::ObjectId;
use super::effects::EffectSink;
use super::layers::Layer;
use super::manager::{GauntletManager, Mode};
use super::physics::PhysicsWorld;
use super::pickable::PickableRegistry;
use super::respawn::RespawnArea;
use crate::config::GauntletConfig;

pub struct GauntletSession<S: EffectSink> {
    config: GauntletConfig,
    pub physics: PhysicsWorld,
    pub pickables: PickableRegistry,
    manager: GauntletManager,
    aim: FirstPersonAim,
    respawn_areas: Vec<RespawnArea>,
    sink: S,
}

impl<S: EffectSink> GauntletSession<S> {
    pub fn new(config: GauntletConfig, sink: S) -> Self {
        let manager = GauntletManager::new(&config);
        let pickables = PickableRegistry::new(
            config.pickable.marker_ray_distance,
            config.pickable.marker_ignore_layers,
        );
        Self {
            aim: FirstPersonAim::new(config.player.eye_height),
            config,
            physics: PhysicsWorld::new(),
            pickables,
            manager,
            respawn_areas: Vec::new(),
            sink,
        }
    }

    pub fn config(&self) -> &GauntletConfig {
        &self.config
    }

    pub fn manager(&self) -> &GauntletManager {
        &self.manager
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn aim(&self) -> &FirstPersonAim {
        &self.aim
    }

    pub fn spawn_player(&mut self, id: ObjectId, feet: Point3<f32>) {
        let player = self.config.player;
        self.physics.add_player(id, feet, player.radius, player.height);
    }

    /// Adds a dynamic box and registers it as pickable.
    pub fn add_pickable(
        &mut self,
        id: ObjectId,
        position: Point3<f32>,
        half_extents: Vector3<f32>,
        layer: Layer,
    ) {
        self.physics.add_pickable_box(id, position, half_extents, layer);
        self.pickables.register(id);
    }

    pub fn add_respawn_area(
        &mut self,
        area: RespawnArea,
        position: Point3<f32>,
        half_extents: Vector3<f32>,
    ) {
        self.physics.add_sensor_box(area.sensor, position, half_extents);
        self.respawn_areas.push(area);
    }

    /// Destroys an object. A held object becomes an implicit release on the
    /// next tick.
    pub fn remove_object(&mut self, id: ObjectId) -> bool {
        self.pickables.remove(id);
        self.physics.remove_body(id)
    }

    pub fn look(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.aim.look(delta_yaw, delta_pitch);
    }

    fn split(&mut self) -> (&mut GauntletManager, ActionContext<'_>) {
        let aim = self.aim_pose();
        (
            &mut self.manager,
            ActionContext {
                physics: &mut self.physics,
                pickables: &mut self.pickables,
                effects: &mut self.sink,
                aim,
            },
        )
    }

    pub fn perform(&mut self, id: ActionId, value: f32) -> bool {
        let (manager, mut ctx) = self.split();
        manager.perform_action(id, value, &mut ctx)
    }

    #[must_use]
    pub fn switch_mode(&mut self, mode: Mode) -> bool {
        self.manager.switch_mode(mode, &mut self.sink)
    }

    #[must_use]
    pub fn toggle_mode(&mut self) -> bool {
        self.manager.toggle_mode(&mut self.sink)
    }

    pub fn force_release(&mut self) -> bool {
        let (manager, mut ctx) = self.split();
        manager.force_release(&mut ctx)
    }

    pub fn suspend(&mut self) {
        self.manager.suspend();
    }

    pub fn resume(&mut self) {
        self.manager.resume();
    }

    /// Variable-rate tick: pickable signals, grab tick and crosshair, then
    /// ground markers.
    pub fn frame(&mut self, dt: f32) {
        let (manager, mut ctx) = self.split();
        manager.process_pickable_signals(&mut ctx);
        manager.update(dt, &mut ctx);
        self.pickables.update_markers(&self.physics);
    }

    /// Fixed-rate tick: forces on the held object, the simulation step,
    /// contact notifications and trigger volumes.
    pub fn fixed_step(&mut self, dt: f32) {
        {
            let (manager, mut ctx) = self.split();
            manager.fixed_update(dt, &mut ctx);
        }
        self.physics.step(dt);

        if let Some(held) = self.manager.grab().held_object() {
            if self.physics.in_contact(held) {
                self.pickables.notify_collision_stay(held);
            }
        }

        let player = self.physics.player.map(|p| p.id);
        let aim = self.aim_pose();
        for area in self.respawn_areas.iter_mut() {
            let overlaps = self.physics.sensor_overlaps(area.sensor);
            let mut ctx = ActionContext {
                physics: &mut self.physics,
                pickables: &mut self.pickables,
                effects: &mut self.sink,
                aim,
            };
            area.update(overlaps, player, &mut self.manager, &mut ctx);
        }
    }

    /// One frame followed by one physics step.
    pub fn advance(&mut self, dt: f32) {
        self.frame(dt);
        self.fixed_step(dt);
    }

    pub fn run_for(&mut self, frames: usize, dt: f32) {
        debug!(frames, dt, "advancing session");
        for _ in 0..frames {
            self.advance(dt);
        }
    }
}

impl<S: EffectSink> AimSource for GauntletSession<S> {
    /// Aim from the player's eyes. No player means no camera.
    fn aim_pose(&self) -> Option<AimPose> {
        let feet = self.physics.player_position()?;
        self.aim.pose_from(feet)
    }
}
