//! Grab controller: owns the held object and drives it toward the aim.
//!
//! A grab opens a [`GrabSession`] that snapshots the body's gravity scale,
//! damping and layer, then overrides them while held. Every frame the target
//! point is recomputed from the aim and the held distance; every physics step
//! the body receives a clamped proportional impulse toward it and is rotated
//! toward the aim's look rotation. Releasing restores the snapshot exactly.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::actions::ActionContext;
use super::backend::{ObjectId, PhysicsBackend};
use super::deferred::DeferredTask;
use super::effects::GauntletEffect;
use super::layers::Layer;
use super::pickable::PickableSignal;
use crate::config::GrabConfig;

/// Reaction to the held object touching level geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    Ignore,
    ReleaseObject,
    ReduceDistance,
}

/// What `handle_collision` did, so the dispatcher can follow up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionReaction {
    Ignored,
    Released,
    /// The dispatcher should shorten the held distance
    ReduceDistance,
}

/// Body properties overridden while an object is held.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub layer: Layer,
    pub gravity_scale: f32,
    pub linear_damping: f32,
}

impl BodySnapshot {
    pub fn capture(physics: &dyn PhysicsBackend, id: ObjectId) -> Option<Self> {
        Some(Self {
            layer: physics.layer(id)?,
            gravity_scale: physics.gravity_scale(id)?,
            linear_damping: physics.linear_damping(id)?,
        })
    }

    pub fn restore(&self, physics: &mut dyn PhysicsBackend, id: ObjectId) {
        physics.set_layer(id, self.layer);
        physics.set_gravity_scale(id, self.gravity_scale);
        physics.set_linear_damping(id, self.linear_damping);
    }
}

/// State that exists only while an object is held.
#[derive(Debug, Clone)]
pub struct GrabSession {
    object: ObjectId,
    distance: f32,
    snapshot: BodySnapshot,
    target: Option<Point3<f32>>,
    displacement: Vector3<f32>,
    movement_pending: bool,
    arm_collision: DeferredTask,
    collision_armed: bool,
}

impl GrabSession {
    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn snapshot(&self) -> &BodySnapshot {
        &self.snapshot
    }

    /// Target point computed on the last frame tick
    pub fn target(&self) -> Option<Point3<f32>> {
        self.target
    }

    pub fn movement_pending(&self) -> bool {
        self.movement_pending
    }

    pub fn collision_armed(&self) -> bool {
        self.collision_armed
    }
}

/// Interpolation factor for one rotation step of `dt` seconds.
///
/// `speed` is the fraction of the remaining angle covered per `reference_step`;
/// at `dt == reference_step` the factor equals `speed`.
pub fn alignment_factor(speed: f32, dt: f32, reference_step: f32) -> f32 {
    if dt <= 0.0 || reference_step <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - speed.clamp(0.0, 1.0)).powf(dt / reference_step)
}

#[derive(Debug, Clone)]
pub struct GrabController {
    config: GrabConfig,
    session: Option<GrabSession>,
}

impl GrabController {
    pub fn new(config: GrabConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &GrabConfig {
        &self.config
    }

    pub fn is_grabbing(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&GrabSession> {
        self.session.as_ref()
    }

    pub fn held_object(&self) -> Option<ObjectId> {
        self.session.as_ref().map(|s| s.object)
    }

    pub fn current_distance(&self) -> Option<f32> {
        self.session.as_ref().map(|s| s.distance)
    }

    /// Grab the pickable under the aim, or release when already holding.
    /// Returns true when a new session was opened.
    pub fn request_grab(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        if self.session.is_some() {
            self.release(ctx);
            return false;
        }
        let Some(aim) = ctx.aim else {
            return false;
        };

        let Some(hit) = ctx.physics.raycast(
            &aim.origin,
            &aim.forward.into_inner(),
            self.config.pick_up_range,
            self.config.ignore_layers.inverted(),
        ) else {
            return false;
        };
        if !self.config.pickup_layers.contains(hit.layer) {
            return false;
        }
        let Some(object) = hit.object.filter(|id| ctx.pickables.is_pickable(*id)) else {
            return false;
        };
        // Snapshot before any override.
        let Some(snapshot) = BodySnapshot::capture(&*ctx.physics, object) else {
            return false;
        };

        ctx.physics.set_layer(object, self.config.grabbed_layer);
        ctx.physics.set_linear_velocity(object, Vector3::zeros());
        ctx.physics.set_gravity_scale(object, 0.0);
        ctx.physics.set_linear_damping(object, self.config.object_drag);

        self.session = Some(GrabSession {
            object,
            distance: self.clamp_distance(self.config.default_distance),
            snapshot,
            target: None,
            displacement: Vector3::zeros(),
            movement_pending: false,
            arm_collision: DeferredTask::new(self.config.collision_grace_secs),
            collision_armed: false,
        });

        info!(object, distance = hit.distance, "grab started");
        ctx.effects.emit(GauntletEffect::GrabStarted { object });
        true
    }

    /// Let go of the held object, restoring its snapshot. No-op when idle.
    pub fn release(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        session.arm_collision.cancel();

        let object = session.object;
        if ctx.physics.contains(object) {
            session.snapshot.restore(ctx.physics, object);
        }
        ctx.pickables.set_grabbed(object, false);

        info!(object, "grab ended");
        ctx.effects.emit(GauntletEffect::GrabEnded { object });
        true
    }

    /// Shift the held distance by `delta`, clamped to the configured range.
    /// Returns the new distance, or `None` when nothing is held.
    /// Non-finite deltas leave the distance unchanged.
    pub fn adjust_distance(&mut self, delta: f32) -> Option<f32> {
        let current = self.session.as_ref()?.distance;
        if !delta.is_finite() {
            return Some(current);
        }
        let distance = self.clamp_distance(current + delta);
        let session = self.session.as_mut()?;
        session.distance = distance;
        Some(distance)
    }

    /// Clamps to `[min_distance, max_distance]`, tolerating an inverted or
    /// NaN range from a config that skipped validation.
    fn clamp_distance(&self, distance: f32) -> f32 {
        let (min, max) = (self.config.min_distance, self.config.max_distance);
        let lo = if min.is_finite() { min } else { 0.0 };
        let hi = if max.is_finite() { max.max(lo) } else { lo };
        if distance.is_nan() {
            return lo;
        }
        distance.max(lo).min(hi)
    }

    /// Per-frame update: arms collision handling once the grace delay has
    /// elapsed and recomputes the target point from the aim.
    pub fn tick(&mut self, dt: f32, ctx: &mut ActionContext<'_>) {
        if !self.ensure_alive(ctx) {
            return;
        }
        let deadzone = self.config.deadzone;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let object = session.object;

        if session.arm_collision.advance(dt) {
            session.collision_armed = true;
            ctx.pickables.set_grabbed(object, true);
            debug!(object, "collision reaction armed");
            ctx.effects.emit(GauntletEffect::CollisionArmed { object });
        }

        let (Some(aim), Some(position)) = (ctx.aim, ctx.physics.position(object)) else {
            return;
        };
        let target = aim.point_at(session.distance);
        session.target = Some(target);
        session.displacement = target - position;
        if session.displacement.norm_squared() > deadzone {
            session.movement_pending = true;
        }
    }

    /// Per-physics-step update: rotates toward the aim and applies the
    /// pending corrective impulse.
    pub fn physics_step(&mut self, dt: f32, ctx: &mut ActionContext<'_>) {
        if !self.ensure_alive(ctx) {
            return;
        }
        let factor = alignment_factor(
            self.config.rotation_speed,
            dt,
            self.config.rotation_reference_step,
        );
        let force = self.config.movement_force;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let object = session.object;

        if let (Some(aim), Some(current)) = (ctx.aim, ctx.physics.rotation(object)) {
            let target = aim.look_rotation();
            let next = current.try_slerp(&target, factor, 1.0e-6).unwrap_or(target);
            ctx.physics.set_rotation(object, next);
        }

        if session.movement_pending {
            let impulse = (session.displacement * force).cap_magnitude(force);
            ctx.physics.apply_impulse(object, impulse);
            ctx.physics.set_angular_velocity(object, Vector3::zeros());
            session.movement_pending = false;
        }
    }

    /// Collision-stay notification for the held object. Ignored until the
    /// grace delay after the grab has elapsed.
    pub fn handle_collision(&mut self, ctx: &mut ActionContext<'_>) -> CollisionReaction {
        let Some(session) = self.session.as_ref() else {
            return CollisionReaction::Ignored;
        };
        if !session.collision_armed {
            return CollisionReaction::Ignored;
        }
        let object = session.object;
        let policy = self.config.collision_policy;

        match policy {
            CollisionPolicy::Ignore => CollisionReaction::Ignored,
            CollisionPolicy::ReleaseObject => {
                ctx.effects.emit(GauntletEffect::CollisionReaction { object, policy });
                self.release(ctx);
                CollisionReaction::Released
            }
            CollisionPolicy::ReduceDistance => {
                ctx.effects.emit(GauntletEffect::CollisionReaction { object, policy });
                CollisionReaction::ReduceDistance
            }
        }
    }

    /// Routes a signal raised by the held object.
    pub fn handle_signal(
        &mut self,
        signal: PickableSignal,
        ctx: &mut ActionContext<'_>,
    ) -> CollisionReaction {
        match signal {
            PickableSignal::InvokeRelease => {
                if self.release(ctx) {
                    CollisionReaction::Released
                } else {
                    CollisionReaction::Ignored
                }
            }
            PickableSignal::CollisionStay => self.handle_collision(ctx),
        }
    }

    /// Clears the session without touching the body when the held object no
    /// longer exists. Returns whether an object is still held.
    fn ensure_alive(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        let Some(object) = self.held_object() else {
            return false;
        };
        if ctx.physics.contains(object) {
            return true;
        }
        self.session = None;
        ctx.pickables.set_grabbed(object, false);
        warn!(object, "held object vanished, grab dropped");
        ctx.effects.emit(GauntletEffect::GrabEnded { object });
        false
    }
}
