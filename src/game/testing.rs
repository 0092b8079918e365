//! Shared fixtures for unit tests.

use nalgebra::{Point3, Vector3};

use super::actions::ActionContext;
use super::aim::AimPose;
use super::backend::mock::{MockBody, MockPhysics};
use super::backend::ObjectId;
use super::effects::GauntletEffect;
use super::layers::Layer;
use super::pickable::PickableRegistry;

/// Everything an `ActionContext` borrows, owned in one place.
pub struct Rig {
    pub physics: MockPhysics,
    pub pickables: PickableRegistry,
    pub effects: Vec<GauntletEffect>,
    pub aim: Option<AimPose>,
}

impl Rig {
    /// Aim from the origin down +Z with nothing in front.
    pub fn empty() -> Self {
        Self {
            physics: MockPhysics::default(),
            pickables: PickableRegistry::default(),
            effects: Vec::new(),
            aim: AimPose::looking(Point3::origin(), Vector3::z()),
        }
    }

    /// A registered pickable cube `distance` units in front of the aim.
    pub fn with_cube(id: ObjectId, distance: f32) -> Self {
        let mut rig = Self::empty();
        rig.physics = MockPhysics::default()
            .with_body(id, MockBody::at(Point3::new(0.0, 0.0, distance), Layer::PICKABLE));
        rig.physics.aim_at(id, distance);
        rig.pickables.register(id);
        rig
    }

    pub fn ctx(&mut self) -> ActionContext<'_> {
        ActionContext {
            physics: &mut self.physics,
            pickables: &mut self.pickables,
            effects: &mut self.effects,
            aim: self.aim,
        }
    }
}
