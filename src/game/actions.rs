//! Gauntlet actions and the table the dispatcher looks them up in.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::aim::AimPose;
use super::backend::PhysicsBackend;
use super::effects::{EffectSink, GauntletEffect};
use super::grab::GrabController;
use super::manager::Mode;
use super::pickable::PickableRegistry;
use super::teleport::Teleport;
use crate::config::GauntletConfig;

/// Stable action identity. The discriminant is the table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    PickUpRelease = 0,
    MoveObject = 1,
    ThrowObject = 2,
    Teleport = 3,
}

impl ActionId {
    pub const ALL: [ActionId; 4] = [
        ActionId::PickUpRelease,
        ActionId::MoveObject,
        ActionId::ThrowObject,
        ActionId::Teleport,
    ];

    /// Actions that only make sense with an object held.
    pub fn requires_grab(self) -> bool {
        matches!(self, ActionId::MoveObject | ActionId::ThrowObject)
    }

    /// Mode in which the action can be dispatched.
    pub fn mode(self) -> Mode {
        match self {
            ActionId::Teleport => Mode::Teleport,
            _ => Mode::Grab,
        }
    }
}

/// Collaborators an action acts through for the duration of one call.
pub struct ActionContext<'a> {
    pub physics: &'a mut dyn PhysicsBackend,
    pub pickables: &'a mut PickableRegistry,
    pub effects: &'a mut dyn EffectSink,
    /// `None` when no camera is available
    pub aim: Option<AimPose>,
}

/// Adjusts the held distance from a signed scroll input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveObject {
    pub delta_distance_modifier: f32,
}

impl MoveObject {
    pub fn perform(&self, grab: &mut GrabController, value: f32) {
        if let Some(distance) = grab.adjust_distance(value * self.delta_distance_modifier) {
            debug!(distance, "held distance adjusted");
        }
    }
}

/// Pushes the held object along the aim, then lets go of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrowObject {
    pub throwing_force: f32,
}

impl ThrowObject {
    pub fn perform(&self, grab: &mut GrabController, ctx: &mut ActionContext<'_>) {
        let Some(object) = grab.held_object() else {
            return;
        };
        // Impulse first: release clears the held reference.
        if let Some(aim) = ctx.aim.filter(|_| ctx.physics.contains(object)) {
            let impulse = aim.forward.into_inner() * self.throwing_force;
            ctx.physics.apply_impulse(object, impulse);
            ctx.effects.emit(GauntletEffect::ObjectThrown {
                object,
                impulse: impulse.into(),
            });
        }
        grab.release(ctx);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GauntletAction {
    PickUpRelease,
    MoveObject(MoveObject),
    ThrowObject(ThrowObject),
    Teleport(Teleport),
}

impl GauntletAction {
    pub fn id(&self) -> ActionId {
        match self {
            GauntletAction::PickUpRelease => ActionId::PickUpRelease,
            GauntletAction::MoveObject(_) => ActionId::MoveObject,
            GauntletAction::ThrowObject(_) => ActionId::ThrowObject,
            GauntletAction::Teleport(_) => ActionId::Teleport,
        }
    }

    /// Runs the action. `grab` is the dependant controller; `value` is the
    /// scalar input (scroll delta for Move, ignored otherwise).
    pub fn perform(&self, grab: &mut GrabController, value: f32, ctx: &mut ActionContext<'_>) {
        match self {
            GauntletAction::PickUpRelease => {
                if ctx.aim.is_none() {
                    return;
                }
                grab.request_grab(ctx);
            }
            GauntletAction::MoveObject(action) => action.perform(grab, value),
            GauntletAction::ThrowObject(action) => action.perform(grab, ctx),
            GauntletAction::Teleport(action) => {
                action.perform(ctx);
            }
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ActionTableError {
    #[error("action {0:?} is registered more than once")]
    Duplicate(ActionId),
    #[error("action {0:?} is missing from the table")]
    Missing(ActionId),
}

/// One action per id, indexed by the id's discriminant.
#[derive(Debug, Clone)]
pub struct ActionTable {
    actions: Vec<GauntletAction>,
}

impl ActionTable {
    pub fn new(mut actions: Vec<GauntletAction>) -> Result<Self, ActionTableError> {
        actions.sort_by_key(|a| a.id());
        for pair in actions.windows(2) {
            if pair[0].id() == pair[1].id() {
                return Err(ActionTableError::Duplicate(pair[0].id()));
            }
        }
        for id in ActionId::ALL {
            if actions.get(id as usize).map(|a| a.id()) != Some(id) {
                return Err(ActionTableError::Missing(id));
            }
        }
        Ok(Self { actions })
    }

    pub fn from_config(config: &GauntletConfig) -> Self {
        Self {
            actions: vec![
                GauntletAction::PickUpRelease,
                GauntletAction::MoveObject(MoveObject {
                    delta_distance_modifier: config.move_object.delta_distance_modifier,
                }),
                GauntletAction::ThrowObject(ThrowObject {
                    throwing_force: config.throw_object.throwing_force,
                }),
                GauntletAction::Teleport(Teleport::from_config(&config.teleport, &config.player)),
            ],
        }
    }

    pub fn get(&self, id: ActionId) -> &GauntletAction {
        &self.actions[id as usize]
    }
}
