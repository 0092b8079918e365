//! Gauntlet action dispatcher.
//!
//! Routes action requests to the action table, gating them on the current
//! mode and, for dependant actions, on an active grab. Owns the grab
//! controller and the Grab/Teleport mode, which cannot change while an object
//! is held.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::actions::{ActionContext, ActionId, ActionTable, ActionTableError, GauntletAction};
use super::effects::{EffectSink, GauntletEffect};
use super::grab::{CollisionReaction, GrabController};
use super::layers::LayerMask;
use crate::config::GauntletConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Grab,
    Teleport,
}

impl Mode {
    pub fn other(self) -> Self {
        match self {
            Mode::Grab => Mode::Teleport,
            Mode::Teleport => Mode::Grab,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GauntletManager {
    actions: ActionTable,
    grab: GrabController,
    mode: Mode,
    /// In-game UI open: requests are dropped until resumed
    suspended: bool,
    crosshair_in_range: bool,
    gauntlet_layers: LayerMask,
    collision_reduce_input: f32,
}

impl GauntletManager {
    pub fn new(config: &GauntletConfig) -> Self {
        Self::assemble(ActionTable::from_config(config), config)
    }

    /// Builds a manager around a custom action list, which must hold exactly
    /// one action per id in any order.
    pub fn with_actions(
        actions: Vec<GauntletAction>,
        config: &GauntletConfig,
    ) -> Result<Self, ActionTableError> {
        Ok(Self::assemble(ActionTable::new(actions)?, config))
    }

    fn assemble(actions: ActionTable, config: &GauntletConfig) -> Self {
        Self {
            actions,
            grab: GrabController::new(config.grab.clone()),
            mode: config.gauntlet.default_mode,
            suspended: false,
            crosshair_in_range: false,
            gauntlet_layers: config.gauntlet.gauntlet_layers,
            collision_reduce_input: config.gauntlet.collision_reduce_input,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn grab(&self) -> &GrabController {
        &self.grab
    }

    pub fn is_grabbing(&self) -> bool {
        self.grab.is_grabbing()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn crosshair_in_range(&self) -> bool {
        self.crosshair_in_range
    }

    /// Dispatches an action request. Requests that do not apply (suspended,
    /// wrong mode, nothing held for a dependant action) are dropped silently.
    /// Returns whether the request reached its action.
    pub fn perform_action(&mut self, id: ActionId, value: f32, ctx: &mut ActionContext<'_>) -> bool {
        if self.suspended {
            debug!(?id, "action dropped, gauntlet suspended");
            return false;
        }
        if id.mode() != self.mode {
            debug!(?id, mode = ?self.mode, "action dropped, inactive mode");
            return false;
        }
        if id.requires_grab() && !self.grab.is_grabbing() {
            debug!(?id, "action dropped, nothing held");
            return false;
        }
        self.actions.get(id).perform(&mut self.grab, value, ctx);
        true
    }

    /// Switches to `target`. Refused while an object is held or while
    /// suspended; the mode is then left unchanged.
    #[must_use]
    pub fn switch_mode(&mut self, target: Mode, effects: &mut dyn EffectSink) -> bool {
        if self.suspended {
            return false;
        }
        if self.grab.is_grabbing() {
            info!(?target, "mode switch refused while grabbing");
            return false;
        }
        self.mode = target;
        info!(mode = ?target, "mode switched");
        effects.emit(GauntletEffect::ModeSwitched { mode: target });
        true
    }

    #[must_use]
    pub fn toggle_mode(&mut self, effects: &mut dyn EffectSink) -> bool {
        self.switch_mode(self.mode.other(), effects)
    }

    /// Releases the held object regardless of mode or suspension.
    pub fn force_release(&mut self, ctx: &mut ActionContext<'_>) -> bool {
        self.grab.release(ctx)
    }

    pub fn suspend(&mut self) {
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Routes signals queued by the held object to the grab controller.
    /// Signals from any other object have no listener and are discarded.
    pub fn process_pickable_signals(&mut self, ctx: &mut ActionContext<'_>) {
        let Some(held) = self.grab.held_object() else {
            ctx.pickables.clear_signals();
            return;
        };
        let signals = ctx.pickables.take_signals(held);
        ctx.pickables.clear_signals();

        for signal in signals {
            match self.grab.handle_signal(signal, ctx) {
                // Physics keeps running while suspended, so this bypasses
                // the input gates.
                CollisionReaction::ReduceDistance if self.grab.is_grabbing() => {
                    self.actions.get(ActionId::MoveObject).perform(
                        &mut self.grab,
                        self.collision_reduce_input,
                        ctx,
                    );
                }
                CollisionReaction::ReduceDistance => {}
                CollisionReaction::Released => break,
                CollisionReaction::Ignored => {}
            }
        }
    }

    /// Per-frame update: crosshair classification and the grab tick.
    pub fn update(&mut self, dt: f32, ctx: &mut ActionContext<'_>) {
        self.update_crosshair(ctx);
        self.grab.tick(dt, ctx);
    }

    /// Per-physics-step update of the held object.
    pub fn fixed_update(&mut self, dt: f32, ctx: &mut ActionContext<'_>) {
        self.grab.physics_step(dt, ctx);
    }

    fn update_crosshair(&mut self, ctx: &mut ActionContext<'_>) {
        let config = self.grab.config();
        let in_range = ctx.aim.is_some_and(|aim| {
            ctx.physics
                .raycast(
                    &aim.origin,
                    &aim.forward.into_inner(),
                    config.pick_up_range,
                    config.ignore_layers.inverted(),
                )
                .is_some_and(|hit| self.gauntlet_layers.contains(hit.layer))
        });
        if in_range != self.crosshair_in_range {
            self.crosshair_in_range = in_range;
            ctx.effects.emit(GauntletEffect::CrosshairChanged { in_range });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GrabConfig;
    use crate::game::grab::CollisionPolicy;
    use crate::game::layers::Layer;
    use crate::game::testing::Rig;

    const CUBE: u64 = 11;

    fn manager() -> GauntletManager {
        GauntletManager::new(&GauntletConfig::default())
    }

    #[test]
    fn test_mode_switch_guarded_by_grab() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();

        assert!(manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx()));
        assert!(manager.is_grabbing());
        assert!(!manager.switch_mode(Mode::Teleport, &mut rig.effects));
        assert_eq!(manager.mode(), Mode::Grab);

        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());
        assert!(!manager.is_grabbing());
        assert!(manager.switch_mode(Mode::Teleport, &mut rig.effects));
        assert_eq!(manager.mode(), Mode::Teleport);
        assert_eq!(
            rig.effects.last(),
            Some(&GauntletEffect::ModeSwitched { mode: Mode::Teleport })
        );
    }

    #[test]
    fn test_dependant_actions_dropped_without_grab() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();

        assert!(!manager.perform_action(ActionId::MoveObject, 4.0, &mut rig.ctx()));
        assert!(!manager.perform_action(ActionId::ThrowObject, 0.0, &mut rig.ctx()));

        let body = rig.physics.body(CUBE);
        assert!(body.impulses.is_empty());
        assert_eq!(body.layer, Layer::PICKABLE);
        assert!(rig.effects.is_empty());
    }

    #[test]
    fn test_throw_always_releases() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();
        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());
        assert!(manager.perform_action(ActionId::ThrowObject, 0.0, &mut rig.ctx()));
        assert!(!manager.is_grabbing());
    }

    #[test]
    fn test_actions_gated_by_mode() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();

        assert!(!manager.perform_action(ActionId::Teleport, 0.0, &mut rig.ctx()));
        assert!(manager.toggle_mode(&mut rig.effects));
        assert!(!manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx()));
        assert!(!manager.is_grabbing());
        assert!(manager.perform_action(ActionId::Teleport, 0.0, &mut rig.ctx()));
    }

    #[test]
    fn test_suspension_drops_requests_and_keeps_mode() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();
        manager.suspend();

        assert!(!manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx()));
        assert!(!manager.toggle_mode(&mut rig.effects));
        assert_eq!(manager.mode(), Mode::Grab);

        manager.resume();
        assert!(manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx()));
    }

    #[test]
    fn test_force_release_bypasses_suspension() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();
        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());
        manager.suspend();
        assert!(manager.force_release(&mut rig.ctx()));
        assert!(!manager.is_grabbing());
        assert!(!manager.force_release(&mut rig.ctx()));
    }

    #[test]
    fn test_collision_reduces_distance_by_fixed_step() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();
        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());
        manager.perform_action(ActionId::MoveObject, 8.0, &mut rig.ctx());
        assert_eq!(manager.grab().current_distance(), Some(4.0));

        // Arm collision handling.
        manager.update(0.2, &mut rig.ctx());
        rig.pickables.notify_collision_stay(CUBE);
        manager.process_pickable_signals(&mut rig.ctx());
        assert_eq!(manager.grab().current_distance(), Some(3.875));

        for _ in 0..20 {
            rig.pickables.notify_collision_stay(CUBE);
            manager.process_pickable_signals(&mut rig.ctx());
        }
        assert_eq!(manager.grab().current_distance(), Some(2.0));
    }

    #[test]
    fn test_collision_reduces_distance_while_suspended() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();
        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());
        manager.perform_action(ActionId::MoveObject, 8.0, &mut rig.ctx());
        manager.update(0.2, &mut rig.ctx());
        manager.suspend();

        rig.pickables.notify_collision_stay(CUBE);
        manager.process_pickable_signals(&mut rig.ctx());
        assert_eq!(manager.grab().current_distance(), Some(3.875));
        // Scroll input is still dropped.
        assert!(!manager.perform_action(ActionId::MoveObject, 4.0, &mut rig.ctx()));
        assert_eq!(manager.grab().current_distance(), Some(3.875));
    }

    #[test]
    fn test_unvalidated_config_never_panics() {
        let mut config = GauntletConfig::default();
        config.grab.min_distance = 12.0;
        config.grab.default_distance = 12.0;
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = GauntletManager::new(&config);
        assert!(config.validate().is_err());

        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());
        manager.perform_action(ActionId::MoveObject, 1.0, &mut rig.ctx());
        manager.perform_action(ActionId::MoveObject, f32::NAN, &mut rig.ctx());
        assert_eq!(manager.grab().current_distance(), Some(12.0));
    }

    #[test]
    fn test_throw_of_vanished_object_only_releases() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();
        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());
        rig.effects.clear();
        rig.physics.bodies.remove(&CUBE);

        assert!(manager.perform_action(ActionId::ThrowObject, 0.0, &mut rig.ctx()));
        assert!(!manager.is_grabbing());
        assert_eq!(rig.effects, vec![GauntletEffect::GrabEnded { object: CUBE }]);
    }

    #[test]
    fn test_release_policy_via_signals() {
        let mut config = GauntletConfig::default();
        config.grab = GrabConfig {
            collision_policy: CollisionPolicy::ReleaseObject,
            ..GrabConfig::default()
        };
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = GauntletManager::new(&config);
        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());
        manager.update(0.2, &mut rig.ctx());

        rig.pickables.notify_collision_stay(CUBE);
        manager.process_pickable_signals(&mut rig.ctx());
        assert!(!manager.is_grabbing());
    }

    #[test]
    fn test_invoke_release_signal_ends_grab() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();
        manager.perform_action(ActionId::PickUpRelease, 0.0, &mut rig.ctx());

        rig.pickables.invoke_release(CUBE);
        manager.process_pickable_signals(&mut rig.ctx());
        assert!(!manager.is_grabbing());
        assert!(rig.pickables.take_signals(CUBE).is_empty());
    }

    #[test]
    fn test_crosshair_changes_emit_once() {
        let mut rig = Rig::with_cube(CUBE, 1.5);
        let mut manager = manager();

        manager.update(0.016, &mut rig.ctx());
        manager.update(0.016, &mut rig.ctx());
        assert!(manager.crosshair_in_range());
        assert_eq!(rig.effects, vec![GauntletEffect::CrosshairChanged { in_range: true }]);

        rig.physics.ray_hit = None;
        manager.update(0.016, &mut rig.ctx());
        assert!(!manager.crosshair_in_range());
        assert_eq!(rig.effects.len(), 2);
    }

    #[test]
    fn test_with_actions_rejects_incomplete_table() {
        let config = GauntletConfig::default();
        let err = GauntletManager::with_actions(vec![GauntletAction::PickUpRelease], &config)
            .unwrap_err();
        assert_eq!(err, ActionTableError::Missing(ActionId::MoveObject));
    }
}
