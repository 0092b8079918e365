//! Hazard volumes that put fallen cubes and the player back in place.

use std::collections::{HashMap, HashSet};

use nalgebra::{Point3, Vector3};
use tracing::info;

use super::actions::ActionContext;
use super::backend::ObjectId;
use super::effects::GauntletEffect;
use super::layers::{Layer, LayerMask};
use super::manager::GauntletManager;
use super::touch_events::TriggerVolume;

#[derive(Debug, Clone)]
pub struct RespawnArea {
    pub sensor: ObjectId,
    /// Layers of the objects this area resets
    pub cube_layers: LayerMask,
    /// Where each known cube is put back
    pub placements: HashMap<ObjectId, Point3<f32>>,
    pub player_destination: Point3<f32>,
    trigger: TriggerVolume,
}

impl RespawnArea {
    pub fn new(sensor: ObjectId, player_destination: Point3<f32>) -> Self {
        Self {
            sensor,
            cube_layers: LayerMask::from_layers(&[
                Layer::PICKABLE,
                Layer::GRABBED_OBJECT,
                Layer::TELEPORT_PICKABLE,
            ]),
            placements: HashMap::new(),
            player_destination,
            trigger: TriggerVolume::default(),
        }
    }

    pub fn with_placement(mut self, cube: ObjectId, destination: Point3<f32>) -> Self {
        self.placements.insert(cube, destination);
        self
    }

    /// Feeds the sensor's current overlaps and reacts to every new arrival.
    pub fn update(
        &mut self,
        overlaps: HashSet<ObjectId>,
        player: Option<ObjectId>,
        manager: &mut GauntletManager,
        ctx: &mut ActionContext<'_>,
    ) {
        let transitions = self.trigger.update(overlaps);
        for id in transitions.entered {
            self.on_enter(id, player, manager, ctx);
        }
    }

    pub fn on_enter(
        &self,
        id: ObjectId,
        player: Option<ObjectId>,
        manager: &mut GauntletManager,
        ctx: &mut ActionContext<'_>,
    ) {
        if let Some(layer) = ctx.physics.layer(id).filter(|l| self.cube_layers.contains(*l)) {
            // A held cube asks its holder to let go; the holder restores it.
            if layer == Layer::GRABBED_OBJECT {
                ctx.pickables.invoke_release(id);
            }
            ctx.physics.set_linear_velocity(id, Vector3::zeros());
            ctx.physics.set_angular_velocity(id, Vector3::zeros());

            if let Some(destination) = self.placements.get(&id) {
                ctx.physics.set_position(id, *destination);
                info!(object = id, sensor = self.sensor, "cube respawned");
                ctx.effects.emit(GauntletEffect::Respawned { object: id });
            }
        }

        if player == Some(id) {
            manager.force_release(ctx);
            ctx.physics.teleport_player(self.player_destination);
            info!(sensor = self.sensor, "player respawned");
        }
    }
}
