//! Teleport action: raycast placement with a clearance check.
//!
//! The surface under the aim is classified by its normal. Each class gets its
//! own feet placement and its own sphere sweep that must come back empty
//! before the player is moved.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::actions::ActionContext;
use super::backend::RayHit;
use super::constants::teleport as consts;
use super::effects::GauntletEffect;
use super::layers::{Layer, LayerMask};
use crate::config::{PlayerConfig, TeleportConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeleportSurface {
    Floor,
    Wall,
    Ceiling,
}

impl TeleportSurface {
    /// Classifies a hit normal against world up, with a small tolerance so
    /// near-vertical walls are not read as floors or ceilings.
    pub fn classify(normal: &Vector3<f32>) -> Self {
        let orientation = Vector3::y().dot(normal);
        if orientation < -consts::NORMAL_ORIENTATION_OFFSET {
            TeleportSurface::Ceiling
        } else if orientation > consts::NORMAL_ORIENTATION_OFFSET {
            TeleportSurface::Floor
        } else {
            TeleportSurface::Wall
        }
    }
}

/// Where the player would land and the sweep that must be clear first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub surface: TeleportSurface,
    pub feet: Point3<f32>,
    pub sweep_origin: Point3<f32>,
    pub sweep_direction: Vector3<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teleport {
    pub range: f32,
    pub teleport_layers: LayerMask,
    pub ignore_layers: LayerMask,
    pub pickable_layer: Layer,
    pub pickable_offset: f32,
    pub player: PlayerConfig,
}

impl Teleport {
    pub fn from_config(config: &TeleportConfig, player: &PlayerConfig) -> Self {
        Self {
            range: config.range,
            teleport_layers: config.teleport_layers,
            ignore_layers: config.ignore_layers,
            pickable_layer: config.pickable_layer,
            pickable_offset: config.pickable_offset,
            player: *player,
        }
    }

    /// Computes the placement for a hit. `None` when the underside of a
    /// pickable is hit straight on and there is no side to stand beside.
    pub fn plan(&self, hit: &RayHit) -> Option<Placement> {
        let PlayerConfig {
            radius,
            height,
            skin_width: skin,
            ..
        } = self.player;
        let (p, n) = (hit.point, hit.normal);
        let up = Vector3::y();
        let surface = TeleportSurface::classify(&n);

        let placement = match surface {
            TeleportSurface::Floor => Placement {
                surface,
                feet: p + n * skin,
                sweep_origin: p + n * (radius + skin),
                sweep_direction: up,
            },
            TeleportSurface::Wall => Placement {
                surface,
                feet: p + n * (radius + skin),
                sweep_origin: p + n * (radius + skin) + up * radius,
                sweep_direction: up,
            },
            TeleportSurface::Ceiling if hit.layer == self.pickable_layer => {
                // Stand beside the object rather than below it.
                let flat = Vector3::new(n.x, 0.0, n.z).try_normalize(1.0e-6)?;
                let offset = self.pickable_offset;
                Placement {
                    surface,
                    feet: p + flat * (skin + radius + offset),
                    sweep_origin: p + flat * (radius + skin + offset) + up * offset,
                    sweep_direction: up,
                }
            }
            TeleportSurface::Ceiling => Placement {
                surface,
                feet: p + n * (skin + height),
                sweep_origin: p + n * (radius + skin),
                sweep_direction: -up,
            },
        };
        Some(placement)
    }

    /// Whether the player capsule fits at the placement.
    pub fn has_clearance(&self, placement: &Placement, ctx: &ActionContext<'_>) -> bool {
        let PlayerConfig { radius, height, .. } = self.player;
        !ctx.physics.sphere_cast(
            &placement.sweep_origin,
            &placement.sweep_direction,
            radius,
            (height - 2.0 * radius).max(0.0),
            self.ignore_layers.inverted(),
        )
    }

    /// Moves the player to the aimed surface. Returns whether it did.
    pub fn perform(&self, ctx: &mut ActionContext<'_>) -> bool {
        let Some(aim) = ctx.aim else {
            return false;
        };
        let Some(hit) = ctx.physics.raycast(
            &aim.origin,
            &aim.forward.into_inner(),
            self.range,
            self.teleport_layers,
        ) else {
            return false;
        };
        let Some(placement) = self.plan(&hit) else {
            debug!(point = ?hit.point, "no placement beside pickable underside");
            return false;
        };
        if !self.has_clearance(&placement, ctx) {
            debug!(surface = ?placement.surface, point = ?hit.point, "teleport refused, no clearance");
            return false;
        }

        ctx.physics.teleport_player(placement.feet);
        info!(surface = ?placement.surface, feet = ?placement.feet, "teleported");
        ctx.effects.emit(GauntletEffect::Teleported {
            position: placement.feet.coords.into(),
        });
        true
    }
}
