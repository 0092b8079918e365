//! Gauntlet configuration parsing from gauntlet.toml files

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::game::constants::{
    actions as action_consts, grab as grab_consts, physics as physics_consts,
    pickable as pickable_consts, player as player_consts, teleport as teleport_consts,
};
use crate::game::grab::CollisionPolicy;
use crate::game::layers::{Layer, LayerMask};
use crate::game::manager::Mode;

fn default_ignore_layers() -> LayerMask {
    LayerMask::from_layers(&[
        Layer::IGNORE_RAYCAST,
        Layer::PLAYER,
        Layer::GRABBED_OBJECT,
        Layer::TRIGGER,
    ])
}

/// Grab controller tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GrabConfig {
    pub pick_up_range: f32,
    /// Layers an aimed surface must be on to be grabbed
    pub pickup_layers: LayerMask,
    /// Layers the pick-up ray passes through
    pub ignore_layers: LayerMask,
    /// Layer a held object is moved to
    pub grabbed_layer: Layer,
    pub default_distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub movement_force: f32,
    pub object_drag: f32,
    /// Fraction of the remaining rotation covered per reference step, in [0, 1]
    pub rotation_speed: f32,
    /// Step length `rotation_speed` is expressed against
    pub rotation_reference_step: f32,
    /// Squared displacement under which no movement is requested
    pub deadzone: f32,
    pub collision_grace_secs: f32,
    pub collision_policy: CollisionPolicy,
}

impl Default for GrabConfig {
    fn default() -> Self {
        Self {
            pick_up_range: grab_consts::PICK_UP_RANGE,
            pickup_layers: LayerMask::from_layers(&[Layer::PICKABLE]),
            ignore_layers: default_ignore_layers(),
            grabbed_layer: Layer::GRABBED_OBJECT,
            default_distance: grab_consts::DEFAULT_DISTANCE,
            min_distance: grab_consts::MIN_DISTANCE,
            max_distance: grab_consts::MAX_DISTANCE,
            movement_force: grab_consts::MOVEMENT_FORCE,
            object_drag: grab_consts::OBJECT_DRAG,
            rotation_speed: grab_consts::ROTATION_SPEED,
            rotation_reference_step: physics_consts::TIMESTEP,
            deadzone: grab_consts::DEADZONE,
            collision_grace_secs: grab_consts::COLLISION_GRACE_SECS,
            collision_policy: CollisionPolicy::ReduceDistance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveObjectConfig {
    /// Distance change per unit of scroll input
    pub delta_distance_modifier: f32,
}

impl Default for MoveObjectConfig {
    fn default() -> Self {
        Self {
            delta_distance_modifier: action_consts::DELTA_DISTANCE_MODIFIER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrowObjectConfig {
    pub throwing_force: f32,
}

impl Default for ThrowObjectConfig {
    fn default() -> Self {
        Self {
            throwing_force: action_consts::THROWING_FORCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportConfig {
    pub range: f32,
    /// Surfaces the teleport ray can select
    pub teleport_layers: LayerMask,
    /// Layers ignored by the clearance sweep
    pub ignore_layers: LayerMask,
    /// Layer of pickable objects the player may teleport beside
    pub pickable_layer: Layer,
    pub pickable_offset: f32,
}

impl Default for TeleportConfig {
    fn default() -> Self {
        Self {
            range: teleport_consts::RANGE,
            teleport_layers: LayerMask::from_layers(&[
                Layer::DEFAULT,
                Layer::PICKABLE,
                Layer::TELEPORT_SURFACE,
                Layer::TELEPORT_PICKABLE,
            ]),
            ignore_layers: default_ignore_layers(),
            pickable_layer: Layer::TELEPORT_PICKABLE,
            pickable_offset: teleport_consts::PICKABLE_OFFSET,
        }
    }
}

/// Player capsule dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub radius: f32,
    pub height: f32,
    pub skin_width: f32,
    pub eye_height: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            radius: player_consts::RADIUS,
            height: player_consts::HEIGHT,
            skin_width: player_consts::SKIN_WIDTH,
            eye_height: player_consts::EYE_HEIGHT,
        }
    }
}

/// Dispatcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub default_mode: Mode,
    /// Layers that turn the crosshair to its in-range sprite
    pub gauntlet_layers: LayerMask,
    /// Move input dispatched when a held object collides under `reduce_distance`
    pub collision_reduce_input: f32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_mode: Mode::Grab,
            gauntlet_layers: LayerMask::from_layers(&[Layer::PICKABLE]),
            collision_reduce_input: action_consts::COLLISION_REDUCE_INPUT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PickableConfig {
    pub marker_ray_distance: f32,
    pub marker_ignore_layers: LayerMask,
}

impl Default for PickableConfig {
    fn default() -> Self {
        Self {
            marker_ray_distance: pickable_consts::MARKER_RAY_DISTANCE,
            marker_ignore_layers: default_ignore_layers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "info" or "gauntlet=debug"
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Gauntlet configuration from gauntlet.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GauntletConfig {
    pub grab: GrabConfig,
    pub move_object: MoveObjectConfig,
    pub throw_object: ThrowObjectConfig,
    pub teleport: TeleportConfig,
    pub player: PlayerConfig,
    pub gauntlet: DispatchConfig,
    pub pickable: PickableConfig,
    pub logging: LoggingConfig,
}

impl GauntletConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a directory
    /// Looks for gauntlet.toml in the given directory
    pub fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        Self::from_file(&dir.join("gauntlet.toml"))
    }

    /// Rejects tunables the controllers cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grab = &self.grab;
        if !(grab.min_distance <= grab.max_distance) {
            return Err(ConfigError::Invalid(format!(
                "grab.min_distance ({}) exceeds grab.max_distance ({})",
                grab.min_distance, grab.max_distance
            )));
        }
        if !(grab.min_distance..=grab.max_distance).contains(&grab.default_distance) {
            return Err(ConfigError::Invalid(format!(
                "grab.default_distance ({}) is outside [{}, {}]",
                grab.default_distance, grab.min_distance, grab.max_distance
            )));
        }
        if !(0.0..=1.0).contains(&grab.rotation_speed) {
            return Err(ConfigError::Invalid(format!(
                "grab.rotation_speed ({}) must be within [0, 1]",
                grab.rotation_speed
            )));
        }
        if !(grab.rotation_reference_step > 0.0) {
            return Err(ConfigError::Invalid(
                "grab.rotation_reference_step must be positive".to_string(),
            ));
        }
        let non_negative = [
            ("grab.pick_up_range", grab.pick_up_range),
            ("grab.movement_force", grab.movement_force),
            ("grab.object_drag", grab.object_drag),
            ("grab.deadzone", grab.deadzone),
            ("grab.collision_grace_secs", grab.collision_grace_secs),
            ("teleport.range", self.teleport.range),
            ("player.radius", self.player.radius),
            ("player.skin_width", self.player.skin_width),
        ];
        if let Some((name, value)) = non_negative
            .iter()
            .find(|(_, v)| !(v.is_finite() && *v >= 0.0))
        {
            return Err(ConfigError::Invalid(format!(
                "{} ({}) must be finite and not negative",
                name, value
            )));
        }
        if !(self.player.height >= 2.0 * self.player.radius) {
            return Err(ConfigError::Invalid(format!(
                "player.height ({}) is shorter than the capsule diameter ({})",
                self.player.height,
                2.0 * self.player.radius
            )));
        }
        Ok(())
    }
}

/// Errors that can occur when loading gauntlet configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
