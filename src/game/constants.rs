//! Physics and gauntlet tuning constants.
//! Config defaults and tests read from here instead of repeating literals.

/// Physics constants
pub mod physics {
    /// Default gravity in m/s²
    pub const DEFAULT_GRAVITY: f32 = 9.81;

    /// Fixed timestep for physics simulation (60 Hz)
    pub const TIMESTEP: f32 = 1.0 / 60.0;

    /// Small epsilon for float comparisons
    pub const EPSILON: f32 = 0.001;

    /// Mass of every pickable box in kg, whatever its size
    pub const PICKABLE_MASS: f32 = 1.0;
}

/// Named collision layers. A layer is a bit index into a `LayerMask`.
pub mod layers {
    pub const DEFAULT: u8 = 0;
    pub const IGNORE_RAYCAST: u8 = 2;
    pub const PLAYER: u8 = 3;
    pub const PICKABLE: u8 = 6;
    /// Held objects are moved here so they stop colliding with the player.
    pub const GRABBED_OBJECT: u8 = 7;
    pub const TELEPORT_SURFACE: u8 = 8;
    pub const TELEPORT_PICKABLE: u8 = 9;
    /// Trigger volumes (respawn areas)
    pub const TRIGGER: u8 = 10;
}

/// Grab controller defaults
pub mod grab {
    pub const PICK_UP_RANGE: f32 = 2.0;
    pub const DEFAULT_DISTANCE: f32 = 2.0;
    pub const MIN_DISTANCE: f32 = 2.0;
    pub const MAX_DISTANCE: f32 = 10.0;

    /// Impulse gain applied to the displacement, also the impulse magnitude cap
    pub const MOVEMENT_FORCE: f32 = 50.0;

    /// Linear damping of an object while it is held
    pub const OBJECT_DRAG: f32 = 2.0;

    /// Fraction of the remaining rotation covered per reference step
    pub const ROTATION_SPEED: f32 = 0.1;

    /// No movement is requested while the squared displacement is at or below this
    pub const DEADZONE: f32 = 0.001;

    /// Delay before collision notifications of a fresh grab are honored
    pub const COLLISION_GRACE_SECS: f32 = 0.1;
}

/// Dependant action defaults
pub mod actions {
    /// Distance change per unit of scroll input
    pub const DELTA_DISTANCE_MODIFIER: f32 = 0.25;

    pub const THROWING_FORCE: f32 = 10.0;

    /// Scroll-equivalent input dispatched when a held object hits geometry
    pub const COLLISION_REDUCE_INPUT: f32 = -0.5;
}

/// Teleport defaults
pub mod teleport {
    pub const RANGE: f32 = 20.0;

    /// Extra clearance kept from a pickable object's side face
    pub const PICKABLE_OFFSET: f32 = 0.2;

    /// Dot products within this band of zero count as walls
    pub const NORMAL_ORIENTATION_OFFSET: f32 = 0.0001;
}

/// Player capsule defaults
pub mod player {
    pub const RADIUS: f32 = 0.5;
    pub const HEIGHT: f32 = 2.0;
    pub const SKIN_WIDTH: f32 = 0.08;
    pub const EYE_HEIGHT: f32 = 1.6;

    /// Pitch limit in degrees for the first person aim
    pub const MAX_PITCH_DEGREES: f32 = 89.0;
}

/// Pickable object defaults
pub mod pickable {
    /// Maximum drop distance of the ground marker under a held object
    pub const MARKER_RAY_DISTANCE: f32 = 5.0;
}
