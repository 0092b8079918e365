pub mod actions;
pub mod aim;
pub mod backend;
pub mod constants;
pub mod deferred;
pub mod effects;
pub mod grab;
pub mod layers;
pub mod manager;
pub mod physics;
pub mod pickable;
pub mod respawn;
pub mod session;
pub mod teleport;
pub mod touch_events;

#[cfg(test)]
mod testing;

pub use actions::{ActionContext, ActionId, GauntletAction};
pub use aim::{AimPose, AimSource, FirstPersonAim};
pub use backend::{ObjectId, PhysicsBackend, RayHit};
pub use effects::{EffectSink, GauntletEffect, TracingSink};
pub use grab::{CollisionPolicy, GrabController};
pub use layers::{Layer, LayerMask};
pub use manager::{GauntletManager, Mode};
pub use physics::PhysicsWorld;
pub use pickable::PickableRegistry;
pub use respawn::RespawnArea;
pub use session::GauntletSession;
