//! Gauntlet gameplay library
//!
//! Grab, move, throw and teleport actions for a first person physics
//! sandbox, with a rapier3d backed world and a headless simulator.

pub mod config;
pub mod game;
pub mod telemetry;
