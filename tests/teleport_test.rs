//! Teleport scenarios on a real Rapier world: floor and wall placement,
//! refused placements and mode gating.
//!
//! Run with: cargo test --test teleport_test -- --nocapture

use nalgebra::{Point3, Vector3};

use gauntlet::config::GauntletConfig;
use gauntlet::game::constants::physics::TIMESTEP;
use gauntlet::game::{ActionId, GauntletEffect, GauntletSession, Layer, Mode, ObjectId};

const PLAYER: ObjectId = 1;

/// Pitch that makes the eye ray (1.6 m up) meet the floor about 2.93 m ahead.
const LOOK_DOWN: f32 = -0.5;

fn room() -> GauntletSession<Vec<GauntletEffect>> {
    let mut session = GauntletSession::new(GauntletConfig::default(), Vec::new());
    session.physics.add_static_box(
        Point3::new(0.0, -0.5, 0.0),
        Vector3::new(10.0, 0.5, 10.0),
        Layer::TELEPORT_SURFACE,
    );
    session.spawn_player(PLAYER, Point3::origin());
    session
}

fn teleport_mode(session: &mut GauntletSession<Vec<GauntletEffect>>) {
    assert!(session.switch_mode(Mode::Teleport));
    session.fixed_step(TIMESTEP);
}

fn feet(session: &GauntletSession<Vec<GauntletEffect>>) -> Point3<f32> {
    session.physics.player_position().expect("player spawned")
}

fn floor_hit_z() -> f32 {
    1.6 / LOOK_DOWN.tan().abs()
}

#[test]
fn test_floor_teleport_moves_feet_onto_floor() {
    let mut session = room();
    teleport_mode(&mut session);
    session.look(0.0, LOOK_DOWN);

    assert!(session.perform(ActionId::Teleport, 0.0));
    let expected = Point3::new(0.0, 0.08, floor_hit_z());
    let feet = feet(&session);
    assert!((feet - expected).norm() < 1.0e-3, "feet at {:?}", feet);
    assert!(session
        .sink()
        .iter()
        .any(|e| matches!(e, GauntletEffect::Teleported { .. })));
}

#[test]
fn test_wall_teleport_stands_off_the_wall() {
    let mut session = room();
    session.physics.add_static_box(
        Point3::new(0.0, 3.0, 6.0),
        Vector3::new(3.0, 3.0, 0.5),
        Layer::DEFAULT,
    );
    teleport_mode(&mut session);

    assert!(session.perform(ActionId::Teleport, 0.0));
    // Face at z = 5.5, pushed back by radius + skin width.
    let expected = Point3::new(0.0, 1.6, 5.5 - 0.58);
    let feet = feet(&session);
    assert!((feet - expected).norm() < 1.0e-3, "feet at {:?}", feet);
}

#[test]
fn test_teleport_refused_under_low_overhang() {
    let mut session = room();
    // Slab hovering over the landing spot, clear of the view ray.
    session.physics.add_static_box(
        Point3::new(0.0, 1.0, floor_hit_z()),
        Vector3::new(0.3, 0.1, 0.3),
        Layer::DEFAULT,
    );
    teleport_mode(&mut session);
    session.look(0.0, LOOK_DOWN);

    // Dispatched, but the placement is refused.
    assert!(session.perform(ActionId::Teleport, 0.0));
    assert_eq!(feet(&session), Point3::origin());
    assert!(!session
        .sink()
        .iter()
        .any(|e| matches!(e, GauntletEffect::Teleported { .. })));
}

#[test]
fn test_teleport_out_of_range_does_nothing() {
    let mut session = room();
    teleport_mode(&mut session);
    // Looking up at nothing.
    session.look(0.0, 1.0);
    session.perform(ActionId::Teleport, 0.0);
    assert_eq!(feet(&session), Point3::origin());
}

#[test]
fn test_teleport_only_in_teleport_mode() {
    let mut session = room();
    session.fixed_step(TIMESTEP);
    session.look(0.0, LOOK_DOWN);

    // Dropped by the mode gate.
    assert!(!session.perform(ActionId::Teleport, 0.0));
    assert_eq!(feet(&session), Point3::origin());

    teleport_mode(&mut session);
    assert!(session.perform(ActionId::Teleport, 0.0));
    assert_ne!(feet(&session), Point3::origin());
}

#[test]
fn test_repeated_teleports_walk_forward() {
    let mut session = room();
    teleport_mode(&mut session);
    session.look(0.0, LOOK_DOWN);

    assert!(session.perform(ActionId::Teleport, 0.0));
    let first = feet(&session);
    // The kinematic body only reaches queries after a step.
    session.advance(TIMESTEP);
    assert!(session.perform(ActionId::Teleport, 0.0));
    let second = feet(&session);
    assert!(second.z > first.z + 2.0, "{:?} then {:?}", first, second);
}
