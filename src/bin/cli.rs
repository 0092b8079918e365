//! Gauntlet simulator CLI - drive a demo room with scripted gauntlet input

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::Receiver;
use nalgebra::{Point3, Vector3};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use gauntlet::config::GauntletConfig;
use gauntlet::game::{
    constants::physics as physics_consts, ActionId, GauntletEffect, GauntletSession, Layer, Mode,
    PhysicsBackend, RespawnArea, TracingSink,
};
use gauntlet::telemetry;

const PLAYER_ID: u64 = 1;
const CUBE_ID: u64 = 10;
const TELEPORT_CUBE_ID: u64 = 11;
const PIT_ID: u64 = 50;

const DEFAULT_SCRIPT: &str =
    "grab,wait:20,scroll:4,wait:20,throw,wait:40,mode:teleport,look:0:-0.5,teleport,wait:10";

#[derive(Parser)]
#[command(name = "gauntlet-sim")]
#[command(about = "Headless gauntlet simulator", long_about = None)]
struct Cli {
    /// Path to a gauntlet.toml (default: ./gauntlet.toml when present)
    #[arg(short, long, global = true, env = "GAUNTLET_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo room with a script of gauntlet commands
    Run {
        /// Minimum number of frames to simulate
        #[arg(short, long, default_value = "120")]
        frames: usize,
        /// Comma separated commands, one per frame
        /// (grab, release, throw, teleport, scroll:<v>, mode:<grab|teleport>,
        /// look:<dyaw>:<dpitch>, wait:<n>)
        #[arg(short, long)]
        script: Option<String>,
        /// Print effects and the summary as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            frames,
            script,
            json,
        } => {
            telemetry::init_tracing(&config.logging)?;
            let script = script.as_deref().unwrap_or(DEFAULT_SCRIPT);
            run_demo(config, frames, script, json)
        }
        Commands::Config => {
            let text = toml::to_string_pretty(&config).context("Failed to serialize configuration")?;
            println!("{}", text);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GauntletConfig> {
    match path {
        Some(path) => Ok(GauntletConfig::from_file(path)?),
        None if Path::new("gauntlet.toml").exists() => Ok(GauntletConfig::from_dir(Path::new("."))?),
        None => Ok(GauntletConfig::default()),
    }
}

// =============================================================================
// Script
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum ScriptCommand {
    Grab,
    Release,
    Throw,
    Teleport,
    Scroll(f32),
    Mode(Mode),
    Look(f32, f32),
    Wait(usize),
}

impl FromStr for ScriptCommand {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split(':');
        let name = parts.next().unwrap_or_default();
        let mut arg = |what: &str| {
            parts
                .next()
                .ok_or_else(|| anyhow!("`{}` needs {}", name, what))
        };
        let command = match name {
            "grab" => ScriptCommand::Grab,
            "release" => ScriptCommand::Release,
            "throw" => ScriptCommand::Throw,
            "teleport" => ScriptCommand::Teleport,
            "scroll" => ScriptCommand::Scroll(arg("a value")?.parse()?),
            "mode" => match arg("a mode")? {
                "grab" => ScriptCommand::Mode(Mode::Grab),
                "teleport" => ScriptCommand::Mode(Mode::Teleport),
                other => bail!("unknown mode `{}`", other),
            },
            "look" => {
                let yaw = arg("a yaw delta")?.parse()?;
                let pitch = arg("a pitch delta")?.parse()?;
                ScriptCommand::Look(yaw, pitch)
            }
            "wait" => ScriptCommand::Wait(arg("a frame count")?.parse()?),
            other => bail!("unknown command `{}`", other),
        };
        Ok(command)
    }
}

fn parse_script(script: &str) -> Result<Vec<ScriptCommand>> {
    script
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse().with_context(|| format!("Invalid script command `{}`", s.trim())))
        .collect()
}

// =============================================================================
// Demo room
// =============================================================================

/// A walled floor, a pedestal with a cube at eye height, a cube the player
/// can teleport beside, and a respawn pit under everything.
fn build_demo_room<S: gauntlet::game::EffectSink>(session: &mut GauntletSession<S>) {
    let world = &mut session.physics;
    world.add_static_box(Point3::new(0.0, -0.5, 0.0), Vector3::new(10.0, 0.5, 10.0), Layer::TELEPORT_SURFACE);
    for (x, z, hx, hz) in [
        (10.5, 0.0, 0.5, 10.0),
        (-10.5, 0.0, 0.5, 10.0),
        (0.0, 10.5, 10.0, 0.5),
        (0.0, -10.5, 10.0, 0.5),
    ] {
        world.add_static_box(Point3::new(x, 1.5, z), Vector3::new(hx, 1.5, hz), Layer::DEFAULT);
    }
    world.add_static_box(Point3::new(0.0, 0.6, 1.5), Vector3::new(0.3, 0.6, 0.3), Layer::DEFAULT);

    let cube_home = Point3::new(0.0, 1.45, 1.5);
    let teleport_cube_home = Point3::new(3.0, 0.5, 3.0);
    session.add_pickable(CUBE_ID, cube_home, Vector3::repeat(0.25), Layer::PICKABLE);
    session.add_pickable(
        TELEPORT_CUBE_ID,
        teleport_cube_home,
        Vector3::repeat(0.5),
        Layer::TELEPORT_PICKABLE,
    );

    let pit = RespawnArea::new(PIT_ID, Point3::origin())
        .with_placement(CUBE_ID, cube_home)
        .with_placement(TELEPORT_CUBE_ID, teleport_cube_home);
    session.add_respawn_area(pit, Point3::new(0.0, -4.0, 0.0), Vector3::new(30.0, 1.0, 30.0));

    session.spawn_player(PLAYER_ID, Point3::origin());
}

// =============================================================================
// Run
// =============================================================================

fn run_demo(config: GauntletConfig, frames: usize, script: &str, json: bool) -> Result<()> {
    let commands = parse_script(script)?;
    let (tx, rx) = crossbeam_channel::unbounded();
    // Cues go to stdout through the channel and to the debug log.
    let mut session = GauntletSession::new(config, (tx, TracingSink));
    build_demo_room(&mut session);

    let dt = physics_consts::TIMESTEP;
    // Let the room settle so queries see every body.
    session.fixed_step(dt);

    let mut pending = commands.into_iter();
    let mut waiting = 0usize;
    let mut frame = 0usize;
    loop {
        let script_done = waiting == 0 && pending.len() == 0;
        if frame >= frames && script_done {
            break;
        }
        if waiting > 0 {
            waiting -= 1;
        } else if let Some(command) = pending.next() {
            match command {
                ScriptCommand::Grab => {
                    session.perform(ActionId::PickUpRelease, 0.0);
                }
                ScriptCommand::Release => {
                    session.force_release();
                }
                ScriptCommand::Throw => {
                    session.perform(ActionId::ThrowObject, 0.0);
                }
                ScriptCommand::Teleport => {
                    session.perform(ActionId::Teleport, 0.0);
                }
                ScriptCommand::Scroll(value) => {
                    session.perform(ActionId::MoveObject, value);
                }
                ScriptCommand::Mode(mode) => {
                    if !session.switch_mode(mode) {
                        tracing::warn!(?mode, frame, "mode switch refused");
                    }
                }
                ScriptCommand::Look(yaw, pitch) => session.look(yaw, pitch),
                ScriptCommand::Wait(n) => waiting = n,
            }
        }

        session.advance(dt);
        print_effects(&rx, frame, json)?;
        frame += 1;
    }

    print_summary(&session, frame, json)
}

fn print_effects(rx: &Receiver<GauntletEffect>, frame: usize, json: bool) -> Result<()> {
    for effect in rx.try_iter() {
        if json {
            let mut value = serde_json::to_value(&effect)?;
            value["frame"] = serde_json::json!(frame);
            println!("{}", value);
        } else {
            println!("[frame {:>4}] {:?}", frame, effect);
        }
    }
    Ok(())
}

fn print_summary<S: gauntlet::game::EffectSink>(
    session: &GauntletSession<S>,
    frames: usize,
    json: bool,
) -> Result<()> {
    let manager = session.manager();
    let to_array = |p: Point3<f32>| [p.x, p.y, p.z];
    let summary = serde_json::json!({
        "summary": {
            "frames": frames,
            "mode": manager.mode(),
            "grabbing": manager.is_grabbing(),
            "held_distance": manager.grab().current_distance(),
            "player": session.physics.player_position().map(to_array),
            "cube": session.physics.position(CUBE_ID).map(to_array),
            "teleport_cube": session.physics.position(TELEPORT_CUBE_ID).map(to_array),
        }
    });
    if json {
        println!("{}", summary);
    } else {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
