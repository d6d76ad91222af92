//! Headless Cityhold runner.
//!
//! Usage: `cityhold [config.ron] [seconds]`
//!        `cityhold --write-config [path]`
//!
//! Drives the simulation with a scripted circle-strafing, always-firing
//! player at a 60 Hz host cadence and logs what happens.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use engine_core::Vec3;
use game::config::default_config_path;
use game::{GameConfig, GameEvent, Simulation};
use input::{LookDelta, MovementIntent, ScriptedInput};
use physics::StaticShape;

const HOST_FRAME: Duration = Duration::from_nanos(16_666_667);

/// A loose grid of city blocks around the spawn plaza.
fn city_blocks() -> Vec<StaticShape> {
    let mut blocks = Vec::new();
    for gx in -2i32..=2 {
        for gz in -2i32..=2 {
            if gx.abs() <= 1 && gz.abs() <= 1 {
                continue;
            }
            let height = 3.0 + ((gx * 7 + gz * 13).rem_euclid(5)) as f32;
            blocks.push(StaticShape {
                center: Vec3::new(gx as f32 * 16.0, height, gz as f32 * 16.0),
                rotation_y: 0.0,
                half_extents: Vec3::new(5.0, height, 5.0),
            });
        }
    }
    blocks
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some("--write-config") {
        let path = args.get(1).map(PathBuf::from).unwrap_or_else(default_config_path);
        GameConfig::default().save(&path);
        log::info!("Wrote default config to {:?}", path);
        return Ok(());
    }

    let config_path = args.first().map(PathBuf::from).unwrap_or_else(default_config_path);
    let seconds: f32 = match args.get(1) {
        Some(s) => s.parse().with_context(|| format!("invalid duration {:?}", s))?,
        None => 120.0,
    };

    let config = GameConfig::load(&config_path);
    let mut sim = Simulation::new(config, &city_blocks()).context("failed to build simulation")?;
    sim.start_session()?;

    let mut input = ScriptedInput {
        intent: MovementIntent {
            forward: true,
            left: true,
            fire: true,
            ..Default::default()
        },
        look_per_step: LookDelta {
            yaw: 0.02,
            pitch: 0.0,
        },
        restart: false,
    };

    let frames = (seconds.max(0.0) / HOST_FRAME.as_secs_f32()) as u64;
    let mut restarted = false;
    for frame in 0..frames {
        sim.tick(HOST_FRAME, &mut input);

        for event in sim.drain_events() {
            match event {
                GameEvent::HostileKilled { id, .. } => log::debug!("Hostile {} down", id),
                GameEvent::PlayerDied => log::info!("Player died at {}", sim.stats().time_survived_str()),
                GameEvent::SessionStarted { restart: true } => log::info!("Session restarted"),
                _ => {}
            }
        }

        if sim.is_game_over() {
            if restarted {
                break;
            }
            input.restart = true;
            restarted = true;
        } else {
            input.restart = false;
        }

        if frame % 600 == 0 {
            log::info!(
                "[{}] hp {:.0}% ammo {} hostiles {} kills {} threat {}",
                sim.stats().time_survived_str(),
                sim.player_health_fraction() * 100.0,
                sim.player_ammo(),
                sim.active_hostiles(),
                sim.kill_count(),
                sim.threat_level().name()
            );
        }
    }

    let stats = sim.stats();
    log::info!(
        "Done: survived {}, {} kills, {}/{} shots hit ({:.0}%), {:.0} damage taken",
        stats.time_survived_str(),
        stats.kills,
        stats.shots_hit,
        stats.shots_fired,
        stats.accuracy() * 100.0,
        stats.damage_taken
    );
    Ok(())
}
