//! Rooted Sync Demo
//!
//! Runs a host and a client over the in-process loopback transport and logs
//! how their worlds progress. Pass a JSON config path to override defaults.

use std::time::Duration;
use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rooted_sync::{
    SyncConfig, TICK_RATE, VERSION,
    game::{
        input::{InputFrame, ScriptedInput},
        services::Services,
        tick::FixedStepDriver,
        GameController,
    },
    network::{LoopbackHub, Session, SessionStatus},
};

/// Rendered frames the demo runs.
const DEMO_FRAMES: u32 = 600;

/// Simulated frame time, slightly off the step so the accumulator carries.
const FRAME_TIME: Duration = Duration::from_micros(16_900);

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Rooted Sync v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = match std::env::args().nth(1) {
        Some(path) => SyncConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => SyncConfig::default(),
    };

    demo_match(&config)
}

fn session(hub: &LoopbackHub, peer: &str, config: &SyncConfig) -> Session {
    let mut session = Session::new(
        Box::new(hub.connect_as(peer)),
        config.session.clone(),
        config.ownership.clone(),
    );
    session.attach_game_events();
    session
}

/// Wander in a square, dashing at every corner.
fn square_walk(side: usize, laps: usize) -> ScriptedInput {
    let mut input = ScriptedInput::default();
    let legs = [(127, 0), (0, 127), (-127, 0), (0, -127)];
    for _ in 0..laps {
        for (x, y) in legs {
            input.push_repeated(InputFrame::with_movement(x, y).with_flag(InputFrame::FLAG_DASH), 1);
            input.push_repeated(InputFrame::with_movement(x, y), side);
        }
    }
    input
}

fn demo_match(config: &SyncConfig) -> Result<()> {
    info!("=== Starting Demo Match ===");

    let hub = LoopbackHub::new(config.session.max_players);
    let mut host = session(&hub, "host", config);
    let mut client = session(&hub, "guest", config);

    host.connect_as_host()?;
    host.update_net();
    let room = host.room_id().context("host has no room")?.to_string();
    info!("Room: {}", room);

    client.connect_as_client(&room)?;
    client.update_net();
    host.update_net();

    host.start_game()?;
    client.update_net();
    host.mark_ready()?;
    client.mark_ready()?;
    if client.get_status() != SessionStatus::InGame {
        bail!("client stuck in {:?}", client.get_status());
    }
    info!("Players: {:?}", host.get_ordered_players());

    let mut peers = [
        GameController::new(host, Box::new(square_walk(40, 4)), Services::null(), config),
        GameController::new(client, Box::new(square_walk(25, 6)), Services::null(), config),
    ];
    for peer in &mut peers {
        peer.begin_match()?;
    }

    let mut drivers = [FixedStepDriver::new(&config.tick), FixedStepDriver::new(&config.tick)];
    let mut steps = 0u32;
    for frame in 0..DEMO_FRAMES {
        for (peer, driver) in peers.iter_mut().zip(drivers.iter_mut()) {
            steps += driver.advance(FRAME_TIME, peer);
        }

        if frame % TICK_RATE == 0 {
            for peer in &peers {
                let world = peer.world();
                info!(
                    "Frame {:4} | {} round {} tick {} | hash {}",
                    frame,
                    peer.session().local_uuid(),
                    peer.round(),
                    peer.tick(),
                    hex::encode(&world.compute_hash()[..8])
                );
            }
        }
    }

    info!("=== Demo Complete ===");
    info!("Fixed steps run: {}", steps);
    for peer in &peers {
        let world = peer.world();
        info!(
            "{}: round {}, points {:?}, dropped messages {}",
            peer.session().local_uuid(),
            peer.round(),
            world.points,
            peer.session().dropped_messages()
        );
    }

    for peer in &mut peers {
        peer.disconnect();
    }
    Ok(())
}
