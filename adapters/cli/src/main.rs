#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line driver that runs a Tilescape world for a fixed
//! number of frames.

mod script;

use std::{fs, path::PathBuf, thread, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tilescape_core::{Effect, EffectSink, Event};
use tilescape_system_gameplay::{FrameEvent, Gameplay, GameplayConfig};
use tilescape_system_map_transition::Camera;
use tilescape_world::{query, World, WorldLayout};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use script::ScriptStep;

/// Command-line arguments for the Tilescape driver.
#[derive(Debug, Parser)]
#[command(name = "tilescape", about = "Runs a tile world headlessly")]
struct CliArgs {
    /// TOML file describing the world layout and system tunables.
    layout: PathBuf,
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 600)]
    frames: u32,
    /// Seed of the deterministic random number generator.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Simulated frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Scripted input, e.g. `right*30,swing,idle*10`. Frames past its end idle.
    #[arg(long, default_value = "")]
    script: String,
}

/// Effect sink that logs every effect and keeps a tally.
#[derive(Debug, Default)]
struct LoggedEffects {
    strikes: u32,
    structures: u32,
    transitions: u32,
}

impl EffectSink for LoggedEffects {
    fn play(&mut self, effect: Effect) {
        match effect {
            Effect::StrikeLanded { .. } => self.strikes += 1,
            Effect::StructureCompleted { .. } => self.structures += 1,
            Effect::MarkerTransition { .. } => self.transitions += 1,
        }
        info!(?effect, "effect");
    }
}

/// Entry point for the Tilescape command-line interface.
fn main() {
    init_tracing();
    if let Err(error) = run(CliArgs::parse()) {
        error!(error = %format!("{error:#}"), "run_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn run(args: CliArgs) -> Result<()> {
    let text = fs::read_to_string(&args.layout)
        .with_context(|| format!("failed to read layout {}", args.layout.display()))?;
    let layout = WorldLayout::from_toml_str(&text).context("invalid world layout")?;
    let config: GameplayConfig = toml::from_str(&text).context("invalid system tunables")?;
    let steps = script::parse(&args.script)?;

    let builder = thread::Builder::new()
        .name("world-build".to_owned())
        .spawn(move || World::from_layout(&layout))
        .context("failed to spawn world builder")?;
    let mut world = builder
        .join()
        .map_err(|_| anyhow!("world builder panicked"))?
        .context("failed to build world")?;

    let mut camera =
        Camera::for_world(&world).context("player does not stand on a tile map")?;
    let mut gameplay = Gameplay::new(config);
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let mut effects = LoggedEffects::default();
    let frame = Duration::from_secs(1) / args.fps.max(1);

    info!(
        frames = args.frames,
        seed = args.seed,
        fps = args.fps,
        scripted = steps.len(),
        "session_started"
    );

    for index in 0..args.frames {
        let step = usize::try_from(index)
            .ok()
            .and_then(|index| steps.get(index))
            .copied()
            .unwrap_or_default();
        let mut events = Vec::new();
        match step {
            ScriptStep::Reset => gameplay.reset(&mut world, &mut camera, &mut events),
            ScriptStep::Input(input) => gameplay.update_map_grid(
                &mut world,
                frame,
                input,
                &mut camera,
                &mut rng,
                &mut effects,
                &mut events,
            ),
        }
        for event in &events {
            if !matches!(event, FrameEvent::World(Event::TimeAdvanced { .. })) {
                debug!(frame = index, ?event, "frame_event");
            }
        }
    }

    let built = query::structure_pieces(&world)
        .iter()
        .filter(|piece| piece.built)
        .count();
    info!(
        grid = query::current_grid(&world).get(),
        interior = query::is_interior(&world),
        wood = query::wood(&world),
        creatures = query::collected_creatures(&world),
        built,
        strikes = effects.strikes,
        structures = effects.structures,
        transitions = effects.transitions,
        "session_finished"
    );
    Ok(())
}
