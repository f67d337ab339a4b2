#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a scripted Blood Covenant encounter.

mod bot;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{ensure, Context, Result};
use blood_covenant_core::{EncounterConfig, Event};
use blood_covenant_simulation::Simulation;
use blood_covenant_system_scoring::InMemoryHighScore;
use blood_covenant_world::query;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bot::Bot;

const DEFAULT_CONFIG: &str = include_str!("../config/encounter.json");

/// Time between two attacks of the scripted player.
const BOT_ATTACK_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Parser)]
#[command(
    name = "blood-covenant",
    about = "Runs a scripted Blood Covenant encounter headlessly"
)]
struct Cli {
    /// Encounter configuration in JSON; the bundled encounter is used when absent.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Simulated seconds to run before stopping.
    #[arg(long, default_value_t = 120.0)]
    seconds: f64,
    /// Tick length in milliseconds, overriding the configuration.
    #[arg(long, value_name = "MS")]
    tick_ms: Option<u64>,
    /// Global random seed, overriding the configuration.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Default)]
struct Summary {
    elapsed: Duration,
    waves_cleared: u32,
    kills: u32,
    pickups: u32,
    lore: u32,
    all_complete: bool,
    player_died: bool,
}

impl Summary {
    fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => self.elapsed += *dt,
                Event::WaveCompleted { wave } => {
                    self.waves_cleared += 1;
                    info!(wave = wave.number(), "wave cleared");
                }
                Event::AllWavesComplete => {
                    self.all_complete = true;
                    info!("all waves complete");
                }
                Event::EnemyDied { .. } => self.kills += 1,
                Event::PickupCollected { .. } => self.pickups += 1,
                Event::LoreDisplayed {
                    text, first_time, ..
                } => {
                    if *first_time {
                        self.lore += 1;
                        info!(%text, "lore discovered");
                    }
                }
                Event::PlayerDied => {
                    self.player_died = true;
                    info!("the player has fallen");
                }
                _ => {}
            }
        }
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    ensure!(
        cli.seconds.is_finite() && cli.seconds >= 0.0,
        "--seconds must be a non-negative number"
    );

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(tick_ms) = cli.tick_ms {
        config.tick = Duration::from_millis(tick_ms);
    }

    let mut simulation = Simulation::new(&config).context("invalid encounter configuration")?;
    info!(
        seed = config.seed,
        waves = config.waves.len(),
        "{}",
        query::welcome_banner(simulation.world())
    );

    let mut bot = Bot::new(config.combat.melee_radius, BOT_ATTACK_INTERVAL);
    let ticks = (cli.seconds / simulation.tick().as_secs_f64()).ceil() as u64;
    let mut summary = Summary::default();
    let mut events = Vec::new();

    for _ in 0..ticks {
        let intent = bot.decide(simulation.world(), simulation.tick());
        if let Some(movement) = intent.movement {
            simulation.submit(movement, &mut events);
        }
        simulation.step_tick(&intent.actions, &mut events);
        summary.record(&events);
        events.clear();

        let finished = summary.all_complete && query::live_enemy_count(simulation.world()) == 0;
        if summary.player_died || finished {
            break;
        }
    }

    let mut high_score = InMemoryHighScore::default();
    let _ = simulation
        .scoring()
        .save_high_score(&mut high_score)
        .context("failed to record the high score")?;

    let player = query::player(simulation.world());
    let scoring = simulation.scoring();
    println!("{}", query::welcome_banner(simulation.world()));
    println!("elapsed        {:.1}s", summary.elapsed.as_secs_f32());
    println!(
        "waves cleared  {}/{}",
        summary.waves_cleared,
        simulation.orchestrator().total_waves()
    );
    println!("enemies slain  {}", summary.kills);
    println!("pickups        {} ({} lore)", summary.pickups, summary.lore);
    println!("score          {}", scoring.score());
    println!("multiplier     x{}", scoring.multiplier());
    println!("high score     {}", high_score.value());
    println!(
        "player health  {:.0}/{:.0}{}",
        player.health,
        player.max_health,
        if player.dead { " (fallen)" } else { "" }
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EncounterConfig> {
    let Some(path) = path else {
        return EncounterConfig::from_json(DEFAULT_CONFIG)
            .context("bundled encounter configuration is invalid");
    };
    let document = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    EncounterConfig::from_json(&document)
        .with_context(|| format!("failed to parse {}", path.display()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
