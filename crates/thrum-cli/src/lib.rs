//! # Thrum CLI
//!
//! Headless driver for the Thrum world simulation.
//!
//! ## Commands
//! - `simulate` - run a headless world and report update-phasing stats
//!
//! The driver is also the reference host loop: it selects a phasing policy
//! at construction time, stores it behind the [`Phaser`] trait, rebalances
//! on a maintenance cadence, and queries `phase` once per entity per frame.

use std::time::Duration;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use thrum_core::entity::EntityId;
use thrum_core::time::{FrameClock, TickCadence};
use thrum_phasing::state::{PhaseStates, Phased};
use thrum_phasing::{BucketPhaser, BudgetPhaser, Phaser};

/// Thrum Simulation CLI
#[derive(Parser)]
#[command(name = "thrum")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run a headless world and report phasing stats
    Simulate {
        /// Number of entities in the world
        #[arg(short, long, default_value = "100")]
        entities: usize,

        /// Phasing policy ("bucket" or "budget")
        #[arg(short, long, default_value = "bucket")]
        policy: String,

        /// Bucket policy: number of phases in the ring
        #[arg(long, default_value = "4")]
        phases: u32,

        /// Budget policy: granted entity updates per second
        #[arg(long, default_value = "60")]
        rate: u32,

        /// Simulated duration in seconds
        #[arg(short, long, default_value = "10")]
        seconds: f64,

        /// Frame length in milliseconds
        #[arg(long, default_value = "16")]
        frame_millis: u64,

        /// Maintenance (rebalance) interval in milliseconds
        #[arg(long, default_value = "250")]
        rebalance_millis: u64,

        /// Print the report as JSON instead of log lines
        #[arg(long)]
        json: bool,
    },
}

/// Parameters for one headless run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimOptions {
    pub entities: usize,
    pub policy: String,
    pub phases: u32,
    pub rate: u32,
    pub seconds: f64,
    pub frame_millis: u64,
    pub rebalance_millis: u64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            entities: 100,
            policy: "bucket".to_string(),
            phases: 4,
            rate: 60,
            seconds: 10.0,
            frame_millis: 16,
            rebalance_millis: 250,
        }
    }
}

/// Aggregate stats from one headless run
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    /// Frames simulated
    pub frames: u64,
    /// Final sim time in milliseconds
    pub sim_millis: u64,
    /// Total entity updates that ran
    pub updates_run: u64,
    /// Updates per second of sim time
    pub updates_per_second: f64,
    /// Fewest updates any single entity ran
    pub min_entity_updates: u64,
    /// Most updates any single entity ran
    pub max_entity_updates: u64,
    /// Entities whose update never ran at all
    pub never_serviced: usize,
}

/// One simulated world entity. `updates_run` counts the frames its update
/// logic executed; the real work it stands in for lives with the host.
struct SimEntity {
    id: EntityId,
    states: PhaseStates,
    updates_run: u64,
}

impl SimEntity {
    fn new(id: EntityId) -> Self {
        Self {
            id,
            states: PhaseStates::new(),
            updates_run: 0,
        }
    }
}

impl Phased for SimEntity {
    fn phase_states(&self) -> &PhaseStates {
        &self.states
    }

    fn phase_states_mut(&mut self) -> &mut PhaseStates {
        &mut self.states
    }
}

/// Run one headless world to completion
pub fn run_simulation(opts: &SimOptions) -> Result<SimReport> {
    let mut phaser: Box<dyn Phaser<SimEntity>> = match opts.policy.as_str() {
        "bucket" => Box::new(BucketPhaser::new(opts.phases)?),
        "budget" => Box::new(BudgetPhaser::new(opts.rate)?),
        other => bail!("unknown policy '{}', expected 'bucket' or 'budget'", other),
    };

    let mut entities: Vec<SimEntity> = (0..opts.entities)
        .map(|i| SimEntity::new(EntityId::new(i as u32, 0)))
        .collect();
    for entity in entities.iter_mut() {
        phaser.register(entity);
    }

    let mut clock = FrameClock::new();
    let mut cadence = TickCadence::from_millis(opts.rebalance_millis);
    let frame = Duration::from_millis(opts.frame_millis.max(1));

    while clock.now().as_secs_f64() < opts.seconds {
        clock.advance(frame);
        let now = clock.now();

        if cadence.due(now) {
            phaser.rebalance(&mut entities, now);
        }

        for entity in entities.iter_mut() {
            if phaser.phase(entity, now) {
                // The entity's actual update logic would run here
                entity.updates_run += 1;
            }
        }
    }

    for entity in entities.iter().filter(|e| e.updates_run == 0) {
        log::debug!("entity {} was never serviced", entity.id.index());
    }

    let updates_run: u64 = entities.iter().map(|e| e.updates_run).sum();
    let sim_millis = clock.now().as_millis();
    let sim_secs = clock.now().as_secs_f64();

    Ok(SimReport {
        frames: clock.frame_count(),
        sim_millis,
        updates_run,
        updates_per_second: if sim_secs > 0.0 {
            updates_run as f64 / sim_secs
        } else {
            0.0
        },
        min_entity_updates: entities.iter().map(|e| e.updates_run).min().unwrap_or(0),
        max_entity_updates: entities.iter().map(|e| e.updates_run).max().unwrap_or(0),
        never_serviced: entities.iter().filter(|e| e.updates_run == 0).count(),
    })
}

/// Execute the CLI command
pub fn execute(cli: Cli) -> Result<()> {
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    match cli.command {
        Commands::Simulate {
            entities,
            policy,
            phases,
            rate,
            seconds,
            frame_millis,
            rebalance_millis,
            json,
        } => {
            let opts = SimOptions {
                entities,
                policy,
                phases,
                rate,
                seconds,
                frame_millis,
                rebalance_millis,
            };

            log::info!("Simulating {} entities ({} policy)...", opts.entities, opts.policy);
            let report = run_simulation(&opts)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                log::info!("Simulation complete:");
                log::info!("  Frames: {}", report.frames);
                log::info!("  Sim time: {}ms", report.sim_millis);
                log::info!("  Updates run: {}", report.updates_run);
                log::info!("  Updates/sec: {:.1}", report.updates_per_second);
                log::info!(
                    "  Per-entity spread: {}..{}",
                    report.min_entity_updates,
                    report.max_entity_updates
                );
                log::info!("  Never serviced: {}", report.never_serviced);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::parse_from(["thrum", "simulate"]);
        assert!(matches!(cli.command, Commands::Simulate { .. }));
    }

    #[test]
    fn test_simulate_flags() {
        let cli = Cli::parse_from([
            "thrum", "simulate", "-e", "500", "-p", "budget", "--rate", "30", "-s", "5",
        ]);
        if let Commands::Simulate {
            entities,
            policy,
            rate,
            seconds,
            ..
        } = cli.command
        {
            assert_eq!(entities, 500);
            assert_eq!(policy, "budget");
            assert_eq!(rate, 30);
            assert!((seconds - 5.0).abs() < f64::EPSILON);
        } else {
            panic!("Expected Simulate command");
        }
    }

    #[test]
    fn test_unknown_policy_errors() {
        let opts = SimOptions {
            policy: "quantum".to_string(),
            ..Default::default()
        };
        assert!(run_simulation(&opts).is_err());
    }

    #[test]
    fn test_bucket_run_services_every_entity() {
        let opts = SimOptions {
            entities: 8,
            policy: "bucket".to_string(),
            phases: 4,
            seconds: 2.0,
            frame_millis: 50,
            rebalance_millis: 200,
            ..Default::default()
        };
        let report = run_simulation(&opts).unwrap();

        assert_eq!(report.frames, 40);
        assert!(report.updates_run > 0);
        assert_eq!(report.never_serviced, 0);
    }

    #[test]
    fn test_budget_run_tracks_configured_rate() {
        // Rebalance every frame so each 100ms pass grants exactly one update
        let opts = SimOptions {
            entities: 10,
            policy: "budget".to_string(),
            rate: 10,
            seconds: 5.0,
            frame_millis: 100,
            rebalance_millis: 100,
            ..Default::default()
        };
        let report = run_simulation(&opts).unwrap();

        assert_eq!(report.frames, 50);
        assert_eq!(report.updates_run, 50);
        assert!((report.updates_per_second - 10.0).abs() < 0.5);
        assert_eq!(report.never_serviced, 0);
    }

    #[test]
    fn test_empty_world_is_safe() {
        let opts = SimOptions {
            entities: 0,
            seconds: 1.0,
            ..Default::default()
        };
        let report = run_simulation(&opts).unwrap();

        assert_eq!(report.updates_run, 0);
        assert_eq!(report.never_serviced, 0);
    }
}
