use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use srm_simulation::simulation::batch::run_with_telemetry;
use srm_simulation::{load_config, Dispersion, MonteCarlo};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Solid rocket motor internal and external ballistics simulator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate one motor (and vehicle, if configured)
    Run {
        /// TOML configuration file
        config: PathBuf,

        /// Print the full state sequences as JSON instead of the summary
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Repeat the simulation with random manufacturing dispersions
    Montecarlo {
        /// TOML configuration file
        config: PathBuf,

        #[arg(long, default_value_t = 100)]
        runs: usize,

        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Throat diameter tolerance in mm (3σ)
        #[arg(long, default_value_t = 0.1)]
        throat_tolerance: f64,

        /// Grain diameter and length tolerance in mm (3σ)
        #[arg(long, default_value_t = 0.5)]
        grain_tolerance: f64,

        /// Vehicle dry mass tolerance in kg (3σ)
        #[arg(long, default_value_t = 0.0)]
        mass_tolerance: f64,

        /// Drag coefficient tolerance (3σ)
        #[arg(long, default_value_t = 0.0)]
        drag_tolerance: f64,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Run { config, json } => {
            let simulation = load_config(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let (result, telemetry) = run_with_telemetry(&simulation)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                info!("Outcome: {:?}", result.outcome);
                println!("{telemetry}");
            }
        }
        Command::Montecarlo {
            config,
            runs,
            seed,
            throat_tolerance,
            grain_tolerance,
            mass_tolerance,
            drag_tolerance,
        } => {
            let simulation = load_config(&config)
                .with_context(|| format!("loading {}", config.display()))?;
            let dispersion = Dispersion {
                throat_diameter: throat_tolerance * 1e-3,
                grain_outer_diameter: grain_tolerance * 1e-3,
                grain_core_diameter: grain_tolerance * 1e-3,
                grain_length: grain_tolerance * 1e-3,
                dry_mass: mass_tolerance,
                drag_coefficient: drag_tolerance,
            };
            let report = MonteCarlo::new(simulation, dispersion, runs, seed)?.run()?;
            println!("{report}");
        }
    }

    Ok(())
}
