use std::fmt;

use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::errors::SimulationError;
use crate::simulation::orchestrator::SimulationOrchestrator;
use crate::simulation::state::SimulationResult;
use crate::telemetry_system::telemetry::Telemetry;

// Results keep the input order
pub fn run_batch(configs: &[SimulationConfig]) -> Vec<Result<SimulationResult, SimulationError>> {
    configs
        .par_iter()
        .map(|config| SimulationOrchestrator::from_config(config)?.run())
        .collect()
}

pub fn run_with_telemetry(
    config: &SimulationConfig,
) -> Result<(SimulationResult, Telemetry), SimulationError> {
    let orchestrator = SimulationOrchestrator::from_config(config)?;
    let result = orchestrator.run()?;
    let telemetry = Telemetry::from_result(
        orchestrator.motor(),
        orchestrator.vehicle(),
        &result,
        orchestrator.settings(),
    );
    Ok((result, telemetry))
}

// Three-sigma tolerances, in the units of the dispersed quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    #[serde(default)]
    pub throat_diameter: f64, // m
    #[serde(default)]
    pub grain_outer_diameter: f64, // m
    #[serde(default)]
    pub grain_core_diameter: f64, // m
    #[serde(default)]
    pub grain_length: f64, // m
    #[serde(default)]
    pub dry_mass: f64, // kg
    #[serde(default)]
    pub drag_coefficient: f64,
}

impl Dispersion {
    fn tolerances(&self) -> [(&'static str, f64); 6] {
        [
            ("throat diameter", self.throat_diameter),
            ("grain outer diameter", self.grain_outer_diameter),
            ("grain core diameter", self.grain_core_diameter),
            ("grain length", self.grain_length),
            ("dry mass", self.dry_mass),
            ("drag coefficient", self.drag_coefficient),
        ]
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        for (name, tolerance) in self.tolerances() {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                return Err(SimulationError::configuration(format!(
                    "{name} tolerance must be non-negative, got {tolerance}"
                )));
            }
        }
        Ok(())
    }
}

fn disperse(rng: &mut StdRng, nominal: f64, tolerance: f64) -> Result<f64, SimulationError> {
    if tolerance == 0.0 {
        return Ok(nominal);
    }
    let normal = Normal::new(nominal, tolerance / 3.0)
        .map_err(|e| SimulationError::configuration(format!("invalid dispersion: {e}")))?;
    Ok(normal.sample(rng))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl Statistics {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Statistics {
            mean,
            std: variance.sqrt(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloReport {
    pub runs: usize,
    pub valid_runs: usize,
    pub failed_runs: usize,
    pub total_impulse: Option<Statistics>,
    pub max_pressure: Option<Statistics>,
    pub apogee: Option<Statistics>,
}

pub struct MonteCarlo {
    base: SimulationConfig,
    dispersion: Dispersion,
    runs: usize,
    seed: u64,
}

impl MonteCarlo {
    pub fn new(
        base: SimulationConfig,
        dispersion: Dispersion,
        runs: usize,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        if runs == 0 {
            return Err(SimulationError::configuration(
                "Monte Carlo needs at least one run",
            ));
        }
        dispersion.validate()?;
        Ok(MonteCarlo {
            base,
            dispersion,
            runs,
            seed,
        })
    }

    // The same seed gives the same set
    pub fn samples(&self) -> Result<Vec<SimulationConfig>, SimulationError> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let tolerances = &self.dispersion;

        (0..self.runs)
            .map(|_| -> Result<SimulationConfig, SimulationError> {
                let mut config = self.base.clone();
                let nozzle = &mut config.motor.nozzle;
                nozzle.throat_diameter =
                    disperse(&mut rng, nozzle.throat_diameter, tolerances.throat_diameter)?;

                for grain in &mut config.motor.grains {
                    grain.outer_diameter =
                        disperse(&mut rng, grain.outer_diameter, tolerances.grain_outer_diameter)?;
                    grain.core_diameter =
                        disperse(&mut rng, grain.core_diameter, tolerances.grain_core_diameter)?;
                    grain.length = disperse(&mut rng, grain.length, tolerances.grain_length)?;
                }

                if let Some(vehicle) = &mut config.vehicle {
                    vehicle.dry_mass = disperse(&mut rng, vehicle.dry_mass, tolerances.dry_mass)?;
                    vehicle.drag_coefficient =
                        disperse(&mut rng, vehicle.drag_coefficient, tolerances.drag_coefficient)?;
                }
                Ok(config)
            })
            .collect()
    }

    pub fn run(&self) -> Result<MonteCarloReport, SimulationError> {
        let samples = self.samples()?;
        info!("Running {} Monte Carlo samples (seed {})", samples.len(), self.seed);

        let outcomes: Vec<Result<Telemetry, SimulationError>> = samples
            .par_iter()
            .map(|config| run_with_telemetry(config).map(|(_, telemetry)| telemetry))
            .collect();

        let mut valid = Vec::with_capacity(outcomes.len());
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(telemetry) => valid.push(telemetry),
                Err(e) => warn!("Monte Carlo run {index} failed: {e}"),
            }
        }

        let collect = |field: fn(&Telemetry) -> Option<f64>| {
            let values: Vec<f64> = valid.iter().filter_map(field).collect();
            Statistics::from_values(&values)
        };

        Ok(MonteCarloReport {
            runs: self.runs,
            valid_runs: valid.len(),
            failed_runs: self.runs - valid.len(),
            total_impulse: collect(|t| Some(t.total_impulse)),
            max_pressure: collect(|t| Some(t.max_pressure)),
            apogee: collect(|t| t.flight.as_ref().map(|flight| flight.apogee)),
        })
    }
}

impl fmt::Display for MonteCarloReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Monte Carlo Summary ---")?;
        writeln!(
            f,
            "Runs: {} ({} valid, {} failed)",
            self.runs, self.valid_runs, self.failed_runs
        )?;
        let rows = [
            ("Total Impulse [N·s]", self.total_impulse, 1.0),
            ("Max Pressure [MPa]", self.max_pressure, 1e-6),
            ("Apogee [m]", self.apogee, 1.0),
        ];
        for (label, statistics, scale) in rows {
            if let Some(s) = statistics {
                writeln!(
                    f,
                    "{label}: mean {:.3}, std {:.3}, min {:.3}, max {:.3}",
                    s.mean * scale,
                    s.std * scale,
                    s.min * scale,
                    s.max * scale
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn base_config() -> SimulationConfig {
        SimulationConfig::from_toml_str(
            r#"
            [motor]
            propellant = "KNDX"
            chamber_inner_diameter = 0.072
            chamber_length = 0.160

            [[motor.grains]]
            outer_diameter = 0.070
            core_diameter = 0.020
            length = 0.150
            inhibited = "both"

            [motor.nozzle]
            throat_diameter = 0.010
            exit_diameter = 0.025
            divergent_angle = 12.0
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_statistics() {
        let stats = Statistics::from_values(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.std, 1.25_f64.sqrt());
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!(Statistics::from_values(&[]).is_none());
    }

    #[test]
    fn test_dispersion_validation() {
        let dispersion = Dispersion {
            throat_diameter: -1e-4,
            ..Dispersion::default()
        };
        assert!(MonteCarlo::new(base_config(), dispersion, 5, 1).is_err());
        assert!(MonteCarlo::new(base_config(), Dispersion::default(), 0, 1).is_err());
    }

    #[test]
    fn test_samples_are_reproducible() {
        let dispersion = Dispersion {
            throat_diameter: 2e-4,
            grain_core_diameter: 3e-4,
            ..Dispersion::default()
        };
        let first = MonteCarlo::new(base_config(), dispersion.clone(), 4, 42).unwrap();
        let second = MonteCarlo::new(base_config(), dispersion.clone(), 4, 42).unwrap();
        let other = MonteCarlo::new(base_config(), dispersion, 4, 43).unwrap();

        let samples = first.samples().unwrap();
        assert_eq!(samples, second.samples().unwrap());
        assert_ne!(samples, other.samples().unwrap());
        assert!(samples
            .iter()
            .all(|config| config.motor.grains[0].outer_diameter == 0.070));
        assert!(samples
            .windows(2)
            .any(|pair| pair[0].motor.nozzle.throat_diameter != pair[1].motor.nozzle.throat_diameter));
    }

    #[test]
    fn test_zero_dispersion_keeps_nominal() {
        let monte_carlo = MonteCarlo::new(base_config(), Dispersion::default(), 3, 7).unwrap();
        let samples = monte_carlo.samples().unwrap();
        assert!(samples.iter().all(|config| *config == base_config()));
    }

    #[test]
    fn test_batch_keeps_input_order() {
        let mut broken = base_config();
        broken.motor.propellant = "KNXX".to_string();
        let results = run_batch(&[base_config(), broken]);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(SimulationError::LookupError(_))));
    }
}
