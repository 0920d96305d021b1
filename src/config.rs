// Lengths are in metres, pressures and strengths in pascals, angles in degrees.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_CONVERGENT_ANGLE, DEFAULT_NOZZLE_C1, DEFAULT_NOZZLE_C2};
use crate::errors::SimulationError;
use crate::motor::grain::{Grain, InhibitedFaces};
use crate::motor::nozzle::Nozzle;
use crate::motor::propellant::Propellant;
use crate::motor::structure::{ChamberStructure, Fasteners};
use crate::motor::Motor;
use crate::simulation::orchestrator::SimulationSettings;
use crate::trajectory_system::aerodynamics::{Aerodynamics, Parachute};
use crate::trajectory_system::vehicle::{Recovery, Vehicle};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub motor: MotorConfig,
    #[serde(default)]
    pub vehicle: Option<VehicleConfig>,
    #[serde(default)]
    pub settings: SimulationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    pub propellant: String,
    pub chamber_inner_diameter: f64,
    pub chamber_length: f64,
    pub grains: Vec<GrainConfig>,
    pub nozzle: NozzleConfig,
    #[serde(default)]
    pub structure: Option<StructureConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrainConfig {
    pub outer_diameter: f64,
    pub core_diameter: f64,
    pub length: f64,
    #[serde(default)]
    pub inhibited: InhibitedFaces,
    #[serde(default)]
    pub propellant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NozzleConfig {
    pub throat_diameter: f64,
    pub exit_diameter: f64,
    pub divergent_angle: f64,
    #[serde(default = "default_convergent_angle")]
    pub convergent_angle: f64,
    #[serde(default = "default_c1")]
    pub c1: f64,
    #[serde(default = "default_c2")]
    pub c2: f64,
}

fn default_convergent_angle() -> f64 {
    DEFAULT_CONVERGENT_ANGLE
}

fn default_c1() -> f64 {
    DEFAULT_NOZZLE_C1
}

fn default_c2() -> f64 {
    DEFAULT_NOZZLE_C2
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureConfig {
    pub casing_outer_diameter: f64,
    pub casing_yield_strength: f64,
    pub bulkhead_yield_strength: f64,
    pub nozzle_yield_strength: f64,
    pub safety_factor: f64,
    #[serde(default)]
    pub fasteners: Option<FastenerConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastenerConfig {
    pub screw_diameter: f64,
    pub clearance_diameter: f64,
    pub screw_ultimate_strength: f64,
    pub max_screws: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub dry_mass: f64,
    pub drag_coefficient: f64,
    pub reference_diameter: f64,
    #[serde(default)]
    pub rail_length: f64,
    #[serde(default)]
    pub recovery: Option<RecoveryConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default)]
    pub drogue: Option<ParachuteConfig>,
    #[serde(default)]
    pub drogue_delay: f64,
    #[serde(default)]
    pub main: Option<ParachuteConfig>,
    #[serde(default)]
    pub main_deploy_altitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParachuteConfig {
    pub drag_coefficient: f64,
    pub diameter: f64,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SimulationConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    SimulationConfig::from_toml_str(&contents)
}

impl SimulationConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }
}

impl MotorConfig {
    pub fn build(&self) -> Result<Motor, SimulationError> {
        let propellant = Propellant::lookup(&self.propellant)?;
        let grains = self
            .grains
            .iter()
            .map(|grain| {
                Grain::new(
                    grain.outer_diameter,
                    grain.core_diameter,
                    grain.length,
                    grain.inhibited,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        let nozzle = Nozzle::new(
            self.nozzle.throat_diameter,
            self.nozzle.exit_diameter,
            self.nozzle.divergent_angle,
        )?
        .with_convergent_angle(self.nozzle.convergent_angle)?
        .with_heat_properties(self.nozzle.c1, self.nozzle.c2)?;

        let mut motor = Motor::new(
            propellant,
            grains,
            self.chamber_inner_diameter,
            self.chamber_length,
            nozzle,
        )?;

        for (index, grain) in self.grains.iter().enumerate() {
            if let Some(name) = &grain.propellant {
                motor = motor.with_grain_propellant(index, Propellant::lookup(name)?)?;
            }
        }

        if let Some(structure) = &self.structure {
            motor = motor.with_structure(structure.build()?)?;
        }

        Ok(motor)
    }
}

impl StructureConfig {
    pub fn build(&self) -> Result<ChamberStructure, SimulationError> {
        let structure = ChamberStructure::new(
            self.casing_outer_diameter,
            self.casing_yield_strength,
            self.bulkhead_yield_strength,
            self.nozzle_yield_strength,
            self.safety_factor,
        )?;
        match &self.fasteners {
            Some(fasteners) => structure.with_fasteners(Fasteners {
                screw_diameter: fasteners.screw_diameter,
                clearance_diameter: fasteners.clearance_diameter,
                screw_ultimate_strength: fasteners.screw_ultimate_strength,
                max_screws: fasteners.max_screws,
            }),
            None => Ok(structure),
        }
    }
}

impl VehicleConfig {
    pub fn build(&self) -> Result<Vehicle, SimulationError> {
        let aerodynamics = Aerodynamics::new(self.drag_coefficient, self.reference_diameter)?;
        let vehicle = Vehicle::new(self.dry_mass, aerodynamics)?.with_rail_length(self.rail_length)?;

        match &self.recovery {
            Some(recovery) => vehicle.with_recovery(recovery.build()?),
            None => Ok(vehicle),
        }
    }
}

impl RecoveryConfig {
    pub fn build(&self) -> Result<Recovery, SimulationError> {
        let parachute = |config: &Option<ParachuteConfig>| {
            config
                .as_ref()
                .map(|chute| Parachute::new(chute.drag_coefficient, chute.diameter))
                .transpose()
        };

        Ok(Recovery {
            drogue: parachute(&self.drogue)?,
            drogue_delay: self.drogue_delay,
            main: parachute(&self.main)?,
            main_deploy_altitude: self.main_deploy_altitude,
        })
    }
}
