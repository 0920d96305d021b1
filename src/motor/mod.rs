pub mod chamber;
pub mod grain;
pub mod nozzle;
pub mod propellant;
pub mod structure;
pub mod thrust;

use crate::errors::{require_positive, SimulationError};
use crate::utils::geometry::cylinder_volume;

use self::grain::Grain;
use self::nozzle::Nozzle;
use self::propellant::Propellant;
use self::structure::ChamberStructure;

// The base propellant defines the combustion gas. Each segment may burn a
// different propellant, which then only changes its density and burn rate law.
#[derive(Debug, Clone)]
pub struct Motor {
    pub propellant: &'static Propellant,
    pub chamber_inner_diameter: f64, // m
    pub chamber_length: f64,         // m
    pub nozzle: Nozzle,
    pub structure: Option<ChamberStructure>,
    grains: Vec<Grain>,
    grain_propellants: Vec<&'static Propellant>,
}

impl Motor {
    pub fn new(
        propellant: &'static Propellant,
        grains: Vec<Grain>,
        chamber_inner_diameter: f64,
        chamber_length: f64,
        nozzle: Nozzle,
    ) -> Result<Self, SimulationError> {
        require_positive("chamber inner diameter", chamber_inner_diameter)?;
        require_positive("chamber length", chamber_length)?;
        if grains.is_empty() {
            return Err(SimulationError::configuration(
                "a motor needs at least one grain",
            ));
        }

        if let Some((index, grain)) = grains
            .iter()
            .enumerate()
            .find(|(_, grain)| grain.outer_diameter > chamber_inner_diameter)
        {
            return Err(SimulationError::configuration(format!(
                "grain #{} outer diameter ({} m) exceeds the chamber inner diameter ({chamber_inner_diameter} m)",
                index + 1,
                grain.outer_diameter
            )));
        }

        let stack_length: f64 = grains.iter().map(|grain| grain.length).sum();
        if stack_length > chamber_length {
            return Err(SimulationError::configuration(format!(
                "grain stack length ({stack_length} m) exceeds the chamber length ({chamber_length} m)"
            )));
        }

        if nozzle.throat_diameter >= chamber_inner_diameter {
            return Err(SimulationError::configuration(format!(
                "nozzle throat diameter ({} m) must be smaller than the chamber inner diameter",
                nozzle.throat_diameter
            )));
        }

        let grain_propellants = vec![propellant; grains.len()];
        let motor = Motor {
            propellant,
            chamber_inner_diameter,
            chamber_length,
            nozzle,
            structure: None,
            grains,
            grain_propellants,
        };

        let free_volume = motor.free_volume(&motor.initial_burn_depths());
        if !(free_volume > 0.0) {
            return Err(SimulationError::configuration(format!(
                "initial chamber free volume must be positive, got {free_volume} m³"
            )));
        }

        Ok(motor)
    }

    pub fn with_grain_propellant(
        mut self,
        index: usize,
        propellant: &'static Propellant,
    ) -> Result<Self, SimulationError> {
        let grain_count = self.grains.len();
        let slot = self.grain_propellants.get_mut(index).ok_or_else(|| {
            SimulationError::configuration(format!(
                "grain index {index} is out of range for a motor with {grain_count} grains"
            ))
        })?;
        *slot = propellant;
        Ok(self)
    }

    pub fn with_structure(mut self, structure: ChamberStructure) -> Result<Self, SimulationError> {
        structure.validate_against(self.chamber_inner_diameter)?;
        self.structure = Some(structure);
        Ok(self)
    }

    pub fn grains(&self) -> &[Grain] {
        &self.grains
    }

    pub fn grain_count(&self) -> usize {
        self.grains.len()
    }

    pub fn grain_propellant(&self, index: usize) -> &'static Propellant {
        self.grain_propellants[index]
    }

    pub fn segments(&self) -> impl Iterator<Item = (&Grain, &'static Propellant)> + '_ {
        self.grains
            .iter()
            .zip(self.grain_propellants.iter().copied())
    }

    pub fn initial_burn_depths(&self) -> Vec<f64> {
        vec![0.0; self.grains.len()]
    }

    pub fn chamber_volume(&self) -> f64 {
        cylinder_volume(self.chamber_inner_diameter, self.chamber_length)
    }

    pub fn throat_area(&self) -> f64 {
        self.nozzle.throat_area()
    }

    pub fn burn_area(&self, burn_depths: &[f64]) -> f64 {
        self.grains
            .iter()
            .zip(burn_depths)
            .map(|(grain, &depth)| grain.burn_area(depth))
            .sum()
    }

    pub fn propellant_volume(&self, burn_depths: &[f64]) -> f64 {
        self.grains
            .iter()
            .zip(burn_depths)
            .map(|(grain, &depth)| grain.propellant_volume(depth))
            .sum()
    }

    pub fn free_volume(&self, burn_depths: &[f64]) -> f64 {
        self.chamber_volume() - self.propellant_volume(burn_depths)
    }

    pub fn propellant_mass(&self, burn_depths: &[f64]) -> f64 {
        self.segments()
            .zip(burn_depths)
            .map(|((grain, propellant), &depth)| grain.propellant_volume(depth) * propellant.density)
            .sum()
    }

    pub fn initial_propellant_mass(&self) -> f64 {
        self.propellant_mass(&self.initial_burn_depths())
    }

    pub fn kn(&self, burn_depths: &[f64]) -> f64 {
        self.burn_area(burn_depths) / self.throat_area()
    }

    pub fn is_burned_out(&self, burn_depths: &[f64]) -> bool {
        self.grains
            .iter()
            .zip(burn_depths)
            .all(|(grain, &depth)| grain.is_consumed(depth))
    }

    pub fn volumetric_loading(&self) -> f64 {
        self.propellant_volume(&self.initial_burn_depths()) / self.chamber_volume()
    }

    pub fn initial_port_to_throat(&self) -> f64 {
        self.grains
            .last()
            .map_or(0.0, |grain| grain.port_area(0.0) / self.throat_area())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::grain::InhibitedFaces;
    use crate::motor::propellant::PropellantId;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn kndx_grain() -> Grain {
        Grain::new(0.070, 0.020, 0.150, InhibitedFaces::Both).unwrap()
    }

    fn kndx_motor() -> Motor {
        Motor::new(
            Propellant::by_id(PropellantId::Kndx),
            vec![kndx_grain()],
            0.072,
            0.160,
            Nozzle::new(0.010, 0.025, 12.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_chamber_must_contain_grains() {
        let propellant = Propellant::by_id(PropellantId::Kndx);
        let nozzle = Nozzle::new(0.010, 0.025, 12.0).unwrap();

        let too_narrow = Motor::new(propellant, vec![kndx_grain()], 0.060, 0.2, nozzle.clone());
        assert!(too_narrow.unwrap_err().is_configuration_error());

        let too_short = Motor::new(
            propellant,
            vec![kndx_grain(), kndx_grain()],
            0.072,
            0.2,
            nozzle.clone(),
        );
        assert!(too_short.is_err());

        assert!(Motor::new(propellant, vec![], 0.072, 0.2, nozzle).is_err());
    }

    #[test]
    fn test_throat_must_fit_in_chamber() {
        let propellant = Propellant::by_id(PropellantId::Kndx);
        let nozzle = Nozzle::new(0.080, 0.100, 12.0).unwrap();
        let result = Motor::new(propellant, vec![kndx_grain()], 0.072, 0.160, nozzle);
        assert!(result.unwrap_err().is_configuration_error());
    }

    #[test]
    fn test_initial_properties() {
        let motor = kndx_motor();
        let depths = motor.initial_burn_depths();
        let grain_volume = 0.25 * PI * (0.070_f64.powi(2) - 0.020_f64.powi(2)) * 0.150;

        assert_relative_eq!(motor.propellant_volume(&depths), grain_volume, epsilon = 1e-12);
        assert_relative_eq!(
            motor.initial_propellant_mass(),
            grain_volume * 1795.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            motor.free_volume(&depths),
            motor.chamber_volume() - grain_volume,
            epsilon = 1e-12
        );
        assert_relative_eq!(motor.kn(&depths), 0.020 * 0.150 * 4.0 / 0.010_f64.powi(2), epsilon = 1e-9);
        assert_relative_eq!(motor.initial_port_to_throat(), 4.0, epsilon = 1e-12);
        assert!(motor.volumetric_loading() > 0.0 && motor.volumetric_loading() < 1.0);
    }

    #[test]
    fn test_burned_out_only_when_every_grain_is_consumed() {
        let propellant = Propellant::by_id(PropellantId::Kndx);
        let short = Grain::new(0.070, 0.040, 0.100, InhibitedFaces::Both).unwrap();
        let motor = Motor::new(
            propellant,
            vec![kndx_grain(), short],
            0.072,
            0.300,
            Nozzle::new(0.010, 0.025, 12.0).unwrap(),
        )
        .unwrap();

        let long_web = motor.grains()[0].burnout_depth();
        let short_web = motor.grains()[1].burnout_depth();

        assert!(!motor.is_burned_out(&[short_web, short_web]));
        assert!(!motor.is_burned_out(&[0.8 * long_web, short_web]));
        assert!(!motor.is_burned_out(&[long_web, 0.5 * short_web]));
        assert!(motor.is_burned_out(&[long_web, short_web]));
        assert_eq!(motor.burn_area(&[long_web, short_web]), 0.0);
        assert_eq!(motor.propellant_mass(&[long_web, short_web]), 0.0);
    }

    #[test]
    fn test_grain_propellant_override() {
        let knsu = Propellant::by_id(PropellantId::Knsu);
        let motor = kndx_motor().with_grain_propellant(0, knsu).unwrap();
        assert_eq!(motor.grain_propellant(0).id, PropellantId::Knsu);
        assert_eq!(motor.propellant.id, PropellantId::Kndx);
        assert_relative_eq!(
            motor.initial_propellant_mass(),
            motor.propellant_volume(&[0.0]) * knsu.density,
            epsilon = 1e-9
        );
        assert!(kndx_motor().with_grain_propellant(3, knsu).is_err());
    }
}
