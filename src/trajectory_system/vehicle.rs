use crate::errors::{require_positive, SimulationError};
use crate::trajectory_system::aerodynamics::{Aerodynamics, Parachute};

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub dry_mass: f64, // kg
    pub aerodynamics: Aerodynamics,
    pub rail_length: f64, // m
    pub recovery: Option<Recovery>,
}

// Dual deployment recovery: the drogue opens `drogue_delay` seconds after
// apogee, the main once the vehicle descends below `main_deploy_altitude`.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovery {
    pub drogue: Option<Parachute>,
    pub drogue_delay: f64,         // s
    pub main: Option<Parachute>,
    pub main_deploy_altitude: f64, // m
}

impl Vehicle {
    pub fn new(dry_mass: f64, aerodynamics: Aerodynamics) -> Result<Self, SimulationError> {
        require_positive("vehicle dry mass", dry_mass)?;
        Ok(Vehicle {
            dry_mass,
            aerodynamics,
            rail_length: 0.0,
            recovery: None,
        })
    }

    pub fn with_rail_length(mut self, rail_length: f64) -> Result<Self, SimulationError> {
        if !(rail_length.is_finite() && rail_length >= 0.0) {
            return Err(SimulationError::configuration(format!(
                "launch rail length must be non-negative, got {rail_length}"
            )));
        }
        self.rail_length = rail_length;
        Ok(self)
    }

    pub fn with_recovery(mut self, recovery: Recovery) -> Result<Self, SimulationError> {
        if !(recovery.drogue_delay.is_finite() && recovery.drogue_delay >= 0.0) {
            return Err(SimulationError::configuration(
                "drogue deployment delay must be non-negative",
            ));
        }
        if !(recovery.main_deploy_altitude.is_finite() && recovery.main_deploy_altitude >= 0.0) {
            return Err(SimulationError::configuration(
                "main parachute deployment altitude must be non-negative",
            ));
        }
        self.recovery = Some(recovery);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_validation() {
        let aerodynamics = Aerodynamics::new(0.5, 0.08).unwrap();
        assert!(Vehicle::new(0.0, aerodynamics.clone()).is_err());

        let vehicle = Vehicle::new(3.0, aerodynamics).unwrap();
        assert_eq!(vehicle.rail_length, 0.0);
        assert!(vehicle.clone().with_rail_length(-1.0).is_err());

        let recovery = Recovery {
            drogue: None,
            drogue_delay: -1.0,
            main: Some(Parachute::new(1.5, 1.0).unwrap()),
            main_deploy_altitude: 300.0,
        };
        assert!(vehicle.with_recovery(recovery).is_err());
    }
}
