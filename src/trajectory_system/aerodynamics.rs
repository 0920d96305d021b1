use crate::errors::{require_positive, SimulationError};
use crate::trajectory_system::environment::Environment;
use crate::utils::geometry::circle_area;

#[derive(Debug, Clone, PartialEq)]
pub struct Aerodynamics {
    pub drag_coefficient: f64,
    pub reference_area: f64, // m²
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parachute {
    pub drag_coefficient: f64,
    pub diameter: f64, // m
}

impl Aerodynamics {
    pub fn new(drag_coefficient: f64, reference_diameter: f64) -> Result<Self, SimulationError> {
        require_positive("drag coefficient", drag_coefficient)?;
        require_positive("reference diameter", reference_diameter)?;
        Ok(Aerodynamics {
            drag_coefficient,
            reference_area: circle_area(reference_diameter),
        })
    }

    pub fn drag_area(&self) -> f64 {
        self.drag_coefficient * self.reference_area
    }

    // Signed along the vertical axis, opposing the velocity
    pub fn calculate_drag(&self, velocity: f64, drag_area: f64, environment: &Environment) -> f64 {
        -velocity.signum() * self.calculate_dynamic_pressure(velocity, environment) * drag_area
    }

    pub fn calculate_dynamic_pressure(&self, velocity: f64, environment: &Environment) -> f64 {
        0.5 * environment.air_density * velocity.powi(2)
    }
}

impl Parachute {
    pub fn new(drag_coefficient: f64, diameter: f64) -> Result<Self, SimulationError> {
        require_positive("parachute drag coefficient", drag_coefficient)?;
        require_positive("parachute diameter", diameter)?;
        Ok(Parachute {
            drag_coefficient,
            diameter,
        })
    }

    pub fn drag_area(&self) -> f64 {
        self.drag_coefficient * circle_area(self.diameter)
    }
}
