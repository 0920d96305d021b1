use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::errors::{require_positive, SimulationError};
use crate::utils::geometry::{circle_area, hollow_cylinder_volume};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InhibitedFaces {
    #[default]
    None,
    One,
    Both,
}

impl InhibitedFaces {
    pub fn burning_faces(&self) -> u8 {
        match self {
            InhibitedFaces::None => 2,
            InhibitedFaces::One => 1,
            InhibitedFaces::Both => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grain {
    pub outer_diameter: f64, // m
    pub core_diameter: f64,  // m
    pub length: f64,         // m
    pub inhibited: InhibitedFaces,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainSurface {
    pub burn_area: f64,         // m²
    pub propellant_volume: f64, // m³
    pub core_diameter: f64,     // m
    pub length: f64,            // m
    pub consumed: bool,
}

impl Grain {
    pub fn new(
        outer_diameter: f64,
        core_diameter: f64,
        length: f64,
        inhibited: InhibitedFaces,
    ) -> Result<Self, SimulationError> {
        require_positive("grain outer diameter", outer_diameter)?;
        require_positive("grain core diameter", core_diameter)?;
        require_positive("grain length", length)?;
        if core_diameter >= outer_diameter {
            return Err(SimulationError::configuration(format!(
                "grain core diameter ({core_diameter} m) must be smaller than its outer diameter ({outer_diameter} m)"
            )));
        }

        Ok(Grain {
            outer_diameter,
            core_diameter,
            length,
            inhibited,
        })
    }

    pub fn web_thickness(&self) -> f64 {
        0.5 * (self.outer_diameter - self.core_diameter)
    }

    // Depth at which the segment is fully consumed, either through its web or,
    // when the end faces burn, through its length.
    pub fn burnout_depth(&self) -> f64 {
        match self.inhibited.burning_faces() {
            0 => self.web_thickness(),
            faces => self.web_thickness().min(self.length / faces as f64),
        }
    }

    pub fn is_consumed(&self, depth: f64) -> bool {
        depth >= self.burnout_depth()
    }

    pub fn surface(&self, depth: f64) -> GrainSurface {
        let depth = depth.max(0.0);
        let faces = self.inhibited.burning_faces() as f64;
        let core_diameter = self.core_diameter + 2.0 * depth;
        let length = self.length - faces * depth;

        if self.is_consumed(depth) || core_diameter >= self.outer_diameter || length <= 0.0 {
            return GrainSurface {
                burn_area: 0.0,
                propellant_volume: 0.0,
                core_diameter: core_diameter.min(self.outer_diameter),
                length: length.max(0.0),
                consumed: true,
            };
        }

        let bore_area = PI * core_diameter * length;
        let face_area = 0.25 * PI * (self.outer_diameter.powi(2) - core_diameter.powi(2));

        GrainSurface {
            burn_area: bore_area + faces * face_area,
            propellant_volume: hollow_cylinder_volume(self.outer_diameter, core_diameter, length),
            core_diameter,
            length,
            consumed: false,
        }
    }

    pub fn burn_area(&self, depth: f64) -> f64 {
        self.surface(depth).burn_area
    }

    pub fn propellant_volume(&self, depth: f64) -> f64 {
        self.surface(depth).propellant_volume
    }

    pub fn initial_volume(&self) -> f64 {
        self.propellant_volume(0.0)
    }

    pub fn port_area(&self, depth: f64) -> f64 {
        circle_area(self.surface(depth).core_diameter)
    }

    // Segment length that gives equal burn area at ignition and burnout
    // when both ends burn.
    pub fn optimal_length(&self) -> f64 {
        0.5 * (3.0 * self.outer_diameter + self.core_diameter)
    }
}
