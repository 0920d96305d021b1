use std::f64::consts::PI;

use serde::Serialize;

use crate::errors::{require_positive, SimulationError};

#[derive(Debug, Clone, PartialEq)]
pub struct ChamberStructure {
    pub casing_outer_diameter: f64,   // m
    pub casing_yield_strength: f64,   // Pa
    pub bulkhead_yield_strength: f64, // Pa
    pub nozzle_yield_strength: f64,   // Pa
    pub safety_factor: f64,
    pub fasteners: Option<Fasteners>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fasteners {
    pub screw_diameter: f64,          // m
    pub clearance_diameter: f64,      // m
    pub screw_ultimate_strength: f64, // Pa
    pub max_screws: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralMargins {
    pub max_chamber_pressure: f64,        // Pa
    pub casing_thickness: f64,            // m
    pub casing_safety_factor: f64,
    pub bulkhead_thickness: f64,          // m, minimum
    pub nozzle_convergent_thickness: f64, // m, minimum
    pub nozzle_divergent_thickness: f64,  // m, minimum
    pub fasteners: Option<FastenerMargins>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FastenerMargins {
    pub optimal_count: usize,
    pub safety_factor: f64,
    pub shear: Vec<f64>,
    pub tear: Vec<f64>,
    pub compression: Vec<f64>,
}

impl ChamberStructure {
    pub fn new(
        casing_outer_diameter: f64,
        casing_yield_strength: f64,
        bulkhead_yield_strength: f64,
        nozzle_yield_strength: f64,
        safety_factor: f64,
    ) -> Result<Self, SimulationError> {
        require_positive("casing outer diameter", casing_outer_diameter)?;
        require_positive("casing yield strength", casing_yield_strength)?;
        require_positive("bulkhead yield strength", bulkhead_yield_strength)?;
        require_positive("nozzle yield strength", nozzle_yield_strength)?;
        require_positive("structural safety factor", safety_factor)?;

        Ok(ChamberStructure {
            casing_outer_diameter,
            casing_yield_strength,
            bulkhead_yield_strength,
            nozzle_yield_strength,
            safety_factor,
            fasteners: None,
        })
    }

    pub fn with_fasteners(mut self, fasteners: Fasteners) -> Result<Self, SimulationError> {
        require_positive("screw diameter", fasteners.screw_diameter)?;
        require_positive("screw clearance diameter", fasteners.clearance_diameter)?;
        require_positive("screw ultimate strength", fasteners.screw_ultimate_strength)?;
        if fasteners.max_screws == 0 {
            return Err(SimulationError::configuration(
                "maximum number of screws must be at least one",
            ));
        }
        self.fasteners = Some(fasteners);
        Ok(self)
    }

    pub(crate) fn validate_against(&self, inner_diameter: f64) -> Result<(), SimulationError> {
        if self.casing_outer_diameter <= inner_diameter {
            return Err(SimulationError::configuration(format!(
                "casing outer diameter ({} m) must exceed the chamber inner diameter ({inner_diameter} m)",
                self.casing_outer_diameter
            )));
        }
        if let Some(fasteners) = &self.fasteners {
            if fasteners.clearance_diameter >= inner_diameter {
                return Err(SimulationError::configuration(
                    "screw clearance diameter must be smaller than the chamber inner diameter",
                ));
            }
        }
        Ok(())
    }

    pub fn margins(
        &self,
        max_chamber_pressure: f64,
        inner_diameter: f64,
        convergent_angle: f64,
        divergent_angle: f64,
    ) -> StructuralMargins {
        let allowable_bulkhead = self.bulkhead_yield_strength / self.safety_factor;
        let allowable_nozzle = self.nozzle_yield_strength / self.safety_factor;
        let casing_thickness = 0.5 * (self.casing_outer_diameter - inner_diameter);

        let nozzle_thickness = |angle: f64| {
            (max_chamber_pressure * inner_diameter / 2.0)
                / (allowable_nozzle - 0.6 * max_chamber_pressure * angle.to_radians().cos())
        };

        let bursting_pressure = self.casing_yield_strength * casing_thickness
            / (0.5 * inner_diameter + 0.6 * casing_thickness);

        StructuralMargins {
            max_chamber_pressure,
            casing_thickness,
            casing_safety_factor: bursting_pressure / max_chamber_pressure,
            bulkhead_thickness: inner_diameter
                * (0.75 * max_chamber_pressure / allowable_bulkhead).sqrt(),
            nozzle_convergent_thickness: nozzle_thickness(convergent_angle),
            nozzle_divergent_thickness: nozzle_thickness(divergent_angle),
            fasteners: self.fasteners.as_ref().map(|fasteners| {
                self.fastener_margins(fasteners, max_chamber_pressure, inner_diameter)
            }),
        }
    }

    fn fastener_margins(
        &self,
        fasteners: &Fasteners,
        max_chamber_pressure: f64,
        inner_diameter: f64,
    ) -> FastenerMargins {
        let wall_area = 0.25 * (self.casing_outer_diameter.powi(2) - inner_diameter.powi(2));
        let shear_area = 0.25 * PI * fasteners.screw_diameter.powi(2);
        let compression_area =
            0.5 * (self.casing_outer_diameter - inner_diameter) * fasteners.clearance_diameter;
        let clearance_angle = (fasteners.clearance_diameter / inner_diameter).asin();
        let closure_force = max_chamber_pressure * PI * (0.5 * inner_diameter).powi(2);

        let mut shear = Vec::with_capacity(fasteners.max_screws);
        let mut tear = Vec::with_capacity(fasteners.max_screws);
        let mut compression = Vec::with_capacity(fasteners.max_screws);

        for count in 1..=fasteners.max_screws {
            let force = closure_force / count as f64;
            let tear_area = PI * wall_area / count as f64 - clearance_angle * wall_area;

            shear.push(fasteners.screw_ultimate_strength / (force / shear_area));
            tear.push((self.casing_yield_strength / 3.0_f64.sqrt()) / (force / tear_area));
            compression.push(self.casing_yield_strength / (force / compression_area));
        }

        let (optimal_index, safety_factor) = (0..fasteners.max_screws)
            .map(|i| (i, shear[i].min(tear[i]).min(compression[i])))
            .fold((0, f64::NEG_INFINITY), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        FastenerMargins {
            optimal_count: optimal_index + 1,
            safety_factor,
            shear,
            tear,
            compression,
        }
    }
}
