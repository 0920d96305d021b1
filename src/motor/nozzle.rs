use serde::Serialize;

use crate::constants::{
    DEFAULT_CONVERGENT_ANGLE, DEFAULT_NOZZLE_C1, DEFAULT_NOZZLE_C2, METERS_PER_INCH,
    PSI_PER_PASCAL,
};
use crate::errors::{require_positive, SimulationError};
use crate::motor::propellant::Propellant;
use crate::utils::geometry::circle_area;

const EXIT_MACH_TOLERANCE: f64 = 1e-12;
const EXIT_MACH_MAX_ITERATIONS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct Nozzle {
    pub throat_diameter: f64,  // m
    pub exit_diameter: f64,    // m
    pub divergent_angle: f64,  // degrees, half angle
    pub convergent_angle: f64, // degrees, half angle
    pub c1: f64,               // nozzle material heat property 1
    pub c2: f64,               // nozzle material heat property 2
}

impl Nozzle {
    pub fn new(
        throat_diameter: f64,
        exit_diameter: f64,
        divergent_angle: f64,
    ) -> Result<Self, SimulationError> {
        require_positive("nozzle throat diameter", throat_diameter)?;
        require_positive("nozzle exit diameter", exit_diameter)?;
        if exit_diameter < throat_diameter {
            return Err(SimulationError::configuration(format!(
                "nozzle exit diameter ({exit_diameter} m) is smaller than the throat ({throat_diameter} m)"
            )));
        }
        validate_half_angle("divergent", divergent_angle)?;

        Ok(Nozzle {
            throat_diameter,
            exit_diameter,
            divergent_angle,
            convergent_angle: DEFAULT_CONVERGENT_ANGLE,
            c1: DEFAULT_NOZZLE_C1,
            c2: DEFAULT_NOZZLE_C2,
        })
    }

    pub fn with_convergent_angle(mut self, angle: f64) -> Result<Self, SimulationError> {
        validate_half_angle("convergent", angle)?;
        self.convergent_angle = angle;
        Ok(self)
    }

    pub fn with_heat_properties(mut self, c1: f64, c2: f64) -> Result<Self, SimulationError> {
        if !(c1.is_finite() && c1 >= 0.0 && c2.is_finite() && c2 >= 0.0) {
            return Err(SimulationError::configuration(format!(
                "nozzle heat properties must be non-negative, got C1 = {c1}, C2 = {c2}"
            )));
        }
        self.c1 = c1;
        self.c2 = c2;
        Ok(self)
    }

    pub fn throat_area(&self) -> f64 {
        circle_area(self.throat_diameter)
    }

    pub fn exit_area(&self) -> f64 {
        circle_area(self.exit_diameter)
    }

    pub fn expansion_ratio(&self) -> f64 {
        (self.exit_diameter / self.throat_diameter).powi(2)
    }
}

fn validate_half_angle(name: &str, angle: f64) -> Result<(), SimulationError> {
    if angle.is_finite() && angle > 0.0 && angle < 90.0 {
        Ok(())
    } else {
        Err(SimulationError::configuration(format!(
            "nozzle {name} half angle must lie in (0, 90) degrees, got {angle}"
        )))
    }
}

// `divergence` is an efficiency, the other three are percentage losses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrectionFactors {
    pub divergence: f64,
    pub two_phase: f64,
    pub kinetic: f64,
    pub boundary_layer: f64,
}

impl CorrectionFactors {
    pub fn combined(&self) -> f64 {
        let losses = self.two_phase + self.kinetic + self.boundary_layer;
        (self.divergence * (100.0 - losses) / 100.0).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NozzleFlow<'a> {
    nozzle: &'a Nozzle,
    propellant: &'a Propellant,
}

impl<'a> NozzleFlow<'a> {
    pub fn new(nozzle: &'a Nozzle, propellant: &'a Propellant) -> Self {
        NozzleFlow { nozzle, propellant }
    }

    pub fn nozzle(&self) -> &Nozzle {
        self.nozzle
    }

    pub fn critical_pressure_ratio(&self) -> f64 {
        critical_pressure_ratio(self.propellant.k_chamber)
    }

    pub fn is_choked(&self, chamber_pressure: f64, ambient_pressure: f64) -> bool {
        chamber_pressure > 0.0
            && ambient_pressure / chamber_pressure <= self.critical_pressure_ratio()
    }

    // Zero when the chamber is at or below ambient
    pub fn mass_flow(&self, chamber_pressure: f64, ambient_pressure: f64) -> f64 {
        if !(chamber_pressure > ambient_pressure) {
            return 0.0;
        }
        let k = self.propellant.k_chamber;
        let gas_temperature_term =
            self.propellant.gas_constant() * self.propellant.combustion_temperature();
        let h = if self.is_choked(chamber_pressure, ambient_pressure) {
            (k / (k + 1.0)).sqrt() * (2.0 / (k + 1.0)).powf(1.0 / (k - 1.0))
        } else {
            let pressure_ratio = ambient_pressure / chamber_pressure;
            pressure_ratio.powf(1.0 / k)
                * ((k / (k - 1.0)) * (1.0 - pressure_ratio.powf((k - 1.0) / k))).sqrt()
        };

        chamber_pressure * self.nozzle.throat_area() * h * (2.0 / gas_temperature_term).sqrt()
    }

    pub fn exit_mach(&self) -> f64 {
        exit_mach_number(self.propellant.k_exhaust, self.nozzle.expansion_ratio())
    }

    // Static pressure at the exit plane. The nozzle is assumed to flow full:
    // a supersonic exit never separates, a subsonic one exits at ambient.
    pub fn exit_pressure(&self, chamber_pressure: f64, ambient_pressure: f64) -> f64 {
        if !self.is_choked(chamber_pressure, ambient_pressure) {
            return ambient_pressure;
        }
        let k = self.propellant.k_exhaust;
        let mach = self.exit_mach();
        chamber_pressure * (1.0 + 0.5 * (k - 1.0) * mach.powi(2)).powf(-k / (k - 1.0))
    }

    pub fn exhaust_velocity(&self, chamber_pressure: f64, exit_pressure: f64) -> f64 {
        if !(chamber_pressure > exit_pressure) || !(exit_pressure >= 0.0) {
            return 0.0;
        }
        let k = self.propellant.k_exhaust;
        let pressure_ratio = exit_pressure / chamber_pressure;
        ((2.0 * k / (k - 1.0))
            * self.propellant.exhaust_gas_constant()
            * self.propellant.combustion_temperature()
            * (1.0 - pressure_ratio.powf((k - 1.0) / k)))
        .sqrt()
    }

    // `free_volume` is the empty chamber volume, `time` the time since ignition
    pub fn correction_factors(
        &self,
        chamber_pressure: f64,
        ambient_pressure: f64,
        free_volume: f64,
        time: f64,
    ) -> CorrectionFactors {
        let chamber_psi = chamber_pressure.max(0.0) * PSI_PER_PASCAL;
        let choked = self.is_choked(chamber_pressure, ambient_pressure);

        CorrectionFactors {
            divergence: divergence_efficiency(self.nozzle.divergent_angle),
            two_phase: if choked {
                self.two_phase_loss(chamber_psi, free_volume)
            } else {
                0.0
            },
            kinetic: kinetic_loss(
                chamber_psi,
                self.propellant.isp_frozen,
                self.propellant.isp_shifting,
            ),
            boundary_layer: if choked {
                self.boundary_layer_loss(chamber_psi, time)
            } else {
                0.0
            },
        }
    }

    fn two_phase_loss(&self, chamber_psi: f64, free_volume: f64) -> f64 {
        if chamber_psi <= 0.0 {
            return 0.0;
        }
        let throat_in = self.nozzle.throat_diameter / METERS_PER_INCH;
        let condensed = self.propellant.condensed_moles_chamber;
        let characteristic_length_in = free_volume / self.nozzle.throat_area() / METERS_PER_INCH;

        let c7 = (0.454
            * chamber_psi.powf(0.33)
            * condensed.powf(0.33)
            * (1.0 - (-0.004 * characteristic_length_in).exp() * (1.0 + 0.045 * throat_in)))
            .max(0.0);

        let (c3, c4, c5, c6) = if 1.0 / self.propellant.molar_mass_chamber >= 0.9 {
            let (c3, c5, c6) = if throat_in < 1.0 {
                (9.0, 1.0, 1.0)
            } else if throat_in < 2.0 {
                (9.0, 1.0, 0.8)
            } else if c7 < 4.0 {
                (13.4, 0.8, 0.8)
            } else if c7 <= 8.0 {
                (10.2, 0.8, 0.4)
            } else {
                (7.58, 0.8, 0.33)
            };
            (c3, 0.5, c5, c6)
        } else {
            let (c3, c5, c6) = if throat_in < 1.0 {
                (44.5, 0.8, 0.8)
            } else if throat_in < 2.0 {
                (30.4, 0.8, 0.4)
            } else if c7 < 4.0 {
                (44.5, 0.8, 0.8)
            } else if c7 <= 8.0 {
                (30.4, 0.8, 0.4)
            } else {
                (25.2, 0.8, 0.33)
            };
            (c3, 1.0, c5, c6)
        };

        c3 * (condensed * c4 * c7.powf(c5))
            / (chamber_psi.powf(0.15)
                * self.nozzle.expansion_ratio().powf(0.08)
                * throat_in.powf(c6))
    }

    fn boundary_layer_loss(&self, chamber_psi: f64, time: f64) -> f64 {
        let throat_term = (self.nozzle.throat_diameter / METERS_PER_INCH).powf(0.2);
        let pressure_term = chamber_psi.powf(0.8);
        let transient = 1.0 + 2.0 * (-self.nozzle.c2 * pressure_term * time / throat_term).exp();
        let expansion = 1.0 + 0.016 * self.nozzle.expansion_ratio().powi(-9);
        self.nozzle.c1 * (pressure_term / throat_term) * transient * expansion
    }
}

pub fn critical_pressure_ratio(k: f64) -> f64 {
    (2.0 / (k + 1.0)).powf(k / (k - 1.0))
}

pub fn divergence_efficiency(divergent_angle: f64) -> f64 {
    0.5 * (1.0 + divergent_angle.to_radians().cos())
}

pub fn kinetic_loss(chamber_psi: f64, isp_frozen: f64, isp_shifting: f64) -> f64 {
    let frozen_deficit = 1.0 - isp_frozen / isp_shifting;
    if chamber_psi > 200.0 {
        33.3 * frozen_deficit * 200.0 / chamber_psi
    } else {
        33.3 * frozen_deficit
    }
}

pub fn area_ratio(k: f64, mach: f64) -> f64 {
    ((1.0 + 0.5 * (k - 1.0) * mach.powi(2)) / (1.0 + 0.5 * (k - 1.0)))
        .powf((k + 1.0) / (2.0 * (k - 1.0)))
        / mach
}

pub fn exit_mach_number(k: f64, expansion_ratio: f64) -> f64 {
    if expansion_ratio <= 1.0 {
        return 1.0;
    }

    let mut low = 1.0;
    let mut high = 2.0;
    while area_ratio(k, high) < expansion_ratio && high < 1.0e3 {
        low = high;
        high *= 2.0;
    }

    for _ in 0..EXIT_MACH_MAX_ITERATIONS {
        let mid = 0.5 * (low + high);
        if area_ratio(k, mid) < expansion_ratio {
            low = mid;
        } else {
            high = mid;
        }
        if high - low < EXIT_MACH_TOLERANCE {
            break;
        }
    }
    0.5 * (low + high)
}

pub fn optimal_expansion_ratio(k: f64, chamber_pressure: f64, ambient_pressure: f64) -> f64 {
    let pressure_ratio = ambient_pressure / chamber_pressure;
    if !(pressure_ratio > 0.0) || pressure_ratio >= critical_pressure_ratio(k) {
        return 1.0;
    }
    1.0 / (((k + 1.0) / 2.0).powf(1.0 / (k - 1.0))
        * pressure_ratio.powf(1.0 / k)
        * (((k + 1.0) / (k - 1.0)) * (1.0 - pressure_ratio.powf((k - 1.0) / k))).sqrt())
}
