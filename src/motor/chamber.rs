use crate::errors::SimulationError;
use crate::motor::nozzle::NozzleFlow;
use crate::motor::Motor;

#[derive(Debug, Clone, PartialEq)]
pub struct BurnSnapshot {
    pub burn_area: f64,       // m²
    pub burn_rates: Vec<f64>, // m/s, per grain
    pub mass_generation: f64, // kg/s
    pub free_volume: f64,     // m³
    pub propellant_mass: f64, // kg
    pub max_mass_flux: f64,   // kg/(s·m²)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChamberStep {
    pub pressure: f64,
    pub burn_depths: Vec<f64>,
}

pub struct ChamberStateSolver<'a> {
    motor: &'a Motor,
    ambient_pressure: f64,
}

impl<'a> ChamberStateSolver<'a> {
    pub fn new(motor: &'a Motor, ambient_pressure: f64) -> Self {
        ChamberStateSolver {
            motor,
            ambient_pressure,
        }
    }

    fn nozzle_flow(&self) -> NozzleFlow<'a> {
        NozzleFlow::new(&self.motor.nozzle, self.motor.propellant)
    }

    pub fn snapshot(&self, pressure: f64, burn_depths: &[f64]) -> BurnSnapshot {
        let mut burn_area = 0.0;
        let mut burn_rates = Vec::with_capacity(burn_depths.len());
        let mut mass_generation = 0.0;
        let mut propellant_mass = 0.0;
        let mut max_mass_flux: f64 = 0.0;

        for ((grain, propellant), &depth) in self.motor.segments().zip(burn_depths) {
            let surface = grain.surface(depth);
            let rate = if surface.consumed {
                0.0
            } else {
                propellant.burn_rate(pressure)
            };

            burn_area += surface.burn_area;
            mass_generation += rate * surface.burn_area * propellant.density;
            propellant_mass += surface.propellant_volume * propellant.density;
            burn_rates.push(rate);

            // gas produced upstream of the aft end of this grain leaves through its port
            max_mass_flux = max_mass_flux.max(mass_generation / grain.port_area(depth));
        }

        BurnSnapshot {
            burn_area,
            burn_rates,
            mass_generation,
            free_volume: self.motor.free_volume(burn_depths),
            propellant_mass,
            max_mass_flux,
        }
    }

    pub fn nozzle_mass_flow(&self, pressure: f64) -> f64 {
        self.nozzle_flow().mass_flow(pressure, self.ambient_pressure)
    }

    // dP/dt = R T0 (m_gen - m_noz(P)) / V_free
    pub fn pressure_derivative(&self, pressure: f64, snapshot: &BurnSnapshot) -> f64 {
        let propellant = self.motor.propellant;
        let gas_term = propellant.gas_constant() * propellant.combustion_temperature();
        gas_term * (snapshot.mass_generation - self.nozzle_mass_flow(pressure))
            / snapshot.free_volume
    }

    // Pressure at which generation matches nozzle flow for fixed burn depths.
    // None once nothing is burning.
    pub fn equilibrium_pressure(&self, burn_depths: &[f64]) -> Option<f64> {
        let surplus = |pressure: f64| {
            self.snapshot(pressure, burn_depths).mass_generation - self.nozzle_mass_flow(pressure)
        };
        if !(surplus(self.ambient_pressure) > 0.0) {
            return None;
        }

        let (mut low, mut high) = (self.ambient_pressure, 2.0 * self.ambient_pressure);
        for _ in 0..32 {
            if surplus(high) < 0.0 {
                break;
            }
            low = high;
            high *= 2.0;
        }
        if !(surplus(high) < 0.0) {
            return None;
        }

        for _ in 0..100 {
            let mid = 0.5 * (low + high);
            if surplus(mid) > 0.0 {
                low = mid;
            } else {
                high = mid;
            }
        }
        Some(0.5 * (low + high))
    }

    // Burn area, free volume and regression rates are frozen over the step
    pub fn advance(
        &self,
        time: f64,
        pressure: f64,
        burn_depths: &[f64],
        dt: f64,
    ) -> Result<ChamberStep, SimulationError> {
        let snapshot = self.snapshot(pressure, burn_depths);
        if !(snapshot.free_volume > 0.0) || !snapshot.free_volume.is_finite() {
            return Err(SimulationError::diverged(
                time,
                format!("chamber free volume is {} m³", snapshot.free_volume),
            ));
        }

        let derivative = |stage: &str, p: f64| -> Result<f64, SimulationError> {
            if !p.is_finite() || p <= 0.0 {
                return Err(SimulationError::diverged(
                    time,
                    format!("chamber pressure {p} Pa at Runge-Kutta {stage}"),
                ));
            }
            let dp = self.pressure_derivative(p, &snapshot);
            if dp.is_finite() {
                Ok(dp)
            } else {
                Err(SimulationError::diverged(
                    time,
                    format!("pressure derivative is not finite at Runge-Kutta {stage}"),
                ))
            }
        };

        let k1 = derivative("stage 1", pressure)?;
        let k2 = derivative("stage 2", pressure + 0.5 * dt * k1)?;
        let k3 = derivative("stage 3", pressure + 0.5 * dt * k2)?;
        let k4 = derivative("stage 4", pressure + dt * k3)?;
        let next_pressure = pressure + dt / 6.0 * (k1 + 2.0 * k2 + 2.0 * k3 + k4);

        if !next_pressure.is_finite() || next_pressure <= 0.0 {
            return Err(SimulationError::diverged(
                time + dt,
                format!("chamber pressure {next_pressure} Pa after step"),
            ));
        }

        let next_depths: Vec<f64> = self
            .motor
            .grains()
            .iter()
            .zip(burn_depths.iter().zip(&snapshot.burn_rates))
            .map(|(grain, (&depth, &rate))| (depth + rate * dt).min(grain.burnout_depth()))
            .collect();

        let residual_mass = self.motor.propellant_mass(&next_depths);
        if !residual_mass.is_finite() || residual_mass < 0.0 {
            return Err(SimulationError::diverged(
                time + dt,
                format!("residual propellant mass is {residual_mass} kg"),
            ));
        }

        Ok(ChamberStep {
            pressure: next_pressure,
            burn_depths: next_depths,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SEA_LEVEL_PRESSURE;
    use crate::motor::grain::{Grain, InhibitedFaces};
    use crate::motor::nozzle::Nozzle;
    use crate::motor::propellant::{Propellant, PropellantId};
    use approx::assert_relative_eq;

    fn kndx_motor() -> Motor {
        Motor::new(
            Propellant::by_id(PropellantId::Kndx),
            vec![Grain::new(0.070, 0.020, 0.150, InhibitedFaces::Both).unwrap()],
            0.072,
            0.160,
            Nozzle::new(0.010, 0.025, 12.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_snapshot_at_ignition() {
        let motor = kndx_motor();
        let solver = ChamberStateSolver::new(&motor, SEA_LEVEL_PRESSURE);
        let snapshot = solver.snapshot(2.0e6, &[0.0]);
        let rate = motor.propellant.burn_rate(2.0e6);

        assert_eq!(snapshot.burn_rates, vec![rate]);
        assert_relative_eq!(
            snapshot.mass_generation,
            rate * snapshot.burn_area * 1795.0,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            snapshot.max_mass_flux,
            snapshot.mass_generation / motor.grains()[0].port_area(0.0),
            epsilon = 1e-9
        );
        assert_relative_eq!(snapshot.propellant_mass, motor.initial_propellant_mass(), epsilon = 1e-12);
    }

    #[test]
    fn test_pressure_rises_from_ambient() {
        let motor = kndx_motor();
        let solver = ChamberStateSolver::new(&motor, SEA_LEVEL_PRESSURE);
        let step = solver.advance(0.0, SEA_LEVEL_PRESSURE, &[0.0], 1.0e-3).unwrap();
        assert!(step.pressure > SEA_LEVEL_PRESSURE);
        assert!(step.burn_depths[0] > 0.0);
    }

    #[test]
    fn test_burn_depth_clamped_at_burnout() {
        let motor = kndx_motor();
        let solver = ChamberStateSolver::new(&motor, SEA_LEVEL_PRESSURE);
        let burnout = motor.grains()[0].burnout_depth();
        let step = solver
            .advance(2.0, 5.0e6, &[burnout - 1.0e-7], 1.0e-3)
            .unwrap();
        assert_eq!(step.burn_depths[0], burnout);

        // no generation after burnout, the chamber blows down
        let blowdown = solver.advance(2.001, step.pressure, &step.burn_depths, 1.0e-3).unwrap();
        assert!(blowdown.pressure < step.pressure);
        assert_eq!(blowdown.burn_depths[0], burnout);
    }

    #[test]
    fn test_steady_state_balances_generation_and_flow() {
        let motor = kndx_motor();
        let solver = ChamberStateSolver::new(&motor, SEA_LEVEL_PRESSURE);
        let depths = [0.0];

        let equilibrium = solver.equilibrium_pressure(&depths).unwrap();
        let snapshot = solver.snapshot(equilibrium, &depths);
        assert_relative_eq!(
            snapshot.mass_generation,
            solver.nozzle_mass_flow(equilibrium),
            max_relative = 1e-6
        );
        assert!(equilibrium > 1.3e6 && equilibrium < 1.6e6, "Pc = {}", equilibrium);
    }

    #[test]
    fn test_equilibrium_follows_kn_and_vanishes_at_burnout() {
        let motor = kndx_motor();
        let solver = ChamberStateSolver::new(&motor, SEA_LEVEL_PRESSURE);
        let burnout = motor.grains()[0].burnout_depth();

        let ignition = solver.equilibrium_pressure(&[0.0]).unwrap();
        let late = solver.equilibrium_pressure(&[0.9 * burnout]).unwrap();
        assert!(motor.kn(&[0.9 * burnout]) > motor.kn(&[0.0]));
        assert!(late > ignition, "{late} <= {ignition}");

        let snapshot = solver.snapshot(ignition, &[0.0]);
        assert!(solver.pressure_derivative(0.9 * ignition, &snapshot) > 0.0);
        assert!(solver.pressure_derivative(1.1 * ignition, &snapshot) < 0.0);

        assert_eq!(solver.equilibrium_pressure(&[burnout]), None);
    }

    #[test]
    fn test_oversized_step_diverges() {
        let motor = kndx_motor();
        let solver = ChamberStateSolver::new(&motor, SEA_LEVEL_PRESSURE);
        let error = solver
            .advance(0.0, SEA_LEVEL_PRESSURE, &[0.0], 0.05)
            .unwrap_err();
        assert!(matches!(error, SimulationError::SimulationDiverged { .. }));
    }
}
