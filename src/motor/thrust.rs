use serde::Serialize;

use crate::motor::nozzle::{CorrectionFactors, NozzleFlow};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThrustSample {
    pub thrust: f64,             // N
    pub mass_flow: f64,          // kg/s
    pub exit_pressure: f64,      // Pa
    pub exhaust_velocity: f64,   // m/s
    pub thrust_coefficient: f64, // F / (P * At)
    pub corrections: CorrectionFactors,
    pub efficiency: f64,
}

pub struct ThrustCalculator<'a> {
    flow: NozzleFlow<'a>,
}

impl<'a> ThrustCalculator<'a> {
    pub fn new(flow: NozzleFlow<'a>) -> Self {
        ThrustCalculator { flow }
    }

    pub fn evaluate(
        &self,
        chamber_pressure: f64,
        ambient_pressure: f64,
        free_volume: f64,
        time: f64,
    ) -> ThrustSample {
        let corrections =
            self.flow
                .correction_factors(chamber_pressure, ambient_pressure, free_volume, time);
        let efficiency = corrections.combined();

        if !(chamber_pressure > ambient_pressure) {
            return ThrustSample {
                thrust: 0.0,
                mass_flow: 0.0,
                exit_pressure: ambient_pressure,
                exhaust_velocity: 0.0,
                thrust_coefficient: 0.0,
                corrections,
                efficiency,
            };
        }

        let nozzle = self.flow.nozzle();
        let mass_flow = self.flow.mass_flow(chamber_pressure, ambient_pressure);
        let exit_pressure = self.flow.exit_pressure(chamber_pressure, ambient_pressure);
        let exhaust_velocity = self.flow.exhaust_velocity(chamber_pressure, exit_pressure);

        let momentum_thrust = mass_flow * exhaust_velocity;
        let pressure_thrust = (exit_pressure - ambient_pressure) * nozzle.exit_area();
        let thrust = (efficiency * (momentum_thrust + pressure_thrust)).max(0.0);

        ThrustSample {
            thrust,
            mass_flow,
            exit_pressure,
            exhaust_velocity,
            thrust_coefficient: thrust / (chamber_pressure * nozzle.throat_area()),
            corrections,
            efficiency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SEA_LEVEL_PRESSURE;
    use crate::motor::nozzle::Nozzle;
    use crate::motor::propellant::{Propellant, PropellantId};
    use approx::assert_relative_eq;

    fn sample(chamber_pressure: f64) -> ThrustSample {
        let nozzle = Nozzle::new(0.010, 0.025, 12.0).unwrap();
        let propellant = Propellant::by_id(PropellantId::Kndx);
        let calculator = ThrustCalculator::new(NozzleFlow::new(&nozzle, propellant));
        calculator.evaluate(chamber_pressure, SEA_LEVEL_PRESSURE, 5.0e-4, 0.5)
    }

    #[test]
    fn test_no_thrust_at_or_below_ambient() {
        for pressure in [SEA_LEVEL_PRESSURE, 90_000.0] {
            let result = sample(pressure);
            assert_eq!(result.thrust, 0.0);
            assert_eq!(result.mass_flow, 0.0);
            assert_eq!(result.thrust_coefficient, 0.0);
        }
    }

    #[test]
    fn test_choked_thrust_is_plausible() {
        let result = sample(5.0e6);
        let throat_area = std::f64::consts::PI / 4.0 * 0.010_f64.powi(2);
        // thrust coefficient of a small KN nozzle at 5 MPa
        assert!(
            result.thrust_coefficient > 1.1 && result.thrust_coefficient < 1.7,
            "Cf = {}",
            result.thrust_coefficient
        );
        assert_relative_eq!(
            result.thrust,
            result.thrust_coefficient * 5.0e6 * throat_area,
            max_relative = 1e-12
        );
        assert!(result.exhaust_velocity > 1000.0 && result.exhaust_velocity < 2000.0);
        assert!(result.efficiency > 0.0 && result.efficiency <= 1.0);
    }

    #[test]
    fn test_thrust_grows_with_pressure() {
        let low = sample(2.0e6);
        let high = sample(6.0e6);
        assert!(high.thrust > low.thrust);
        assert!(high.mass_flow > low.mass_flow);
    }

    #[test]
    fn test_subsonic_flow_has_no_pressure_thrust() {
        let result = sample(1.2e5);
        assert_eq!(result.exit_pressure, SEA_LEVEL_PRESSURE);
        assert!(result.thrust > 0.0);
        assert_relative_eq!(
            result.thrust,
            result.efficiency * result.mass_flow * result.exhaust_velocity,
            max_relative = 1e-12
        );
    }
}
