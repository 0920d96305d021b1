use std::fmt;

use serde::Serialize;

use crate::constants::{GRAVITY, NEUTRAL_BURN_TOLERANCE, PASCALS_PER_MEGAPASCAL};
use crate::motor::nozzle::optimal_expansion_ratio;
use crate::motor::structure::StructuralMargins;
use crate::motor::Motor;
use crate::simulation::orchestrator::SimulationSettings;
use crate::simulation::state::{SimulationResult, SimulationState};
use crate::trajectory_system::kinematics::{FlightPhase, TrajectoryState};
use crate::trajectory_system::vehicle::Vehicle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnProfile {
    Progressive,
    Regressive,
    Neutral,
}

impl BurnProfile {
    pub fn from_area_ratio(ratio: f64) -> Self {
        if ratio > 1.0 + NEUTRAL_BURN_TOLERANCE {
            BurnProfile::Progressive
        } else if ratio < 1.0 - NEUTRAL_BURN_TOLERANCE {
            BurnProfile::Regressive
        } else {
            BurnProfile::Neutral
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    pub initial_propellant_mass: f64, // kg
    pub burn_time: f64,               // s
    pub thrust_time: f64,             // s
    pub max_pressure: f64,            // Pa
    pub mean_pressure: f64,           // Pa
    pub max_thrust: f64,              // N
    pub mean_thrust: f64,             // N
    pub total_impulse: f64,           // N·s
    pub specific_impulse: f64,        // s
    pub mean_kn: f64,
    pub kn_ratio: f64,
    pub burn_profile: BurnProfile,
    pub volumetric_loading: f64,
    pub port_to_throat: f64,
    pub max_mass_flux: f64, // kg/(s·m²)
    pub mean_nozzle_efficiency: f64,
    pub optimal_expansion_ratio: f64,
    pub structure: Option<StructuralMargins>,
    pub flight: Option<FlightSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightSummary {
    pub apogee: f64,                          // m
    pub apogee_time: f64,                     // s
    pub max_velocity: f64,                    // m/s
    pub max_acceleration: f64,                // m/s²
    pub max_mach: f64,
    pub rail_departure_velocity: Option<f64>, // m/s
    pub flight_time: Option<f64>,             // s, liftoff excluded
}

impl Telemetry {
    pub fn from_result(
        motor: &Motor,
        vehicle: Option<&Vehicle>,
        result: &SimulationResult,
        settings: &SimulationSettings,
    ) -> Self {
        let states = &result.motor_states;
        let final_time = states.last().map_or(0.0, |state| state.time);

        let burn_time = states
            .iter()
            .find(|state| state.burned_out)
            .map_or(final_time, |state| state.time);
        let thrust_time = states
            .iter()
            .find(|state| state.tail_off_complete)
            .map_or(final_time, |state| state.time);

        let firing = firing_states(states);

        let total_impulse = integrate(states, |state| state.thrust);
        let max_pressure = states
            .iter()
            .map(|state| state.chamber_pressure)
            .fold(0.0, f64::max);
        let mean_pressure = if thrust_time > 0.0 {
            integrate(firing, |state| state.chamber_pressure) / thrust_time
        } else {
            settings.ambient_pressure
        };

        let initial_propellant_mass = motor.initial_propellant_mass();
        let specific_impulse = total_impulse / (initial_propellant_mass * GRAVITY);

        // Burning part of the run, before every grain is consumed.
        let burning: Vec<&SimulationState> =
            states.iter().take_while(|state| !state.burned_out).collect();
        let mean_kn = mean(burning.iter().map(|state| state.kn));
        let (kn_ratio, burn_profile) = match (burning.first(), burning.last()) {
            (Some(first), Some(last)) if first.burn_area > 0.0 => (
                first.kn / last.kn,
                BurnProfile::from_area_ratio(last.burn_area / first.burn_area),
            ),
            _ => (1.0, BurnProfile::Neutral),
        };

        let mean_nozzle_efficiency = mean(
            firing
                .iter()
                .filter(|state| state.thrust > 0.0)
                .map(|state| state.nozzle_efficiency),
        );

        let structure = motor.structure.as_ref().map(|structure| {
            structure.margins(
                max_pressure,
                motor.chamber_inner_diameter,
                motor.nozzle.convergent_angle,
                motor.nozzle.divergent_angle,
            )
        });

        let flight = match (vehicle, result.trajectory.as_deref()) {
            (Some(vehicle), Some(trajectory)) => FlightSummary::from_states(vehicle, trajectory),
            _ => None,
        };

        Telemetry {
            initial_propellant_mass,
            burn_time,
            thrust_time,
            max_pressure,
            mean_pressure,
            max_thrust: states.iter().map(|state| state.thrust).fold(0.0, f64::max),
            mean_thrust: if thrust_time > 0.0 {
                total_impulse / thrust_time
            } else {
                0.0
            },
            total_impulse,
            specific_impulse,
            mean_kn,
            kn_ratio,
            burn_profile,
            volumetric_loading: motor.volumetric_loading(),
            port_to_throat: motor.initial_port_to_throat(),
            max_mass_flux: states.iter().map(|state| state.mass_flux).fold(0.0, f64::max),
            mean_nozzle_efficiency,
            optimal_expansion_ratio: optimal_expansion_ratio(
                motor.propellant.k_exhaust,
                mean_pressure,
                settings.ambient_pressure,
            ),
            structure,
            flight,
        }
    }

    fn format_time(elapsed_time: f64) -> String {
        if elapsed_time >= 3600.0 {
            let hours = (elapsed_time / 3600.0).floor();
            let minutes = ((elapsed_time % 3600.0) / 60.0).floor();
            let seconds = elapsed_time % 60.0;
            format!("{:.0}h {:.0}m {:.2}s", hours, minutes, seconds)
        } else if elapsed_time >= 60.0 {
            let minutes = (elapsed_time / 60.0).floor();
            let seconds = elapsed_time % 60.0;
            format!("{:.0}m {:.2}s", minutes, seconds)
        } else {
            format!("{:.2}s", elapsed_time)
        }
    }

    fn format_altitude(altitude: f64) -> String {
        if altitude >= 1000.0 {
            format!("{:.2} km", altitude / 1000.0)
        } else {
            format!("{:.2} m", altitude)
        }
    }

    fn format_pressure(pressure: f64) -> String {
        format!("{:.3} MPa", pressure / PASCALS_PER_MEGAPASCAL)
    }
}

impl FlightSummary {
    pub fn from_states(vehicle: &Vehicle, trajectory: &[TrajectoryState]) -> Option<Self> {
        let apogee_state = trajectory
            .iter()
            .max_by(|a, b| a.altitude.total_cmp(&b.altitude))?;

        let rail_departure_velocity = trajectory
            .iter()
            .find(|state| state.is_airborne() && state.altitude >= vehicle.rail_length)
            .map(|state| state.velocity);

        let liftoff_time = trajectory
            .iter()
            .find(|state| state.phase != FlightPhase::OnPad)
            .map(|state| state.time);
        let landing_time = trajectory
            .iter()
            .find(|state| state.has_landed())
            .map(|state| state.time);

        Some(FlightSummary {
            apogee: apogee_state.altitude,
            apogee_time: apogee_state.time,
            max_velocity: trajectory.iter().map(|s| s.velocity.abs()).fold(0.0, f64::max),
            max_acceleration: trajectory.iter().map(|s| s.acceleration.abs()).fold(0.0, f64::max),
            max_mach: trajectory.iter().map(|s| s.mach).fold(0.0, f64::max),
            rail_departure_velocity,
            flight_time: liftoff_time.zip(landing_time).map(|(up, down)| down - up),
        })
    }
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Motor Performance ---")?;
        writeln!(f, "Propellant Mass: {:.3} kg", self.initial_propellant_mass)?;
        writeln!(f, "Burn Time: {}", Self::format_time(self.burn_time))?;
        writeln!(f, "Thrust Time: {}", Self::format_time(self.thrust_time))?;
        writeln!(f, "Max Pressure: {}", Self::format_pressure(self.max_pressure))?;
        writeln!(f, "Mean Pressure: {}", Self::format_pressure(self.mean_pressure))?;
        writeln!(f, "Max Thrust: {:.2} N", self.max_thrust)?;
        writeln!(f, "Mean Thrust: {:.2} N", self.mean_thrust)?;
        writeln!(f, "Total Impulse: {:.2} N·s", self.total_impulse)?;
        writeln!(f, "Specific Impulse: {:.1} s", self.specific_impulse)?;
        writeln!(f, "Mean Kn: {:.1} (initial/final {:.3})", self.mean_kn, self.kn_ratio)?;
        writeln!(f, "Burn Profile: {:?}", self.burn_profile)?;
        writeln!(f, "Volumetric Loading: {:.1} %", self.volumetric_loading * 100.0)?;
        writeln!(f, "Port to Throat: {:.2}", self.port_to_throat)?;
        writeln!(f, "Max Mass Flux: {:.1} kg/(s·m²)", self.max_mass_flux)?;
        writeln!(f, "Mean Nozzle Efficiency: {:.3}", self.mean_nozzle_efficiency)?;
        writeln!(f, "Optimal Expansion Ratio: {:.2}", self.optimal_expansion_ratio)?;

        if let Some(structure) = &self.structure {
            writeln!(f, "\n--- Structure ---")?;
            writeln!(f, "Casing Thickness: {:.2} mm", structure.casing_thickness * 1e3)?;
            writeln!(f, "Casing Safety Factor: {:.2}", structure.casing_safety_factor)?;
            writeln!(f, "Bulkhead Thickness: {:.2} mm", structure.bulkhead_thickness * 1e3)?;
            writeln!(
                f,
                "Nozzle Thickness: {:.2} mm convergent, {:.2} mm divergent",
                structure.nozzle_convergent_thickness * 1e3,
                structure.nozzle_divergent_thickness * 1e3
            )?;
            if let Some(fasteners) = &structure.fasteners {
                writeln!(
                    f,
                    "Fasteners: {} screws, safety factor {:.2}",
                    fasteners.optimal_count, fasteners.safety_factor
                )?;
            }
        }

        if let Some(flight) = &self.flight {
            writeln!(f, "\n--- Flight ---")?;
            writeln!(
                f,
                "Apogee: {} at {}",
                Self::format_altitude(flight.apogee),
                Self::format_time(flight.apogee_time)
            )?;
            writeln!(f, "Max Velocity: {:.2} m/s (Mach {:.2})", flight.max_velocity, flight.max_mach)?;
            writeln!(f, "Max Acceleration: {:.2} m/s²", flight.max_acceleration)?;
            if let Some(velocity) = flight.rail_departure_velocity {
                writeln!(f, "Rail Departure Velocity: {:.2} m/s", velocity)?;
            }
            match flight.flight_time {
                Some(time) => writeln!(f, "Flight Time: {}", Self::format_time(time))?,
                None => writeln!(f, "Flight Time: not landed")?,
            }
        }
        Ok(())
    }
}

fn firing_states(states: &[SimulationState]) -> &[SimulationState] {
    let end = states
        .iter()
        .position(|state| state.tail_off_complete)
        .map_or(states.len(), |index| index + 1);
    &states[..end]
}

fn integrate<F>(states: &[SimulationState], value: F) -> f64
where
    F: Fn(&SimulationState) -> f64,
{
    states
        .windows(2)
        .map(|pair| 0.5 * (value(&pair[0]) + value(&pair[1])) * (pair[1].time - pair[0].time))
        .sum()
}

fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::grain::{Grain, InhibitedFaces};
    use crate::motor::nozzle::Nozzle;
    use crate::motor::propellant::Propellant;
    use crate::simulation::state::SimulationOutcome;
    use crate::trajectory_system::aerodynamics::Aerodynamics;
    use crate::trajectory_system::kinematics::RecoveryStage;
    use approx::assert_relative_eq;

    fn motor() -> Motor {
        let grain = Grain::new(0.070, 0.020, 0.150, InhibitedFaces::Both).unwrap();
        Motor::new(
            Propellant::lookup("KNDX").unwrap(),
            vec![grain],
            0.072,
            0.160,
            Nozzle::new(0.010, 0.025, 12.0).unwrap(),
        )
        .unwrap()
    }

    fn state(time: f64, pressure: f64, thrust: f64, burned_out: bool, done: bool) -> SimulationState {
        SimulationState {
            time,
            burn_depths: vec![0.0],
            chamber_pressure: pressure,
            propellant_mass: 0.0,
            mass_generation: 0.0,
            nozzle_mass_flow: 0.0,
            burn_area: 0.01,
            kn: 100.0,
            mass_flux: 50.0,
            thrust,
            thrust_coefficient: 1.4,
            exit_pressure: 101_325.0,
            nozzle_efficiency: 0.9,
            burned_out,
            tail_off_complete: done,
        }
    }

    #[test]
    fn test_burn_profile_classification() {
        assert_eq!(BurnProfile::from_area_ratio(1.10), BurnProfile::Progressive);
        assert_eq!(BurnProfile::from_area_ratio(0.90), BurnProfile::Regressive);
        assert_eq!(BurnProfile::from_area_ratio(1.01), BurnProfile::Neutral);
    }

    #[test]
    fn test_impulse_is_trapezoidal() {
        let result = SimulationResult {
            motor_states: vec![
                state(0.0, 101_325.0, 0.0, false, false),
                state(1.0, 5.0e6, 200.0, false, false),
                state(2.0, 2.0e6, 100.0, true, false),
                state(3.0, 101_325.0, 0.0, true, true),
            ],
            trajectory: None,
            outcome: SimulationOutcome::MotorOnly,
        };
        let motor = motor();
        let telemetry =
            Telemetry::from_result(&motor, None, &result, &SimulationSettings::default());

        assert_relative_eq!(telemetry.total_impulse, 100.0 + 150.0 + 50.0);
        assert_relative_eq!(telemetry.burn_time, 2.0);
        assert_relative_eq!(telemetry.thrust_time, 3.0);
        assert_relative_eq!(telemetry.max_thrust, 200.0);
        assert_relative_eq!(telemetry.mean_thrust, 100.0);
        assert_relative_eq!(telemetry.max_pressure, 5.0e6);
        assert_relative_eq!(telemetry.mean_nozzle_efficiency, 0.9);
        assert_eq!(telemetry.burn_profile, BurnProfile::Neutral);
        assert!(telemetry.flight.is_none());
        assert!(telemetry.to_string().contains("Total Impulse: 300.00 N·s"));
    }

    #[test]
    fn test_flight_summary() {
        let vehicle = Vehicle::new(2.0, Aerodynamics::new(0.5, 0.05).unwrap())
            .unwrap()
            .with_rail_length(1.0)
            .unwrap();
        let point = |time: f64, altitude: f64, velocity: f64, phase: FlightPhase| TrajectoryState {
            time,
            altitude,
            velocity,
            acceleration: 0.0,
            mass: 2.0,
            mach: velocity.abs() / 340.0,
            phase,
            recovery: RecoveryStage::Stowed,
            apogee_time: None,
        };
        let trajectory = vec![
            point(0.0, 0.0, 0.0, FlightPhase::OnPad),
            point(0.5, 0.5, 10.0, FlightPhase::PoweredAscent),
            point(1.0, 2.0, 30.0, FlightPhase::PoweredAscent),
            point(4.0, 60.0, 0.0, FlightPhase::Descent),
            point(9.0, 0.0, 0.0, FlightPhase::Landed),
        ];

        let summary = FlightSummary::from_states(&vehicle, &trajectory).unwrap();
        assert_relative_eq!(summary.apogee, 60.0);
        assert_relative_eq!(summary.apogee_time, 4.0);
        assert_eq!(summary.rail_departure_velocity, Some(30.0));
        assert_eq!(summary.flight_time, Some(8.5));
        assert_relative_eq!(summary.max_velocity, 30.0);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(Telemetry::format_time(75.5), "1m 15.50s");
        assert_eq!(Telemetry::format_altitude(1500.0), "1.50 km");
        assert_eq!(Telemetry::format_pressure(5.0e6), "5.000 MPa");
    }
}
