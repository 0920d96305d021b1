use serde::Serialize;

use crate::trajectory_system::environment::{gravity_at_altitude, Environment};
use crate::trajectory_system::vehicle::{Recovery, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    OnPad,
    PoweredAscent,
    Coasting,
    Descent,
    Landed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryStage {
    Stowed,
    Drogue,
    Main,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryState {
    pub time: f64,         // s
    pub altitude: f64,     // m above the launch site
    pub velocity: f64,     // m/s, positive up
    pub acceleration: f64, // m/s²
    pub mass: f64,         // kg
    pub mach: f64,
    pub phase: FlightPhase,
    pub recovery: RecoveryStage,
    pub apogee_time: Option<f64>,
}

impl TrajectoryState {
    pub fn is_airborne(&self) -> bool {
        !matches!(self.phase, FlightPhase::OnPad | FlightPhase::Landed)
    }

    pub fn has_landed(&self) -> bool {
        self.phase == FlightPhase::Landed
    }
}

pub struct TrajectorySimulator<'a> {
    vehicle: &'a Vehicle,
}

impl<'a> TrajectorySimulator<'a> {
    pub fn new(vehicle: &'a Vehicle) -> Self {
        TrajectorySimulator { vehicle }
    }

    pub fn initial_state(&self, propellant_mass: f64) -> TrajectoryState {
        TrajectoryState {
            time: 0.0,
            altitude: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            mass: self.vehicle.dry_mass + propellant_mass,
            mach: 0.0,
            phase: FlightPhase::OnPad,
            recovery: RecoveryStage::Stowed,
            apogee_time: None,
        }
    }

    // Advances `previous` by `delta_time` under `thrust`. The vehicle mass of
    // `previous` is used through the step; `propellant_mass` is what remains
    // in the motor at its end.
    pub fn step(
        &self,
        previous: &TrajectoryState,
        thrust: f64,
        propellant_mass: f64,
        delta_time: f64,
    ) -> TrajectoryState {
        let time = previous.time + delta_time;
        let mass = self.vehicle.dry_mass + propellant_mass;

        let resting = TrajectoryState {
            time,
            altitude: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            mass,
            mach: 0.0,
            ..previous.clone()
        };

        match previous.phase {
            FlightPhase::Landed => return resting,
            FlightPhase::OnPad if thrust <= previous.mass * gravity_at_altitude(0.0) => {
                return resting
            }
            _ => {}
        }

        let drag_area = self.drag_area(previous.recovery);
        let held_mass = previous.mass;
        let derivatives = |(altitude, velocity): (f64, f64)| {
            (
                velocity,
                self.calculate_acceleration(altitude, velocity, thrust, held_mass, drag_area),
            )
        };

        let initial_state = (previous.altitude, previous.velocity);
        let k1 = derivatives(initial_state);
        let k2 = derivatives((
            initial_state.0 + k1.0 * (delta_time / 2.0),
            initial_state.1 + k1.1 * (delta_time / 2.0),
        ));
        let k3 = derivatives((
            initial_state.0 + k2.0 * (delta_time / 2.0),
            initial_state.1 + k2.1 * (delta_time / 2.0),
        ));
        let k4 = derivatives((
            initial_state.0 + k3.0 * delta_time,
            initial_state.1 + k3.1 * delta_time,
        ));

        let altitude =
            initial_state.0 + (delta_time / 6.0) * (k1.0 + 2.0 * k2.0 + 2.0 * k3.0 + k4.0);
        let velocity =
            initial_state.1 + (delta_time / 6.0) * (k1.1 + 2.0 * k2.1 + 2.0 * k3.1 + k4.1);

        // once the vehicle stops climbing it is descending for good
        let phase = if previous.phase == FlightPhase::Descent || velocity <= 0.0 {
            FlightPhase::Descent
        } else if thrust > 0.0 {
            FlightPhase::PoweredAscent
        } else {
            FlightPhase::Coasting
        };
        let apogee_time = match previous.apogee_time {
            None if phase == FlightPhase::Descent => Some(time),
            recorded => recorded,
        };

        if phase == FlightPhase::Descent && altitude <= 0.0 {
            return TrajectoryState {
                phase: FlightPhase::Landed,
                apogee_time,
                ..resting
            };
        }

        let recovery = match &self.vehicle.recovery {
            Some(recovery) => next_recovery_stage(
                recovery,
                previous.recovery,
                phase,
                time,
                altitude,
                apogee_time,
            ),
            None => RecoveryStage::Stowed,
        };

        let environment = Environment::at_altitude(altitude);
        TrajectoryState {
            time,
            altitude,
            velocity,
            acceleration: self.calculate_acceleration(
                altitude, velocity, thrust, held_mass, drag_area,
            ),
            mass,
            mach: velocity.abs() / environment.speed_of_sound(),
            phase,
            recovery,
            apogee_time,
        }
    }

    pub fn drag_area(&self, stage: RecoveryStage) -> f64 {
        let body = self.vehicle.aerodynamics.drag_area();
        let Some(recovery) = &self.vehicle.recovery else {
            return body;
        };

        let drogue = recovery.drogue.as_ref().map_or(0.0, |chute| chute.drag_area());
        let main = recovery.main.as_ref().map_or(0.0, |chute| chute.drag_area());
        match stage {
            RecoveryStage::Stowed => body,
            RecoveryStage::Drogue => body + drogue,
            RecoveryStage::Main => body + drogue + main,
        }
    }

    fn calculate_acceleration(
        &self,
        altitude: f64,
        velocity: f64,
        thrust: f64,
        mass: f64,
        drag_area: f64,
    ) -> f64 {
        let environment = Environment::at_altitude(altitude);
        let drag = self
            .vehicle
            .aerodynamics
            .calculate_drag(velocity, drag_area, &environment);
        (thrust + drag) / mass - environment.gravity
    }
}

fn next_recovery_stage(
    recovery: &Recovery,
    current: RecoveryStage,
    phase: FlightPhase,
    time: f64,
    altitude: f64,
    apogee_time: Option<f64>,
) -> RecoveryStage {
    if phase != FlightPhase::Descent {
        return current;
    }

    let main_due = recovery.main.is_some() && altitude <= recovery.main_deploy_altitude;
    let drogue_due = recovery.drogue.is_some()
        && apogee_time.map_or(false, |apogee| time >= apogee + recovery.drogue_delay);

    let due = if main_due {
        RecoveryStage::Main
    } else if drogue_due {
        RecoveryStage::Drogue
    } else {
        RecoveryStage::Stowed
    };
    current.max(due)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory_system::aerodynamics::{Aerodynamics, Parachute};
    use approx::assert_relative_eq;

    fn create_test_vehicle() -> Vehicle {
        Vehicle::new(10.0, Aerodynamics::new(0.5, 0.08).unwrap()).unwrap()
    }

    fn airborne_state(altitude: f64, velocity: f64) -> TrajectoryState {
        TrajectoryState {
            altitude,
            velocity,
            phase: FlightPhase::Coasting,
            ..TrajectorySimulator::new(&create_test_vehicle()).initial_state(0.0)
        }
    }

    #[test]
    fn test_vehicle_stays_on_pad_without_enough_thrust() {
        let vehicle = create_test_vehicle();
        let simulator = TrajectorySimulator::new(&vehicle);
        let initial = simulator.initial_state(1.0);
        assert_relative_eq!(initial.mass, 11.0);

        // 11 kg weigh about 108 N
        let state = simulator.step(&initial, 100.0, 0.99, 0.01);
        assert_eq!(state.phase, FlightPhase::OnPad);
        assert_eq!(state.altitude, 0.0);
        assert_eq!(state.velocity, 0.0);
        assert_relative_eq!(state.mass, 10.99, epsilon = 1e-12);
        assert_relative_eq!(state.time, 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_liftoff_with_thrust() {
        let vehicle = create_test_vehicle();
        let simulator = TrajectorySimulator::new(&vehicle);
        let mut state = simulator.initial_state(1.0);

        for _ in 0..100 {
            state = simulator.step(&state, 500.0, 1.0, 0.01);
        }

        assert_eq!(state.phase, FlightPhase::PoweredAscent);
        assert!(
            state.altitude > 0.0 && state.velocity > 0.0,
            "Vehicle should climb under thrust. Altitude: {}, velocity: {}",
            state.altitude,
            state.velocity
        );
        assert!(state.mach > 0.0);
    }

    #[test]
    fn test_free_fall_from_rest() {
        let vehicle = create_test_vehicle();
        let simulator = TrajectorySimulator::new(&vehicle);
        let mut state = TrajectoryState {
            mass: 10.0,
            ..airborne_state(100.0, 0.0)
        };

        for _ in 0..10 {
            state = simulator.step(&state, 0.0, 0.0, 0.1);
        }

        // one second of fall, drag is small at these speeds
        assert!(
            state.velocity < -9.5 && state.velocity > -9.81,
            "Velocity: {}",
            state.velocity
        );
        assert!(
            state.altitude < 95.2 && state.altitude > 95.0,
            "Altitude: {}",
            state.altitude
        );
    }

    #[test]
    fn test_apogee_starts_descent() {
        let vehicle = create_test_vehicle();
        let simulator = TrajectorySimulator::new(&vehicle);
        let mut state = TrajectoryState {
            mass: 10.0,
            ..airborne_state(500.0, 5.0)
        };

        let mut steps = 0;
        while state.phase != FlightPhase::Descent {
            state = simulator.step(&state, 0.0, 0.0, 0.01);
            steps += 1;
            assert!(steps < 1_000, "Apogee should be reached");
        }

        assert!(state.velocity <= 0.0);
        assert_eq!(state.apogee_time, Some(state.time));
        assert!(state.altitude > 500.0);
    }

    #[test]
    fn test_landing_clamps_to_ground() {
        let vehicle = create_test_vehicle();
        let simulator = TrajectorySimulator::new(&vehicle);
        let mut state = TrajectoryState {
            mass: 10.0,
            phase: FlightPhase::Descent,
            ..airborne_state(5.0, -10.0)
        };

        while !state.has_landed() {
            state = simulator.step(&state, 0.0, 0.0, 0.01);
        }
        assert_eq!(state.altitude, 0.0);
        assert_eq!(state.velocity, 0.0);

        let after = simulator.step(&state, 0.0, 0.0, 0.01);
        assert!(after.has_landed());
        assert!(!after.is_airborne());
    }

    #[test]
    fn test_recovery_deployment_sequence() {
        let vehicle = create_test_vehicle()
            .with_recovery(Recovery {
                drogue: Some(Parachute::new(1.2, 0.4).unwrap()),
                drogue_delay: 1.0,
                main: Some(Parachute::new(1.5, 1.2).unwrap()),
                main_deploy_altitude: 200.0,
            })
            .unwrap();
        let simulator = TrajectorySimulator::new(&vehicle);
        let mut state = TrajectoryState {
            mass: 10.0,
            ..airborne_state(400.0, 1.0)
        };

        let mut apogee = None;
        let mut drogue_at = None;
        let mut main_at = None;
        while !state.has_landed() {
            state = simulator.step(&state, 0.0, 0.0, 0.01);
            if apogee.is_none() {
                apogee = state.apogee_time;
            }
            if drogue_at.is_none() && state.recovery == RecoveryStage::Drogue {
                drogue_at = Some((state.time, state.altitude));
            }
            if main_at.is_none() && state.recovery == RecoveryStage::Main {
                main_at = Some((state.time, state.altitude));
            }
        }

        let apogee = apogee.unwrap();
        let (drogue_time, _) = drogue_at.unwrap();
        let (_, main_altitude) = main_at.unwrap();
        assert_relative_eq!(drogue_time, apogee + 1.0, epsilon = 0.011);
        assert!(main_altitude <= 200.0 && main_altitude > 190.0);
        assert!(simulator.drag_area(RecoveryStage::Main) > simulator.drag_area(RecoveryStage::Drogue));
    }
}
