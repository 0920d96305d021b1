use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::constants::{
    DEFAULT_MAX_SIMULATION_TIME, DEFAULT_PRESSURE_TOLERANCE, DEFAULT_TIME_STEP,
    SEA_LEVEL_PRESSURE,
};
use crate::errors::{require_positive, SimulationError};
use crate::motor::chamber::ChamberStateSolver;
use crate::motor::nozzle::NozzleFlow;
use crate::motor::thrust::ThrustCalculator;
use crate::motor::Motor;
use crate::simulation::state::{SimulationOutcome, SimulationResult, SimulationState};
use crate::trajectory_system::kinematics::{FlightPhase, TrajectorySimulator, TrajectoryState};
use crate::trajectory_system::vehicle::Vehicle;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_time_step")]
    pub time_step: f64, // s
    #[serde(default = "default_max_time")]
    pub max_time: f64, // s
    #[serde(default)]
    pub max_steps: Option<usize>,
    #[serde(default = "default_ambient_pressure")]
    pub ambient_pressure: f64, // Pa
    #[serde(default)]
    pub igniter_pressure: Option<f64>, // Pa
    #[serde(default = "default_pressure_tolerance")]
    pub pressure_tolerance: f64, // fraction of ambient pressure
}

fn default_time_step() -> f64 {
    DEFAULT_TIME_STEP
}

fn default_max_time() -> f64 {
    DEFAULT_MAX_SIMULATION_TIME
}

fn default_ambient_pressure() -> f64 {
    SEA_LEVEL_PRESSURE
}

fn default_pressure_tolerance() -> f64 {
    DEFAULT_PRESSURE_TOLERANCE
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            time_step: DEFAULT_TIME_STEP,
            max_time: DEFAULT_MAX_SIMULATION_TIME,
            max_steps: None,
            ambient_pressure: SEA_LEVEL_PRESSURE,
            igniter_pressure: None,
            pressure_tolerance: DEFAULT_PRESSURE_TOLERANCE,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> Result<(), SimulationError> {
        require_positive("time step", self.time_step)?;
        require_positive("maximum simulation time", self.max_time)?;
        require_positive("ambient pressure", self.ambient_pressure)?;
        require_positive("pressure tolerance", self.pressure_tolerance)?;
        if self.max_steps == Some(0) {
            return Err(SimulationError::configuration(
                "maximum step count must be at least one",
            ));
        }
        if let Some(igniter) = self.igniter_pressure {
            if !(igniter.is_finite() && igniter >= self.ambient_pressure) {
                return Err(SimulationError::configuration(format!(
                    "igniter pressure ({igniter} Pa) must not be below the ambient pressure ({} Pa)",
                    self.ambient_pressure
                )));
            }
        }
        Ok(())
    }

    pub fn initial_pressure(&self) -> f64 {
        self.igniter_pressure.unwrap_or(self.ambient_pressure)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationFrame {
    pub motor: SimulationState,
    pub trajectory: Option<TrajectoryState>,
}

#[derive(Debug, Clone)]
pub struct SimulationOrchestrator {
    motor: Motor,
    vehicle: Option<Vehicle>,
    settings: SimulationSettings,
}

impl SimulationOrchestrator {
    pub fn new(
        motor: Motor,
        vehicle: Option<Vehicle>,
        settings: SimulationSettings,
    ) -> Result<Self, SimulationError> {
        settings.validate()?;
        Ok(SimulationOrchestrator {
            motor,
            vehicle,
            settings,
        })
    }

    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let motor = config.motor.build()?;
        let vehicle = config
            .vehicle
            .as_ref()
            .map(|vehicle| vehicle.build())
            .transpose()?;
        SimulationOrchestrator::new(motor, vehicle, config.settings.clone())
    }

    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    pub fn vehicle(&self) -> Option<&Vehicle> {
        self.vehicle.as_ref()
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    pub fn initial_state(&self) -> SimulationFrame {
        let motor = self.motor_state(
            0.0,
            self.settings.initial_pressure(),
            self.motor.initial_burn_depths(),
        );
        let trajectory = self
            .vehicle
            .as_ref()
            .map(|vehicle| TrajectorySimulator::new(vehicle).initial_state(motor.propellant_mass));
        SimulationFrame { motor, trajectory }
    }

    // Computes the frame one time step after `previous`. Depends on nothing
    // but `previous` and the configuration.
    pub fn step(&self, previous: &SimulationFrame) -> Result<SimulationFrame, SimulationError> {
        let dt = self.settings.time_step;
        let state = &previous.motor;
        let time = state.time + dt;

        let motor = if state.tail_off_complete {
            self.quiescent_state(time, state.burn_depths.clone())
        } else {
            let solver = ChamberStateSolver::new(&self.motor, self.settings.ambient_pressure);
            let chamber = solver.advance(state.time, state.chamber_pressure, &state.burn_depths, dt)?;
            if self.motor.is_burned_out(&chamber.burn_depths)
                && chamber.pressure - self.settings.ambient_pressure
                    <= self.settings.pressure_tolerance * self.settings.ambient_pressure
            {
                self.quiescent_state(time, chamber.burn_depths)
            } else {
                self.motor_state(time, chamber.pressure, chamber.burn_depths)
            }
        };

        let trajectory = match (&self.vehicle, &previous.trajectory) {
            (Some(vehicle), Some(flight)) => Some(TrajectorySimulator::new(vehicle).step(
                flight,
                state.thrust,
                motor.propellant_mass,
                dt,
            )),
            _ => None,
        };

        Ok(SimulationFrame { motor, trajectory })
    }

    pub fn run(&self) -> Result<SimulationResult, SimulationError> {
        info!(
            "Starting simulation: {} grain(s) of {}, throat {:.2} mm, dt = {} s",
            self.motor.grain_count(),
            self.motor.propellant.id,
            self.motor.nozzle.throat_diameter * 1.0e3,
            self.settings.time_step
        );

        let mut frame = self.initial_state();
        let mut motor_states = vec![frame.motor.clone()];
        let mut trajectory: Option<Vec<TrajectoryState>> =
            frame.trajectory.clone().map(|state| vec![state]);
        let mut warned_out_of_table = false;
        let mut steps = 0usize;
        let max_steps = self.settings.max_steps.unwrap_or(usize::MAX);

        let outcome = loop {
            if frame.motor.tail_off_complete {
                match &frame.trajectory {
                    None => break SimulationOutcome::MotorOnly,
                    Some(flight) if flight.has_landed() => {
                        break SimulationOutcome::Landed {
                            landing_time: flight.time,
                        }
                    }
                    Some(flight) if flight.phase == FlightPhase::OnPad => {
                        break SimulationOutcome::NoLiftoff
                    }
                    Some(_) => {}
                }
            }

            if steps >= max_steps
                || frame.motor.time >= self.settings.max_time - 0.5 * self.settings.time_step
            {
                if !frame.motor.tail_off_complete {
                    let max_time = if steps >= max_steps {
                        frame.motor.time
                    } else {
                        self.settings.max_time
                    };
                    return Err(SimulationError::TimeLimitExceeded { max_time });
                }
                let (time, altitude) = frame
                    .trajectory
                    .as_ref()
                    .map_or((frame.motor.time, 0.0), |flight| (flight.time, flight.altitude));
                warn!(
                    "Vehicle still airborne at {:.1} m when the {:.1} s limit was reached",
                    altitude, time
                );
                break SimulationOutcome::TrajectoryIncomplete { time, altitude };
            }

            let next = self.step(&frame)?;
            steps += 1;

            if !warned_out_of_table && self.outside_burn_rate_data(next.motor.chamber_pressure) {
                warn!(
                    "Chamber pressure {:.2} MPa at t = {:.3} s is above the tabulated burn rate data",
                    next.motor.chamber_pressure / 1.0e6,
                    next.motor.time
                );
                warned_out_of_table = true;
            }
            if next.motor.burned_out && !frame.motor.burned_out {
                debug!("Grains burned out at t = {:.3} s", next.motor.time);
            }
            if next.motor.tail_off_complete && !frame.motor.tail_off_complete {
                debug!("Tail-off complete at t = {:.3} s", next.motor.time);
            }
            if let (Some(before), Some(after)) = (&frame.trajectory, &next.trajectory) {
                if before.phase != after.phase {
                    debug!(
                        "Flight phase {:?} -> {:?} at t = {:.3} s, altitude {:.1} m",
                        before.phase, after.phase, after.time, after.altitude
                    );
                }
            }

            motor_states.push(next.motor.clone());
            if let (Some(states), Some(state)) = (trajectory.as_mut(), next.trajectory.clone()) {
                states.push(state);
            }
            frame = next;
        };

        info!(
            "Simulation finished after {} steps ({:.3} s): {:?}",
            steps, frame.motor.time, outcome
        );

        Ok(SimulationResult {
            motor_states,
            trajectory,
            outcome,
        })
    }

    fn outside_burn_rate_data(&self, pressure: f64) -> bool {
        self.motor
            .segments()
            .any(|(_, propellant)| !propellant.is_within_burn_rate_data(pressure))
    }

    fn motor_state(&self, time: f64, pressure: f64, burn_depths: Vec<f64>) -> SimulationState {
        let ambient = self.settings.ambient_pressure;
        let snapshot = ChamberStateSolver::new(&self.motor, ambient).snapshot(pressure, &burn_depths);
        let thrust = ThrustCalculator::new(NozzleFlow::new(&self.motor.nozzle, self.motor.propellant))
            .evaluate(pressure, ambient, snapshot.free_volume, time);

        SimulationState {
            time,
            chamber_pressure: pressure,
            propellant_mass: snapshot.propellant_mass,
            mass_generation: snapshot.mass_generation,
            nozzle_mass_flow: thrust.mass_flow,
            burn_area: snapshot.burn_area,
            kn: snapshot.burn_area / self.motor.throat_area(),
            mass_flux: snapshot.max_mass_flux,
            thrust: thrust.thrust,
            thrust_coefficient: thrust.thrust_coefficient,
            exit_pressure: thrust.exit_pressure,
            nozzle_efficiency: thrust.efficiency,
            burned_out: self.motor.is_burned_out(&burn_depths),
            tail_off_complete: false,
            burn_depths,
        }
    }

    fn quiescent_state(&self, time: f64, burn_depths: Vec<f64>) -> SimulationState {
        let ambient = self.settings.ambient_pressure;
        SimulationState {
            time,
            chamber_pressure: ambient,
            propellant_mass: self.motor.propellant_mass(&burn_depths),
            mass_generation: 0.0,
            nozzle_mass_flow: 0.0,
            burn_area: 0.0,
            kn: 0.0,
            mass_flux: 0.0,
            thrust: 0.0,
            thrust_coefficient: 0.0,
            exit_pressure: ambient,
            nozzle_efficiency: 0.0,
            burned_out: true,
            tail_off_complete: true,
            burn_depths,
        }
    }
}
