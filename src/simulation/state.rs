use serde::Serialize;

use crate::trajectory_system::kinematics::TrajectoryState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationState {
    pub time: f64,               // s
    pub burn_depths: Vec<f64>,   // m, per grain
    pub chamber_pressure: f64,   // Pa
    pub propellant_mass: f64,    // kg
    pub mass_generation: f64,    // kg/s
    pub nozzle_mass_flow: f64,   // kg/s
    pub burn_area: f64,          // m²
    pub kn: f64,
    pub mass_flux: f64,          // kg/(s·m²), largest port flux
    pub thrust: f64,             // N
    pub thrust_coefficient: f64,
    pub exit_pressure: f64,      // Pa
    pub nozzle_efficiency: f64,
    pub burned_out: bool,
    pub tail_off_complete: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SimulationOutcome {
    MotorOnly,
    Landed { landing_time: f64 },
    NoLiftoff,
    TrajectoryIncomplete { time: f64, altitude: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub motor_states: Vec<SimulationState>,
    pub trajectory: Option<Vec<TrajectoryState>>,
    pub outcome: SimulationOutcome,
}

impl SimulationResult {
    pub fn final_motor_state(&self) -> Option<&SimulationState> {
        self.motor_states.last()
    }

    pub fn is_complete(&self) -> bool {
        !matches!(self.outcome, SimulationOutcome::TrajectoryIncomplete { .. })
    }
}
