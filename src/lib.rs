pub mod config;
pub mod constants;
pub mod errors;
pub mod motor;
pub mod simulation;
pub mod telemetry_system;
pub mod trajectory_system;
pub mod utils;

pub use config::{load_config, ConfigError, SimulationConfig};
pub use errors::SimulationError;

// Re-export commonly used items from motor
pub use motor::grain::{Grain, InhibitedFaces};
pub use motor::nozzle::Nozzle;
pub use motor::propellant::{Propellant, PropellantId};
pub use motor::Motor;

// Re-export commonly used items from simulation
pub use simulation::batch::{run_batch, Dispersion, MonteCarlo, MonteCarloReport};
pub use simulation::orchestrator::{SimulationFrame, SimulationOrchestrator, SimulationSettings};
pub use simulation::state::{SimulationOutcome, SimulationResult, SimulationState};

// Re-export commonly used items from trajectory_system
pub use trajectory_system::aerodynamics::Aerodynamics;
pub use trajectory_system::kinematics::{FlightPhase, TrajectoryState};
pub use trajectory_system::vehicle::Vehicle;

// Re-export commonly used items from telemetry_system
pub use telemetry_system::telemetry::Telemetry;
