// Physical Constants
pub const GRAVITY: f64 = 9.806_65; // m/s², standard
pub const EARTH_RADIUS: f64 = 6_371_000.0; // meters
pub const UNIVERSAL_GAS_CONSTANT: f64 = 8.314_462_618; // J/(mol·K)

// Environmental Constants
pub const SEA_LEVEL_TEMPERATURE: f64 = 288.15; // K
pub const SEA_LEVEL_PRESSURE: f64 = 101_325.0; // Pa
pub const AIR_GAS_CONSTANT: f64 = 287.05; // J/(kg·K)
pub const AIR_HEAT_CAPACITY_RATIO: f64 = 1.4;
pub const TROPOSPHERE_TEMP_GRADIENT: f64 = -6.5 / 1_000.0; // K per meter
pub const TROPOSPHERE_HEIGHT: f64 = 11_000.0; // m
pub const ATMOSPHERE_HEIGHT: f64 = 80_000.0; // m

// Unit Conversions
pub const PASCALS_PER_MEGAPASCAL: f64 = 1.0e6;
pub const PSI_PER_PASCAL: f64 = 1.450_377e-4;
pub const METERS_PER_INCH: f64 = 0.0254;
pub const METERS_PER_MILLIMETER: f64 = 1.0e-3;

// Simulation Parameters
pub const DEFAULT_TIME_STEP: f64 = 1.0e-3; // s
pub const DEFAULT_MAX_SIMULATION_TIME: f64 = 600.0; // s
pub const DEFAULT_PRESSURE_TOLERANCE: f64 = 1.0e-3; // fraction of ambient pressure

// Nozzle Defaults (a015140, page 87)
pub const DEFAULT_CONVERGENT_ANGLE: f64 = 30.0; // degrees
pub const DEFAULT_NOZZLE_C1: f64 = 0.00506;
pub const DEFAULT_NOZZLE_C2: f64 = 0.0;

// Burn profile classification band
pub const NEUTRAL_BURN_TOLERANCE: f64 = 0.02;
