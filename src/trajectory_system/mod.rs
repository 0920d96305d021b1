pub mod aerodynamics;
pub mod environment;
pub mod kinematics;
pub mod vehicle;
