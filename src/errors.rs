use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Lookup error: unsupported propellant '{0}'")]
    LookupError(String),

    #[error("Simulation diverged at t = {time:.4} s: {reason}")]
    SimulationDiverged { time: f64, reason: String },

    #[error("Time limit exceeded: motor did not burn out within {max_time:.3} s")]
    TimeLimitExceeded { max_time: f64 },
}

impl SimulationError {
    // True for errors raised while validating inputs, before any state exists.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            SimulationError::ConfigurationError(_) | SimulationError::LookupError(_)
        )
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        SimulationError::ConfigurationError(message.into())
    }

    pub(crate) fn diverged(time: f64, reason: impl Into<String>) -> Self {
        SimulationError::SimulationDiverged {
            time,
            reason: reason.into(),
        }
    }
}

pub(crate) fn require_positive(name: &str, value: f64) -> Result<f64, SimulationError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SimulationError::configuration(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(SimulationError::LookupError("KNXX".to_string()).is_configuration_error());
        assert!(SimulationError::configuration("bad grain").is_configuration_error());
        assert!(!SimulationError::diverged(0.1, "negative pressure").is_configuration_error());
        assert!(!SimulationError::TimeLimitExceeded { max_time: 1.0 }.is_configuration_error());
    }

    #[test]
    fn test_require_positive() {
        assert_eq!(require_positive("length", 0.15), Ok(0.15));
        assert!(require_positive("length", 0.0).is_err());
        assert!(require_positive("length", -1.0).is_err());
        assert!(require_positive("length", f64::NAN).is_err());
        assert!(require_positive("length", f64::INFINITY).is_err());
    }

    #[test]
    fn test_error_messages() {
        let error = SimulationError::diverged(1.25, "chamber pressure is not finite");
        assert_eq!(
            error.to_string(),
            "Simulation diverged at t = 1.2500 s: chamber pressure is not finite"
        );
        let error = SimulationError::LookupError("KNXX".to_string());
        assert_eq!(
            error.to_string(),
            "Lookup error: unsupported propellant 'KNXX'"
        );
    }
}
