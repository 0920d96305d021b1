use crate::constants::{
    AIR_GAS_CONSTANT, AIR_HEAT_CAPACITY_RATIO, ATMOSPHERE_HEIGHT, EARTH_RADIUS, GRAVITY,
    SEA_LEVEL_PRESSURE, SEA_LEVEL_TEMPERATURE, TROPOSPHERE_HEIGHT, TROPOSPHERE_TEMP_GRADIENT,
};

// International Standard Atmosphere layers: (base altitude m, base temperature K, lapse K/m)
const ISA_LAYERS: [(f64, f64, f64); 7] = [
    (0.0, SEA_LEVEL_TEMPERATURE, TROPOSPHERE_TEMP_GRADIENT),
    (TROPOSPHERE_HEIGHT, 216.65, 0.0),
    (20_000.0, 216.65, 1.0e-3),
    (32_000.0, 228.65, 2.8e-3),
    (47_000.0, 270.65, 0.0),
    (51_000.0, 270.65, -2.8e-3),
    (71_000.0, 214.65, -2.0e-3),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    pub altitude: f64,    // m
    pub air_density: f64, // kg/m³
    pub temperature: f64, // K
    pub pressure: f64,    // Pa
    pub gravity: f64,     // m/s²
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment::at_altitude(0.0)
    }

    pub fn at_altitude(altitude: f64) -> Self {
        let mut environment = Environment {
            altitude,
            air_density: 0.0,
            temperature: SEA_LEVEL_TEMPERATURE,
            pressure: SEA_LEVEL_PRESSURE,
            gravity: GRAVITY,
        };
        environment.update(altitude);
        environment
    }

    pub fn update(&mut self, altitude: f64) {
        self.altitude = altitude;
        self.gravity = gravity_at_altitude(altitude);

        if self.is_in_atmosphere() {
            self.update_atmospheric_conditions(altitude.max(0.0));
        } else {
            self.update_space_conditions();
        }
    }

    pub fn is_in_atmosphere(&self) -> bool {
        self.altitude < ATMOSPHERE_HEIGHT
    }

    pub fn speed_of_sound(&self) -> f64 {
        (AIR_HEAT_CAPACITY_RATIO * AIR_GAS_CONSTANT * self.temperature).sqrt()
    }

    fn update_atmospheric_conditions(&mut self, altitude: f64) {
        let exponent = GRAVITY / AIR_GAS_CONSTANT;
        let mut base_pressure = SEA_LEVEL_PRESSURE;

        for (index, &(base_altitude, base_temperature, lapse)) in ISA_LAYERS.iter().enumerate() {
            let top = ISA_LAYERS
                .get(index + 1)
                .map_or(ATMOSPHERE_HEIGHT, |layer| layer.0);
            let height = altitude.min(top) - base_altitude;
            let temperature = base_temperature + lapse * height;
            let pressure = if lapse == 0.0 {
                base_pressure * (-exponent * height / base_temperature).exp()
            } else {
                base_pressure * (base_temperature / temperature).powf(exponent / lapse)
            };

            if altitude <= top {
                self.temperature = temperature;
                self.pressure = pressure;
                break;
            }
            base_pressure = pressure;
        }

        self.air_density = self.pressure / (AIR_GAS_CONSTANT * self.temperature);
    }

    // Temperature stays at the top of the modelled atmosphere.
    fn update_space_conditions(&mut self) {
        self.air_density = 0.0;
        self.pressure = 0.0;
        self.temperature = layer_temperature_at_ceiling();
    }
}

fn layer_temperature_at_ceiling() -> f64 {
    let (base_altitude, base_temperature, lapse) = ISA_LAYERS[ISA_LAYERS.len() - 1];
    base_temperature + lapse * (ATMOSPHERE_HEIGHT - base_altitude)
}

pub fn gravity_at_altitude(altitude: f64) -> f64 {
    GRAVITY * (EARTH_RADIUS / (EARTH_RADIUS + altitude.max(0.0))).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sea_level_conditions() {
        let environment = Environment::new();

        assert_abs_diff_eq!(environment.temperature, 288.15, epsilon = 0.1); // 15°C
        assert_abs_diff_eq!(environment.pressure, 101_325.0, epsilon = 1.0); // Pa
        assert_abs_diff_eq!(environment.air_density, 1.225, epsilon = 0.01); // kg/m³
        assert_abs_diff_eq!(environment.speed_of_sound(), 340.3, epsilon = 0.1); // m/s
    }

    #[test]
    fn test_tropopause_conditions() {
        let environment = Environment::at_altitude(11_000.0);

        assert_abs_diff_eq!(environment.temperature, 216.65, epsilon = 0.1);
        assert_abs_diff_eq!(environment.pressure, 22_632.0, epsilon = 5.0);
        assert_abs_diff_eq!(environment.air_density, 0.3639, epsilon = 0.01);
    }

    #[test]
    fn test_stratosphere_conditions() {
        let environment = Environment::at_altitude(30_000.0);

        assert_abs_diff_eq!(environment.temperature, 226.65, epsilon = 0.1);
        assert_abs_diff_eq!(environment.pressure, 1_171.9, epsilon = 5.0);
        assert!(environment.air_density > 0.0 && environment.air_density < 0.3639);
    }

    #[test]
    fn test_pressure_decreases_monotonically() {
        let mut previous = Environment::new().pressure;
        for step in 1..80 {
            let pressure = Environment::at_altitude(step as f64 * 1_000.0 - 1.0).pressure;
            assert!(pressure < previous, "pressure rose at {} km", step);
            previous = pressure;
        }
    }

    #[test]
    fn test_space_conditions() {
        let environment = Environment::at_altitude(500_000.0);

        assert!(!environment.is_in_atmosphere());
        assert_abs_diff_eq!(environment.pressure, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(environment.air_density, 0.0, epsilon = 1e-10);
        assert_abs_diff_eq!(environment.temperature, 196.65, epsilon = 1e-9);
    }

    #[test]
    fn test_gravity_variation_with_altitude() {
        let sea_level = Environment::new().gravity;
        let high = Environment::at_altitude(100_000.0).gravity;

        assert!(high < sea_level);
        let expected_ratio = (EARTH_RADIUS / (EARTH_RADIUS + 100_000.0)).powi(2);
        assert_abs_diff_eq!(high / sea_level, expected_ratio, epsilon = 1e-12);
    }

    #[test]
    fn test_update_matches_fresh_environment() {
        let mut environment = Environment::new();
        environment.update(3_000.0);
        assert_eq!(environment, Environment::at_altitude(3_000.0));
    }
}
