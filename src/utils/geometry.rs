use std::f64::consts::PI;

pub fn circle_area(diameter: f64) -> f64 {
    0.25 * PI * diameter.powi(2)
}

pub fn cylinder_volume(diameter: f64, length: f64) -> f64 {
    circle_area(diameter) * length
}

pub fn hollow_cylinder_volume(outer_diameter: f64, inner_diameter: f64, length: f64) -> f64 {
    0.25 * PI * (outer_diameter.powi(2) - inner_diameter.powi(2)) * length
}
