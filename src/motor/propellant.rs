// Burn rate data gathered from Nakka and Magnus Gudnason (paper s072205).
// Thermochemical data gathered from ProPEP3.
use std::fmt;
use std::str::FromStr;

use crate::constants::{PASCALS_PER_MEGAPASCAL, METERS_PER_MILLIMETER, UNIVERSAL_GAS_CONSTANT};
use crate::errors::SimulationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropellantId {
    Kndx,
    KnsbNakka,
    Knsb,
    Knsu,
    Kner,
}

impl PropellantId {
    pub const ALL: [PropellantId; 5] = [
        PropellantId::Kndx,
        PropellantId::KnsbNakka,
        PropellantId::Knsb,
        PropellantId::Knsu,
        PropellantId::Kner,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PropellantId::Kndx => "KNDX",
            PropellantId::KnsbNakka => "KNSB-NAKKA",
            PropellantId::Knsb => "KNSB",
            PropellantId::Knsu => "KNSU",
            PropellantId::Kner => "KNER",
        }
    }

    fn table_index(&self) -> usize {
        match self {
            PropellantId::Kndx => 0,
            PropellantId::KnsbNakka => 1,
            PropellantId::Knsb => 2,
            PropellantId::Knsu => 3,
            PropellantId::Kner => 4,
        }
    }
}

impl fmt::Display for PropellantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropellantId {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let requested = s.trim();
        PropellantId::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(requested))
            .ok_or_else(|| SimulationError::LookupError(requested.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurnRateSegment {
    pub max_pressure: f64, // MPa, upper bound of the band (inclusive)
    pub a: f64,            // mm/s/MPa^n
    pub n: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Propellant {
    pub id: PropellantId,
    pub combustion_efficiency: f64,
    pub density: f64,                      // kg/m³
    pub k_chamber: f64,                    // isentropic exponent, chamber
    pub k_exhaust: f64,                    // isentropic exponent, exhaust
    pub ideal_combustion_temperature: f64, // K
    pub molar_mass_chamber: f64,           // kg/mol
    pub molar_mass_exhaust: f64,           // kg/mol
    pub isp_frozen: f64,                   // s
    pub isp_shifting: f64,                 // s
    pub condensed_moles_chamber: f64,      // mol per 100 g
    pub condensed_moles_exhaust: f64,      // mol per 100 g
    pub burn_rate_law: &'static [BurnRateSegment],
}

static KNDX_BURN_RATE: [BurnRateSegment; 5] = [
    BurnRateSegment { max_pressure: 0.779, a: 8.875, n: 0.619 },
    BurnRateSegment { max_pressure: 2.572, a: 7.553, n: -0.009 },
    BurnRateSegment { max_pressure: 5.930, a: 3.841, n: 0.688 },
    BurnRateSegment { max_pressure: 8.502, a: 17.2, n: -0.148 },
    BurnRateSegment { max_pressure: 11.20, a: 4.775, n: 0.442 },
];

static KNSB_NAKKA_BURN_RATE: [BurnRateSegment; 5] = [
    BurnRateSegment { max_pressure: 0.807, a: 10.708, n: 0.625 },
    BurnRateSegment { max_pressure: 1.503, a: 8.763, n: -0.314 },
    BurnRateSegment { max_pressure: 3.792, a: 7.852, n: -0.013 },
    BurnRateSegment { max_pressure: 7.033, a: 3.907, n: 0.535 },
    BurnRateSegment { max_pressure: 10.67, a: 9.653, n: 0.064 },
];

static KNSB_BURN_RATE: [BurnRateSegment; 1] = [BurnRateSegment {
    max_pressure: f64::INFINITY,
    a: 5.132,
    n: 0.222,
}];

static KNSU_BURN_RATE: [BurnRateSegment; 1] = [BurnRateSegment {
    max_pressure: f64::INFINITY,
    a: 8.260,
    n: 0.319,
}];

static KNER_BURN_RATE: [BurnRateSegment; 1] = [BurnRateSegment {
    max_pressure: f64::INFINITY,
    a: 2.903,
    n: 0.395,
}];

static PROPELLANTS: [Propellant; 5] = [
    Propellant {
        id: PropellantId::Kndx,
        combustion_efficiency: 0.95,
        density: 1795.0,
        k_chamber: 1.1309,
        k_exhaust: 1.1369,
        ideal_combustion_temperature: 1712.0,
        molar_mass_chamber: 42.391e-3,
        molar_mass_exhaust: 42.882e-3,
        isp_frozen: 152.4,
        isp_shifting: 154.1,
        condensed_moles_chamber: 0.307,
        condensed_moles_exhaust: 0.321,
        burn_rate_law: &KNDX_BURN_RATE,
    },
    Propellant {
        id: PropellantId::KnsbNakka,
        combustion_efficiency: 0.95,
        density: 1837.3 * 0.95,
        k_chamber: 1.1362,
        k_exhaust: 1.1484,
        ideal_combustion_temperature: 1603.0,
        molar_mass_chamber: 39.857e-3,
        molar_mass_exhaust: 40.048e-3,
        isp_frozen: 151.4,
        isp_shifting: 153.5,
        condensed_moles_chamber: 0.316,
        condensed_moles_exhaust: 0.321,
        burn_rate_law: &KNSB_NAKKA_BURN_RATE,
    },
    Propellant {
        id: PropellantId::Knsb,
        combustion_efficiency: 0.95,
        density: 1837.3 * 0.95,
        k_chamber: 1.1362,
        k_exhaust: 1.1484,
        ideal_combustion_temperature: 1603.0,
        molar_mass_chamber: 39.857e-3,
        molar_mass_exhaust: 40.048e-3,
        isp_frozen: 151.4,
        isp_shifting: 153.5,
        condensed_moles_chamber: 0.316,
        condensed_moles_exhaust: 0.321,
        burn_rate_law: &KNSB_BURN_RATE,
    },
    Propellant {
        id: PropellantId::Knsu,
        combustion_efficiency: 0.95,
        density: 1899.5 * 0.95,
        k_chamber: 1.1332,
        k_exhaust: 1.1387,
        ideal_combustion_temperature: 1722.0,
        molar_mass_chamber: 41.964e-3,
        molar_mass_exhaust: 41.517e-3,
        isp_frozen: 153.3,
        isp_shifting: 155.1,
        condensed_moles_chamber: 0.306,
        condensed_moles_exhaust: 0.321,
        burn_rate_law: &KNSU_BURN_RATE,
    },
    Propellant {
        id: PropellantId::Kner,
        combustion_efficiency: 0.94,
        density: 1820.0 * 0.95,
        k_chamber: 1.1392,
        k_exhaust: 1.1518,
        ideal_combustion_temperature: 1608.0,
        molar_mass_chamber: 38.570e-3,
        molar_mass_exhaust: 38.779e-3,
        isp_frozen: 153.8,
        isp_shifting: 156.0,
        condensed_moles_chamber: 0.315,
        condensed_moles_exhaust: 0.321,
        burn_rate_law: &KNER_BURN_RATE,
    },
];

impl Propellant {
    pub fn lookup(name: &str) -> Result<&'static Propellant, SimulationError> {
        let id: PropellantId = name.parse()?;
        Ok(Propellant::by_id(id))
    }

    pub fn by_id(id: PropellantId) -> &'static Propellant {
        &PROPELLANTS[id.table_index()]
    }

    // Pressures above the tabulated data reuse the last band
    pub fn coefficients(&self, pressure: f64) -> (f64, f64) {
        let segment = self.segment_for(pressure);
        (segment.a, segment.n)
    }

    pub fn burn_rate(&self, pressure: f64) -> f64 {
        if !(pressure > 0.0) {
            return 0.0;
        }
        let segment = self.segment_for(pressure);
        let pressure_mpa = pressure / PASCALS_PER_MEGAPASCAL;
        segment.a * pressure_mpa.powf(segment.n) * METERS_PER_MILLIMETER
    }

    pub fn is_within_burn_rate_data(&self, pressure: f64) -> bool {
        let pressure_mpa = pressure / PASCALS_PER_MEGAPASCAL;
        self.burn_rate_law
            .last()
            .map_or(false, |segment| pressure_mpa <= segment.max_pressure)
    }

    // Real combustion temperature, ideal flame temperature scaled by combustion efficiency.
    pub fn combustion_temperature(&self) -> f64 {
        self.combustion_efficiency * self.ideal_combustion_temperature
    }

    pub fn gas_constant(&self) -> f64 {
        UNIVERSAL_GAS_CONSTANT / self.molar_mass_chamber
    }

    pub fn exhaust_gas_constant(&self) -> f64 {
        UNIVERSAL_GAS_CONSTANT / self.molar_mass_exhaust
    }

    // c* = sqrt(R T0) / Γ, with Γ the Vandenkerckhove function of the chamber k.
    pub fn characteristic_velocity(&self) -> f64 {
        let k = self.k_chamber;
        let gamma = k.sqrt() * (2.0 / (k + 1.0)).powf((k + 1.0) / (2.0 * (k - 1.0)));
        (self.gas_constant() * self.combustion_temperature()).sqrt() / gamma
    }

    fn segment_for(&self, pressure: f64) -> &BurnRateSegment {
        let pressure_mpa = pressure / PASCALS_PER_MEGAPASCAL;
        let last = &self.burn_rate_law[self.burn_rate_law.len() - 1];
        self.burn_rate_law
            .iter()
            .find(|segment| pressure_mpa <= segment.max_pressure)
            .unwrap_or(last)
    }
}
