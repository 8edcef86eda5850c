// Display units - per-quantity unit lists with a cyclable selection
use std::collections::HashMap;

pub const NOT_AVAILABLE: &str = "N/A";

/// Version prefix for persisted unit selections. Bumped whenever a group's
/// choice list changes, so a stale stored index cannot select the wrong unit.
const PREF_KEY_VERSION: &str = "units.v2";

#[derive(Debug, Clone, Copy)]
pub struct UnitChoice {
    pub unit: &'static str,
    pub digits: usize,
    pub convert: fn(f64) -> f64,
}

#[derive(Debug, Clone, Copy)]
pub struct UnitGroup {
    pub name: &'static str,
    pub choices: &'static [UnitChoice],
}

pub fn ms_to_knots(v: f64) -> f64 {
    v * 1.943_844_49
}

fn ms_to_kmh(v: f64) -> f64 {
    v * 3.6
}

fn identity(v: f64) -> f64 {
    v
}

fn kelvin_to_celsius(v: f64) -> f64 {
    v - 273.15
}

fn kelvin_to_fahrenheit(v: f64) -> f64 {
    (v - 273.15) * 9.0 / 5.0 + 32.0
}

fn pa_to_hpa(v: f64) -> f64 {
    v / 100.0
}

fn pa_to_inhg(v: f64) -> f64 {
    v * 0.000_295_3
}

fn m_to_nm(v: f64) -> f64 {
    v / 1852.0
}

fn m_to_km(v: f64) -> f64 {
    v / 1000.0
}

fn m_to_ft(v: f64) -> f64 {
    v * 3.280_84
}

/// All raw values are SI (m/s, K, Pa, m); each choice converts from SI.
pub const UNIT_GROUPS: &[UnitGroup] = &[
    UnitGroup {
        name: "speed",
        choices: &[
            UnitChoice {
                unit: "kn",
                digits: 1,
                convert: ms_to_knots,
            },
            UnitChoice {
                unit: "km/h",
                digits: 1,
                convert: ms_to_kmh,
            },
            UnitChoice {
                unit: "m/s",
                digits: 1,
                convert: identity,
            },
        ],
    },
    UnitGroup {
        name: "temperature",
        choices: &[
            UnitChoice {
                unit: "°C",
                digits: 1,
                convert: kelvin_to_celsius,
            },
            UnitChoice {
                unit: "°F",
                digits: 1,
                convert: kelvin_to_fahrenheit,
            },
            UnitChoice {
                unit: "K",
                digits: 1,
                convert: identity,
            },
        ],
    },
    UnitGroup {
        name: "pressure",
        choices: &[
            UnitChoice {
                unit: "hPa",
                digits: 0,
                convert: pa_to_hpa,
            },
            UnitChoice {
                unit: "inHg",
                digits: 2,
                convert: pa_to_inhg,
            },
        ],
    },
    UnitGroup {
        name: "distance",
        choices: &[
            UnitChoice {
                unit: "NM",
                digits: 1,
                convert: m_to_nm,
            },
            UnitChoice {
                unit: "km",
                digits: 1,
                convert: m_to_km,
            },
        ],
    },
    UnitGroup {
        name: "length",
        choices: &[
            UnitChoice {
                unit: "m",
                digits: 1,
                convert: identity,
            },
            UnitChoice {
                unit: "ft",
                digits: 0,
                convert: m_to_ft,
            },
        ],
    },
];

/// Metric paths with a known display group, so sparklines and live values
/// render the same unit for the same metric.
const PATH_GROUPS: &[(&str, &str)] = &[
    ("navigation.speedOverGround", "speed"),
    ("navigation.speedThroughWater", "speed"),
    ("environment.wind.speedTrue", "speed"),
    ("environment.wind.speedApparent", "speed"),
    ("environment.water.temperature", "temperature"),
    ("environment.outside.temperature", "temperature"),
    ("environment.inside.temperature", "temperature"),
    ("environment.outside.pressure", "pressure"),
    ("environment.depth.belowTransducer", "length"),
    ("navigation.trip.log", "distance"),
    ("navigation.log", "distance"),
];

pub fn path_group(path: &str) -> Option<&'static str> {
    PATH_GROUPS
        .iter()
        .find(|(p, _)| *p == path)
        .map(|(_, group)| *group)
}

fn group_by_name(name: &str) -> Option<&'static UnitGroup> {
    UNIT_GROUPS.iter().find(|g| g.name == name)
}

/// Current unit selection per group. The indices are loaded from and saved to
/// the preference store by the caller; the registry itself is pure.
#[derive(Debug, Clone, Default)]
pub struct UnitRegistry {
    indices: HashMap<&'static str, usize>,
}

impl UnitRegistry {
    /// Builds a registry from stored indices. An index outside its group's
    /// choice list is treated as unset.
    pub fn from_indices(stored: &HashMap<String, usize>) -> Self {
        let mut indices = HashMap::new();
        for group in UNIT_GROUPS {
            let index = stored
                .get(group.name)
                .copied()
                .filter(|i| *i < group.choices.len())
                .unwrap_or(0);
            indices.insert(group.name, index);
        }
        Self { indices }
    }

    /// Preference-store key for a group's selection.
    pub fn pref_key(group: &str) -> String {
        format!("{}.{}", PREF_KEY_VERSION, group)
    }

    pub fn selected(&self, group: &str) -> Option<&'static UnitChoice> {
        let definition = group_by_name(group)?;
        let index = self.indices.get(definition.name).copied().unwrap_or(0);
        definition.choices.get(index)
    }

    /// Advances the group to its next unit, wrapping at the end of the list.
    /// Returns the new index for persistence.
    pub fn cycle(&mut self, group: &str) -> Option<usize> {
        let definition = group_by_name(group)?;
        let index = self.indices.entry(definition.name).or_insert(0);
        *index = (*index + 1) % definition.choices.len();
        Some(*index)
    }

    pub fn format(&self, group: &str, raw_si: Option<f64>) -> String {
        let Some(value) = raw_si.filter(|v| v.is_finite()) else {
            return NOT_AVAILABLE.to_string();
        };
        match self.selected(group) {
            Some(choice) => format!(
                "{:.digits$} {}",
                (choice.convert)(value),
                choice.unit,
                digits = choice.digits
            ),
            None => NOT_AVAILABLE.to_string(),
        }
    }

    /// Formats by metric path. Paths without a mapped group render the raw
    /// value without a unit suffix.
    pub fn format_path(&self, path: &str, raw_si: Option<f64>) -> String {
        match path_group(path) {
            Some(group) => self.format(group, raw_si),
            None => match raw_si.filter(|v| v.is_finite()) {
                Some(value) => format!("{:.2}", value),
                None => NOT_AVAILABLE.to_string(),
            },
        }
    }
}
