//! Data structures describing the input of an assessment and the indicators predicted for it.
//!
//! The types in this module are plain values that can be deserialized from JSON, handed to a
//! [`Predictor`](crate::predict::Predictor) and echoed into the rendered report.  Field order and
//! labels are defined once here, so the layout of the report sections is a stable contract rather
//! than an accident of struct iteration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of indicators a prediction collaborator must return.
pub const INDICATOR_COUNT: usize = 7;

/// Fixed, human-readable labels for the predicted indicators, in output order.
pub const INDICATOR_LABELS: [&str; INDICATOR_COUNT] = [
    "CO2 Emissions (kg)",
    "Water Consumption (L)",
    "Waste Generated (kg)",
    "Recycled Content (%)",
    "Resource Efficiency",
    "Extended Product Life (years)",
    "Reuse Potential (%)",
];

const INDICATOR_FIELDS: [&str; INDICATOR_COUNT] = [
    "co2_kg",
    "water_l",
    "waste_kg",
    "recycled_content",
    "resource_efficiency",
    "extended_life",
    "reuse_potential",
];

/// Description of the product and process an assessment is requested for.
///
/// The categorical fields are free-form identifiers.  Magnitudes are taken as supplied; the
/// stage energies are optional and default to zero when fed to a predictor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    pub material: String,
    pub route: String,
    pub quantity: f64,
    pub energy_mwh: f64,
    pub transport_km: f64,
    pub end_of_life: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_stage1_energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_stage2_energy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_stage3_energy: Option<f64>,
}

/// Value of a single input field as echoed in the report.
#[derive(Clone, Copy, Debug, PartialEq)]
enum FieldValue<'a> {
    Text(&'a str),
    Magnitude(f64),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Magnitude(value) => write!(f, "{}", format_magnitude(*value)),
        }
    }
}

impl InputRecord {
    /// Creates a record with the mandatory fields and no stage energies.
    pub fn new(
        material: impl Into<String>,
        route: impl Into<String>,
        quantity: f64,
        energy_mwh: f64,
        transport_km: f64,
        end_of_life: impl Into<String>,
    ) -> Self {
        Self {
            material: material.into(),
            route: route.into(),
            quantity,
            energy_mwh,
            transport_km,
            end_of_life: end_of_life.into(),
            process_stage1_energy: None,
            process_stage2_energy: None,
            process_stage3_energy: None,
        }
    }

    /// Sets the three per-stage energy contributions and returns the updated record.
    pub fn with_stage_energies(mut self, stage1: f64, stage2: f64, stage3: f64) -> Self {
        self.process_stage1_energy = Some(stage1);
        self.process_stage2_energy = Some(stage2);
        self.process_stage3_energy = Some(stage3);
        self
    }

    /// Ordered `(field name, value)` pairs for the input echo section.
    fn field_table(&self) -> [(&'static str, Option<FieldValue<'_>>); 9] {
        use FieldValue::{Magnitude, Text};

        [
            ("material", Some(Text(&self.material))),
            ("route", Some(Text(&self.route))),
            ("quantity", Some(Magnitude(self.quantity))),
            ("energy_mwh", Some(Magnitude(self.energy_mwh))),
            ("transport_km", Some(Magnitude(self.transport_km))),
            ("end_of_life", Some(Text(&self.end_of_life))),
            ("process_stage1_energy", self.process_stage1_energy.map(Magnitude)),
            ("process_stage2_energy", self.process_stage2_energy.map(Magnitude)),
            ("process_stage3_energy", self.process_stage3_energy.map(Magnitude)),
        ]
    }

    /// Returns the `(label, value)` lines echoed in the input section, in report order.
    ///
    /// Stage energies only appear when they were supplied.
    pub fn fields(&self) -> Vec<(String, String)> {
        self.field_table()
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (field_label(name), value.to_string())))
            .collect()
    }

    /// Returns the numeric features in declaration order, with absent stage energies as zero.
    pub fn feature_vector(&self) -> [f64; 6] {
        [
            self.quantity,
            self.energy_mwh,
            self.transport_km,
            self.process_stage1_energy.unwrap_or(0.0),
            self.process_stage2_energy.unwrap_or(0.0),
            self.process_stage3_energy.unwrap_or(0.0),
        ]
    }
}

/// Derives a display label from a snake_case field name.
///
/// Underscores become spaces and every letter that does not follow another letter is
/// upper-cased, so `end_of_life` becomes `End Of Life`.
pub fn field_label(name: &str) -> String {
    let mut label = String::with_capacity(name.len());
    let mut previous_is_letter = false;
    for ch in name.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if previous_is_letter {
                label.extend(ch.to_lowercase());
            } else {
                label.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            label.push(ch);
            previous_is_letter = false;
        }
    }
    label
}

/// Formats a magnitude verbatim, keeping a trailing `.0` on integral values.
///
/// Magnitudes below `1e-4` or from `1e16` upward switch to a signed, two-digit exponent
/// (`1e+20`, `1.5e-05`).
fn format_magnitude(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        return text.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };
    if (-4..16).contains(&exponent) {
        let fixed = value.to_string();
        return if fixed.contains('.') {
            fixed
        } else {
            format!("{fixed}.0")
        };
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

/// The seven indicators predicted for an [`InputRecord`], in their fixed order.
///
/// Values are rendered as supplied; ranges such as `0..=100` for percentages are expectations of
/// the model, not invariants enforced here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub co2_kg: f64,
    pub water_l: f64,
    pub waste_kg: f64,
    pub recycled_content: f64,
    pub resource_efficiency: f64,
    pub extended_life: f64,
    pub reuse_potential: f64,
}

impl PredictionResult {
    /// Builds a result from raw model output, validating arity and finiteness.
    pub fn from_values(values: &[f64]) -> Result<Self, PredictionError> {
        if values.len() != INDICATOR_COUNT {
            return Err(PredictionError::Arity {
                expected: INDICATOR_COUNT,
                actual: values.len(),
            });
        }

        if let Some((index, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, value)| !value.is_finite())
        {
            return Err(PredictionError::NonFinite {
                field: INDICATOR_FIELDS[index],
                value,
            });
        }

        Ok(Self {
            co2_kg: values[0],
            water_l: values[1],
            waste_kg: values[2],
            recycled_content: values[3],
            resource_efficiency: values[4],
            extended_life: values[5],
            reuse_potential: values[6],
        })
    }

    /// Returns the values in their fixed order.
    pub fn values(&self) -> [f64; INDICATOR_COUNT] {
        [
            self.co2_kg,
            self.water_l,
            self.waste_kg,
            self.recycled_content,
            self.resource_efficiency,
            self.extended_life,
            self.reuse_potential,
        ]
    }

    /// Returns the `(label, value)` pairs of the output section with values rounded to two
    /// decimal places.
    pub fn indicators(&self) -> Vec<(&'static str, String)> {
        INDICATOR_LABELS
            .iter()
            .zip(self.values())
            .map(|(label, value)| (*label, format!("{:.2}", value)))
            .collect()
    }

    /// Returns a copy with every indicator rounded to two decimal places.
    pub fn rounded(&self) -> Self {
        let round = |value: f64| {
            let scaled = value * 100.0;
            if scaled.is_finite() {
                scaled.round() / 100.0
            } else {
                value
            }
        };
        Self {
            co2_kg: round(self.co2_kg),
            water_l: round(self.water_l),
            waste_kg: round(self.waste_kg),
            recycled_content: round(self.recycled_content),
            resource_efficiency: round(self.resource_efficiency),
            extended_life: round(self.extended_life),
            reuse_potential: round(self.reuse_potential),
        }
    }
}

/// Errors raised when the prediction collaborator fails or returns malformed output.
#[derive(Clone, Debug, PartialEq)]
pub enum PredictionError {
    /// The model itself reported a failure.
    Model(String),
    /// The model returned the wrong number of indicators.
    Arity {
        /// Number of indicators required.
        expected: usize,
        /// Number of indicators received.
        actual: usize,
    },
    /// An indicator was NaN or infinite.
    NonFinite {
        /// Name of the offending indicator.
        field: &'static str,
        /// The value received.
        value: f64,
    },
}

impl fmt::Display for PredictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Model(message) => write!(f, "Prediction model failed: {message}"),
            Self::Arity { expected, actual } => write!(
                f,
                "Prediction returned {} values, expected {}",
                actual, expected
            ),
            Self::NonFinite { field, value } => {
                write!(f, "Prediction for '{}' is not finite: {}", field, value)
            }
        }
    }
}

impl std::error::Error for PredictionError {}
