//! The seam between the report engine and the prediction model.
//!
//! The model is opaque: anything that maps an [`InputRecord`] to raw indicator values can act as a
//! [`Predictor`].  The output is validated here before it reaches the report builder.

use log::debug;

use crate::model::{InputRecord, PredictionResult};

pub use crate::model::PredictionError;

/// A prediction model producing the raw indicator values for an input record.
pub trait Predictor {
    /// Runs the model and returns its raw output, expected to hold seven values in the fixed
    /// indicator order.
    fn predict(&self, input: &InputRecord) -> Result<Vec<f64>, PredictionError>;
}

impl<F> Predictor for F
where
    F: Fn(&InputRecord) -> Result<Vec<f64>, PredictionError>,
{
    fn predict(&self, input: &InputRecord) -> Result<Vec<f64>, PredictionError> {
        self(input)
    }
}

/// Predictor that replays a fixed model output regardless of the input.
///
/// Useful when the model ran elsewhere and only its output is available.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticPredictor {
    values: Vec<f64>,
}

impl StaticPredictor {
    /// Creates a predictor replaying `values`.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
        }
    }
}

impl Predictor for StaticPredictor {
    fn predict(&self, _input: &InputRecord) -> Result<Vec<f64>, PredictionError> {
        Ok(self.values.clone())
    }
}

/// Runs `predictor` for `input` and validates the output.
pub fn predict<P>(predictor: &P, input: &InputRecord) -> Result<PredictionResult, PredictionError>
where
    P: Predictor + ?Sized,
{
    let values = predictor.predict(input)?;
    debug!(
        "Predictor returned {} values for material '{}'",
        values.len(),
        input.material
    );
    PredictionResult::from_values(&values)
}

#[cfg(test)]
mod tests {
    use super::{predict, PredictionError, StaticPredictor};
    use crate::model::InputRecord;

    fn input() -> InputRecord {
        InputRecord::new("aluminium", "secondary", 2.0, 1.0, 50.0, "landfill")
    }

    #[test]
    fn static_predictor_yields_result() {
        let predictor = StaticPredictor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        let result = predict(&predictor, &input()).expect("valid prediction");
        assert_eq!(result.reuse_potential, 7.0);
    }

    #[test]
    fn closures_act_as_predictors() {
        let predictor = |record: &InputRecord| -> Result<Vec<f64>, PredictionError> {
            let mut values = vec![0.0; 7];
            values[0] = record.energy_mwh * 1000.0;
            Ok(values)
        };
        let result = predict(&predictor, &input()).expect("valid prediction");
        assert_eq!(result.co2_kg, 1000.0);
    }

    #[test]
    fn short_output_is_a_prediction_error() {
        let predictor = StaticPredictor::new(vec![1.0; 5]);
        let err = predict(&predictor, &input()).unwrap_err();
        assert!(matches!(err, PredictionError::Arity { actual: 5, .. }));
    }

    #[test]
    fn model_failures_propagate() {
        let predictor = |_: &InputRecord| -> Result<Vec<f64>, PredictionError> {
            Err(PredictionError::Model("model file missing".into()))
        };
        let err = predict(&predictor, &input()).unwrap_err();
        assert_eq!(err.to_string(), "Prediction model failed: model file missing");
    }
}
