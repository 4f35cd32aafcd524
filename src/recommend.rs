//! Threshold rules turning predicted indicators into advisory lines.

use crate::model::PredictionResult;

/// A pure rule producing at most one recommendation for a prediction.
pub type RecommendationRule = fn(&PredictionResult) -> Option<&'static str>;

fn low_recycled_content(result: &PredictionResult) -> Option<&'static str> {
    (result.recycled_content < 50.0).then_some("Increase recycled content to reduce emissions.")
}

fn high_emissions(result: &PredictionResult) -> Option<&'static str> {
    (result.co2_kg > 5000.0).then_some("Consider renewable energy sources to cut CO2.")
}

fn high_waste(result: &PredictionResult) -> Option<&'static str> {
    (result.waste_kg > 200.0).then_some("Optimize process to minimize waste generation.")
}

fn low_resource_efficiency(result: &PredictionResult) -> Option<&'static str> {
    (result.resource_efficiency < 50.0)
        .then_some("Improve resource efficiency by optimizing stages.")
}

/// The standard rule set, in evaluation order.
pub const STANDARD_RULES: [RecommendationRule; 4] = [
    low_recycled_content,
    high_emissions,
    high_waste,
    low_resource_efficiency,
];

/// Evaluates an ordered list of rules against a prediction.
///
/// The engine holds no state besides its rules; evaluating the same prediction twice yields the
/// same list.
#[derive(Clone, Debug)]
pub struct RecommendationEngine {
    rules: Vec<RecommendationRule>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl RecommendationEngine {
    /// Creates an engine with the [`STANDARD_RULES`].
    pub fn standard() -> Self {
        Self {
            rules: STANDARD_RULES.to_vec(),
        }
    }

    /// Creates an engine without rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule evaluated after the existing ones.
    pub fn with_rule(mut self, rule: RecommendationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Returns the recommendations whose rules fire, in rule order.
    pub fn evaluate(&self, result: &PredictionResult) -> Vec<String> {
        self.rules
            .iter()
            .filter_map(|rule| rule(result))
            .map(str::to_string)
            .collect()
    }
}

/// Evaluates the standard rules against `result`.
pub fn evaluate(result: &PredictionResult) -> Vec<String> {
    RecommendationEngine::standard().evaluate(result)
}

#[cfg(test)]
mod tests {
    use super::{evaluate, RecommendationEngine};
    use crate::model::PredictionResult;

    fn prediction(co2: f64, waste: f64, recycled: f64, efficiency: f64) -> PredictionResult {
        PredictionResult::from_values(&[co2, 1500.0, waste, recycled, efficiency, 10.0, 60.0])
            .expect("seven finite values")
    }

    #[test]
    fn all_rules_fire_in_order() {
        let lines = evaluate(&prediction(6000.0, 250.0, 30.0, 40.0));
        assert_eq!(
            lines,
            [
                "Increase recycled content to reduce emissions.",
                "Consider renewable energy sources to cut CO2.",
                "Optimize process to minimize waste generation.",
                "Improve resource efficiency by optimizing stages.",
            ]
        );
    }

    #[test]
    fn healthy_prediction_yields_nothing() {
        assert!(evaluate(&prediction(100.0, 10.0, 80.0, 90.0)).is_empty());
    }

    #[test]
    fn thresholds_are_strict() {
        assert!(evaluate(&prediction(5000.0, 200.0, 50.0, 50.0)).is_empty());
    }

    #[test]
    fn custom_rules_run_after_the_standard_ones() {
        let engine = RecommendationEngine::standard().with_rule(|result| {
            (result.reuse_potential > 50.0).then_some("Plan a take-back scheme.")
        });
        let lines = engine.evaluate(&prediction(6000.0, 10.0, 80.0, 90.0));
        assert_eq!(
            lines,
            [
                "Consider renewable energy sources to cut CO2.",
                "Plan a take-back scheme."
            ]
        );
        assert!(RecommendationEngine::empty()
            .evaluate(&prediction(6000.0, 250.0, 30.0, 40.0))
            .is_empty());
    }
}
