use lca_report::chart::pie_percentages;
use lca_report::model::PredictionResult;
use lca_report::recommend::evaluate;
use proptest::prelude::*;

fn prediction(values: [f64; 7]) -> PredictionResult {
    PredictionResult::from_values(&values).expect("finite values")
}

fn indicator_values() -> impl Strategy<Value = [f64; 7]> {
    (
        0.0..20_000.0f64,
        0.0..10_000.0f64,
        0.0..1_000.0f64,
        0.0..=100.0f64,
        0.0..=100.0f64,
        0.0..50.0f64,
        0.0..=100.0f64,
    )
        .prop_map(|(a, b, c, d, e, f, g)| [a, b, c, d, e, f, g])
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(values in indicator_values()) {
        let result = prediction(values);
        prop_assert_eq!(evaluate(&result), evaluate(&result));
    }

    #[test]
    fn one_line_per_breached_threshold(values in indicator_values()) {
        let result = prediction(values);
        let expected = [
            result.recycled_content < 50.0,
            result.co2_kg > 5000.0,
            result.waste_kg > 200.0,
            result.resource_efficiency < 50.0,
        ]
        .iter()
        .filter(|breached| **breached)
        .count();
        prop_assert_eq!(evaluate(&result).len(), expected);
    }

    #[test]
    fn pie_shares_sum_to_one_hundred(recycled in 0.0..=100.0f64) {
        let shares = pie_percentages(&["Recycled", "Non-Recycled"], &[recycled, 100.0 - recycled])
            .expect("valid wedges");
        let total: f64 = shares.iter().sum();
        prop_assert!((total - 100.0).abs() <= 0.1, "shares sum to {}", total);
    }

    #[test]
    fn indicators_always_show_two_decimals(values in indicator_values()) {
        for (_, value) in prediction(values).indicators() {
            let decimals = value.split('.').nth(1).map(str::len);
            prop_assert_eq!(decimals, Some(2), "{}", value);
        }
    }
}
