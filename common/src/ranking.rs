//! Publication order of aggregated results.

use crate::AggregateResult;
use std::cmp::Ordering;

/// Scored entries first by descending average, unscored entries last, ties broken
/// by ascending registration number (then entry id, so the order stays total even
/// if a roster ever reuses a registration number).
pub fn compare(a: &AggregateResult, b: &AggregateResult) -> Ordering {
    let by_average = match (a.average_score, b.average_score) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_average
        .then_with(|| a.registration_number.cmp(&b.registration_number))
        .then_with(|| a.entry_id.cmp(&b.entry_id))
}

pub fn order(mut results: Vec<AggregateResult>) -> Vec<AggregateResult> {
    results.sort_by(compare);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{average_score, validate_count};
    use crate::config::ScoringConfig;

    fn result(entry_id: u64, registration_number: &str, average: Option<f64>) -> AggregateResult {
        AggregateResult {
            entry_id,
            registration_number: registration_number.to_string(),
            score_count: usize::from(average.is_some()) * 3,
            average_score: average,
            validation: validate_count(usize::from(average.is_some()) * 3, 3),
        }
    }

    fn registration_numbers(results: &[AggregateResult]) -> Vec<&str> {
        results
            .iter()
            .map(|r| r.registration_number.as_str())
            .collect()
    }

    #[test_log::test]
    fn test_ties_break_by_registration_number() {
        let ordered = order(vec![
            result(1, "002", Some(8.5)),
            result(2, "001", Some(8.5)),
            result(3, "003", None),
        ]);
        assert_eq!(registration_numbers(&ordered), vec!["001", "002", "003"]);
    }

    #[test_log::test]
    fn test_unscored_entries_sort_last() {
        let ordered = order(vec![
            result(1, "001", None),
            result(2, "002", Some(0.0)),
            result(3, "000", None),
            result(4, "004", Some(9.25)),
        ]);
        assert_eq!(
            registration_numbers(&ordered),
            vec!["004", "002", "000", "001"]
        );
    }

    #[test_log::test]
    fn test_registration_numbers_compare_lexicographically() {
        let ordered = order(vec![result(1, "10", Some(7.0)), result(2, "9", Some(7.0))]);
        assert_eq!(registration_numbers(&ordered), vec!["10", "9"]);
    }

    #[test_log::test]
    fn test_order_is_independent_of_input_order() {
        let input = vec![
            result(1, "005", Some(7.5)),
            result(2, "003", Some(9.0)),
            result(3, "001", None),
            result(4, "002", Some(7.5)),
            result(5, "004", Some(8.0)),
        ];
        let mut reversed = input.clone();
        reversed.reverse();
        assert_eq!(order(input), order(reversed));
    }

    #[test_log::test]
    fn test_distinct_entries_never_compare_equal() {
        let a = result(1, "001", Some(8.0));
        let b = result(2, "001", Some(8.0));
        assert_eq!(compare(&a, &b), Ordering::Less);
        assert_eq!(compare(&b, &a), Ordering::Greater);
        assert_eq!(compare(&a, &a), Ordering::Equal);
    }

    #[test_log::test]
    fn test_tiny_negative_average_ties_with_zero() {
        let config = ScoringConfig {
            drop_highest: false,
            drop_lowest: false,
            ..ScoringConfig::default()
        };
        let slightly_negative = average_score(&[-0.01, 0.0, 0.0], &config);
        let zero = average_score(&[0.0, 0.0, 0.0], &config);
        assert_eq!(slightly_negative, Some(0.0));
        assert!(slightly_negative.is_some_and(f64::is_sign_positive));

        let ordered = order(vec![
            result(2, "002", zero),
            result(1, "001", slightly_negative),
        ]);
        assert_eq!(registration_numbers(&ordered), vec!["001", "002"]);
    }
}
