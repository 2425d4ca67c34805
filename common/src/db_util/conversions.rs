//! Safe-ish conversions between rust and sql types.

use crate::config::STORED_DECIMAL_PLACES;
use bigdecimal::{BigDecimal, FromPrimitive};

/// Scale of the NUMERIC score columns; covers every supported `decimal_places`.
pub const SCORE_SCALE: i64 = STORED_DECIMAL_PLACES as i64;

pub fn i64_to_u64(i: i64) -> Result<u64, String> {
    u64::try_from(i).map_err(|_| "i64 value is negative and cannot be converted to u64".to_string())
}
pub fn u64_to_i64(i: u64) -> Result<i64, String> {
    i64::try_from(i).map_err(|_| "u64 value exceeds i64::MAX and cannot be converted to i64".to_string())
}

pub fn i32_to_u32(i: i32) -> Result<u32, String> {
    u32::try_from(i).map_err(|_| "i32 value is negative and cannot be converted to u32".to_string())
}
pub fn u32_to_i32(i: u32) -> Result<i32, String> {
    i32::try_from(i).map_err(|_| "u32 value exceeds i32::MAX and cannot be converted to i32".to_string())
}

pub fn opti32_to_optu32(i: Option<i32>) -> Result<Option<u32>, String> {
    i.map(i32_to_u32).transpose()
}
pub fn optu32_to_opti32(i: Option<u32>) -> Result<Option<i32>, String> {
    i.map(u32_to_i32).transpose()
}

/// Parses the decimal text so the result is the f64 nearest the stored value.
pub fn bigdec_to_f64(i: &BigDecimal) -> Result<f64, String> {
    i.to_string()
        .parse::<f64>()
        .map_err(|_| format!("BigDecimal value {i} cannot be converted to f64"))
}
pub fn f64_to_bigdec(i: f64) -> Result<BigDecimal, String> {
    BigDecimal::from_f64(i)
        .map(|d| d.round(SCORE_SCALE))
        .ok_or_else(|| format!("f64 value {i} cannot be stored as a decimal"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn test_decimal_round_trip_keeps_score_precision() {
        for value in [0.0, 8.33, 9.5, 14.17, 10.0] {
            let stored = f64_to_bigdec(value).unwrap();
            assert_eq!(bigdec_to_f64(&stored).unwrap(), value);
        }
    }

    #[test_log::test]
    fn test_quantized_components_survive_storage() {
        let components = crate::ScoreComponents {
            technique_score: 8.004_999_999_6,
            performance_score: 1.123_456_789,
            deduction: 0.000_000_4,
        }
        .quantized();
        let total = components.total(2);

        let reload = |v: f64| bigdec_to_f64(&f64_to_bigdec(v).unwrap()).unwrap();
        let stored = crate::ScoreComponents {
            technique_score: reload(components.technique_score),
            performance_score: reload(components.performance_score),
            deduction: reload(components.deduction),
        };
        assert_eq!(stored, components);
        assert_eq!(stored.total(2), reload(total));
    }

    #[test_log::test]
    fn test_out_of_range_integers() {
        assert!(i64_to_u64(-1).is_err());
        assert!(u32_to_i32(u32::MAX).is_err());
        assert_eq!(opti32_to_optu32(Some(4)).unwrap(), Some(4));
        assert_eq!(optu32_to_opti32(None).unwrap(), None);
    }

    #[test_log::test]
    fn test_nan_cannot_be_stored() {
        assert!(f64_to_bigdec(f64::NAN).is_err());
    }
}
