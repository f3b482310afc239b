use tracing::warn;

use crate::error::ReportError;
use crate::value::reported::ReportedValue;

/// Reduces one key's series of reported values into a single scalar.
///
/// Data-quality problems never abort a run: an empty series, an all-NaN
/// series, or a weighted series whose finite weights sum to zero all degrade
/// to `Ok(NaN)` with a logged warning.  Callers must treat NaN as "no data".
/// Mixing the two variants within one series is a contract violation and
/// returns an error instead.
pub fn aggregate(values: &[ReportedValue]) -> Result<f64, ReportError> {
    let Some(first) = values.first() else {
        warn!("no stats found");
        return Ok(f64::NAN);
    };

    match first {
        ReportedValue::Average(_) => {
            // NaN-skipping arithmetic mean.
            let mut sum = 0.0;
            let mut n = 0usize;
            for v in values {
                let ReportedValue::Average(x) = v else {
                    return Err(ReportError::MixedValueKinds);
                };
                if x.is_nan() {
                    continue;
                }
                sum += x;
                n += 1;
            }
            if n == 0 {
                return Ok(f64::NAN);
            }
            Ok(sum / n as f64)
        }
        ReportedValue::WeightedAverage { .. } => {
            // Pairs with a non-finite value or weight are excluded entirely.
            let mut sum_value = 0.0;
            let mut sum_weight = 0.0;
            let mut n = 0usize;
            for v in values {
                let ReportedValue::WeightedAverage { value, weight } = v else {
                    return Err(ReportError::MixedValueKinds);
                };
                if !value.is_finite() || !weight.is_finite() {
                    continue;
                }
                sum_value += value * weight;
                sum_weight += weight;
                n += 1;
            }
            if n == 0 {
                warn!("no valid stats found");
                return Ok(f64::NAN);
            }
            if sum_weight == 0.0 {
                // Guards the division below; a zero-weight batch is a
                // runtime condition, not a bug.
                warn!("weight is zero");
                return Ok(f64::NAN);
            }
            Ok(sum_value / sum_weight)
        }
    }
}
