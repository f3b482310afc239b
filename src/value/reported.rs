use serde::{Deserialize, Serialize};

use crate::error::ReportError;

/// A typed per-iteration sample pending reduction.
///
/// One key's history must hold a single variant; `aggregate` rejects mixed
/// series.  The set is closed on purpose: adding a third reduction kind means
/// extending this enum and every `match` on it, checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReportedValue {
    /// Unweighted scalar; reduced by a NaN-skipping arithmetic mean.
    Average(f64),
    /// Scalar paired with a batch weight; reduced by a weighted mean over
    /// the finite pairs.
    WeightedAverage { value: f64, weight: f64 },
}

/// A raw measurement as handed over by the training loop: either an
/// already-scalar value or a series that must contain exactly one element
/// (a detached singleton tensor, in the original collaborator's terms).
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Scalar(f64),
    Series(Vec<f64>),
}

impl Sample {
    /// Reduces the sample to a single scalar.
    ///
    /// A `Series` with any length other than 1 is a contract violation; the
    /// error names the offending length.
    pub fn resolve(self) -> Result<f64, ReportError> {
        match self {
            Sample::Scalar(v) => Ok(v),
            Sample::Series(v) if v.len() == 1 => Ok(v[0]),
            Sample::Series(v) => Err(ReportError::NotScalar(v.len())),
        }
    }
}

impl From<f64> for Sample {
    fn from(v: f64) -> Self {
        Sample::Scalar(v)
    }
}

impl From<f32> for Sample {
    fn from(v: f32) -> Self {
        Sample::Scalar(f64::from(v))
    }
}

impl From<i64> for Sample {
    fn from(v: i64) -> Self {
        Sample::Scalar(v as f64)
    }
}

impl From<u64> for Sample {
    fn from(v: u64) -> Self {
        Sample::Scalar(v as f64)
    }
}

impl From<usize> for Sample {
    fn from(v: usize) -> Self {
        Sample::Scalar(v as f64)
    }
}

impl From<Vec<f64>> for Sample {
    fn from(v: Vec<f64>) -> Self {
        Sample::Series(v)
    }
}

impl From<&[f64]> for Sample {
    fn from(v: &[f64]) -> Self {
        Sample::Series(v.to_vec())
    }
}

/// Converts a raw measurement (and optional weight) into a typed
/// [`ReportedValue`].
///
/// # Arguments
/// - `v`      — the measurement; must reduce to a single scalar
/// - `weight` — optional batch weight; its presence selects the weighted
///              variant
pub fn to_reported_value(
    v: Sample,
    weight: Option<Sample>,
) -> Result<ReportedValue, ReportError> {
    let value = v.resolve()?;
    match weight {
        Some(w) => Ok(ReportedValue::WeightedAverage {
            value,
            weight: w.resolve()?,
        }),
        None => Ok(ReportedValue::Average(value)),
    }
}
