//! Serialization helpers for floats that may legitimately be NaN.
//!
//! JSON has no NaN. A NaN fitness (failed evaluation) or a NaN stop
//! threshold (criterion disabled) travels as `null` instead.

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize NaN as `null`, everything else as a number.
pub fn serialize_nan_as_null<S>(val: &f64, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if val.is_nan() {
        s.serialize_none()
    } else {
        s.serialize_f64(*val)
    }
}

/// Deserialize `null` (or a missing value, with `#[serde(default)]`) as NaN.
pub fn deserialize_null_as_nan<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(d)?.unwrap_or(f64::NAN))
}

/// For `#[serde(default = "..")]` on NaN-able fields.
pub fn nan() -> f64 {
    f64::NAN
}

/// Serialize a vector of floats with NaN entries as `null`.
pub fn serialize_vec_nan_as_null<S>(val: &[f64], s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    use serde::ser::SerializeSeq;
    let mut seq = s.serialize_seq(Some(val.len()))?;
    for v in val {
        if v.is_nan() {
            seq.serialize_element(&Option::<f64>::None)?;
        } else {
            seq.serialize_element(v)?;
        }
    }
    seq.end()
}

/// Inverse of [`serialize_vec_nan_as_null`].
pub fn deserialize_vec_null_as_nan<'de, D>(d: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Option<f64>>::deserialize(d)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
