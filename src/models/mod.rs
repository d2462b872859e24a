pub mod auth;
pub mod envelope;
pub mod history;
pub mod thing_model;

use crate::utils::time_format::value_as_millis;
use serde_json::Value;

/// Opaque upstream object (product, device, location, resource).
pub type Record = serde_json::Map<String, Value>;

/// Millisecond timestamp from a number or numeric string; zero and
/// non-numeric values count as absent.
pub fn millis_of(value: Option<&Value>) -> Option<i64> {
    value_as_millis(value?).filter(|millis| *millis != 0)
}
