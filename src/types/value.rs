// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Characteristic value normalization.

use serde_json::Value;

/// Largest integer an `f64` represents exactly.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

/// Serializes a characteristic value into its canonical string form.
///
/// The canonical form is what the value cache compares and what events
/// carry, so devices that alternate between `1` and `true`, or between
/// `21` and `21.0`, do not produce spurious changes.
///
/// # Examples
///
/// ```
/// use accessory_watch::types::normalize_value;
/// use serde_json::json;
///
/// assert_eq!(normalize_value(&json!(1), Some("bool")), "true");
/// assert_eq!(normalize_value(&json!(21.0), Some("float")), "21");
/// assert_eq!(normalize_value(&json!("Idle"), None), "Idle");
/// ```
#[must_use]
pub fn normalize_value(value: &Value, format: Option<&str>) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) if format == Some("bool") => {
            (n.as_f64().unwrap_or(0.0) != 0.0).to_string()
        }
        Value::Number(n) => {
            if n.is_f64()
                && let Some(f) = n.as_f64()
                && f.fract() == 0.0
                && f.abs() < MAX_EXACT_FLOAT_INT
            {
                // Safe: integral and within the exactly-representable range
                #[allow(clippy::cast_possible_truncation)]
                return (f as i64).to_string();
            }
            n.to_string()
        }
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bools_and_numeric_bools_agree() {
        assert_eq!(normalize_value(&json!(true), Some("bool")), "true");
        assert_eq!(normalize_value(&json!(1), Some("bool")), "true");
        assert_eq!(normalize_value(&json!(0), Some("bool")), "false");
    }

    #[test]
    fn numeric_values_without_bool_format_stay_numeric() {
        assert_eq!(normalize_value(&json!(1), Some("uint8")), "1");
        assert_eq!(normalize_value(&json!(0), None), "0");
    }

    #[test]
    fn integral_floats_drop_fraction() {
        assert_eq!(normalize_value(&json!(21.0), Some("float")), "21");
        assert_eq!(normalize_value(&json!(21.5), Some("float")), "21.5");
        assert_eq!(normalize_value(&json!(-3.0), None), "-3");
    }

    #[test]
    fn strings_are_verbatim() {
        assert_eq!(normalize_value(&json!("Locked"), Some("string")), "Locked");
    }

    #[test]
    fn null_and_compound_values() {
        assert_eq!(normalize_value(&Value::Null, None), "null");
        assert_eq!(normalize_value(&json!([1, 2]), None), "[1,2]");
        assert_eq!(normalize_value(&json!({"a": 1}), None), r#"{"a":1}"#);
    }
}
