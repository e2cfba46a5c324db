//! Loose conversions for JSON request bodies.
//!
//! Clients send `"36"` as readily as `36`, so numbers and strings are read with
//! the same rules a browser's `Number()` and `String()` apply to JSON values.

use serde_json::Value;

/// Numeric reading of a JSON value, `None` where the browser would get NaN.
///
/// Infinities are rejected too, since they cannot be written back out as JSON.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null | Value::Bool(false) => Some(0.0),
        Value::Bool(true) => Some(1.0),
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => str_to_number(raw),
        Value::Array(_) | Value::Object(_) => None,
    }
    .filter(|number| number.is_finite())
}

pub fn str_to_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }

    let radix_prefixed = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .into_iter()
        .find_map(|(prefix, radix)| trimmed.strip_prefix(prefix).map(|digits| (digits, radix)));
    if let Some((digits, radix)) = radix_prefixed {
        return parse_radix(digits, radix);
    }

    // `f64::from_str` also takes "inf" and "nan", neither of which are numbers here
    if trimmed
        .chars()
        .any(|c| c.is_alphabetic() && !matches!(c, 'e' | 'E'))
    {
        return None;
    }

    trimmed
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn parse_radix(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    digits.chars().try_fold(0.0_f64, |acc, c| {
        c.to_digit(radix)
            .map(|digit| acc.mul_add(f64::from(radix), f64::from(digit)))
    })
}

/// Textual reading of a JSON value.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(number) => match number.as_f64() {
            Some(float) if number.is_f64() => float_to_display_string(float),
            _ => number.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_display_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Plain decimals between 1e-6 and 1e21, exponent form (`1e+21`, `1.5e-7`) outside.
fn float_to_display_string(float: f64) -> String {
    if float == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&float.abs()) {
        return float.to_string();
    }

    let exponent_form = format!("{float:e}");
    match exponent_form.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
        _ => exponent_form,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_from_json_values() {
        assert_eq!(to_number(&json!(36)), Some(36.0));
        assert_eq!(to_number(&json!(36.5)), Some(36.5));
        assert_eq!(to_number(&json!("36")), Some(36.0));
        assert_eq!(to_number(&json!(" 36 ")), Some(36.0));
        assert_eq!(to_number(&json!("")), Some(0.0));
        assert_eq!(to_number(&json!(true)), Some(1.0));
        assert_eq!(to_number(&json!(false)), Some(0.0));
        assert_eq!(to_number(&json!(null)), Some(0.0));
        assert_eq!(to_number(&json!([1])), None);
        assert_eq!(to_number(&json!({ "years": 3 })), None);
    }

    #[test]
    fn strings_that_are_not_numbers() {
        assert_eq!(str_to_number("abc"), None);
        assert_eq!(str_to_number("12abc"), None);
        assert_eq!(str_to_number("nan"), None);
        assert_eq!(str_to_number("inf"), None);
        assert_eq!(str_to_number("Infinity"), None);
        assert_eq!(str_to_number("1e999"), None);
        assert_eq!(str_to_number("0x"), None);
        assert_eq!(str_to_number("0b102"), None);
    }

    #[test]
    fn string_number_forms() {
        assert_eq!(str_to_number("1e3"), Some(1000.0));
        assert_eq!(str_to_number("-2.5"), Some(-2.5));
        assert_eq!(str_to_number(".5"), Some(0.5));
        assert_eq!(str_to_number("0x1F"), Some(31.0));
        assert_eq!(str_to_number("0o17"), Some(15.0));
        assert_eq!(str_to_number("0b101"), Some(5.0));
    }

    #[test]
    fn display_strings() {
        assert_eq!(to_display_string(&json!("Ada")), "Ada");
        assert_eq!(to_display_string(&json!(" Ada ")), " Ada ");
        assert_eq!(to_display_string(&json!(42)), "42");
        assert_eq!(to_display_string(&json!(42.0)), "42");
        assert_eq!(to_display_string(&json!(1.5)), "1.5");
        assert_eq!(to_display_string(&json!(-0.0)), "0");
        assert_eq!(to_display_string(&json!(true)), "true");
        assert_eq!(to_display_string(&json!(null)), "null");
        assert_eq!(to_display_string(&json!(["a", null, 2])), "a,,2");
        assert_eq!(to_display_string(&json!({ "a": 1 })), "[object Object]");
    }

    #[test]
    fn display_strings_switch_to_exponents_at_the_extremes() {
        assert_eq!(to_display_string(&json!(1e21)), "1e+21");
        assert_eq!(to_display_string(&json!(-2.5e22)), "-2.5e+22");
        assert_eq!(to_display_string(&json!(1.5e-7)), "1.5e-7");
        assert_eq!(to_display_string(&json!(0.000_001)), "0.000001");
        assert_eq!(to_display_string(&json!(1e20)), "100000000000000000000");
    }
}
