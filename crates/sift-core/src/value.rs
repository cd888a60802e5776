//! Scalar filter values
//!
//! A `FilterValue` is what a leaf predicate compares against, and also what a
//! record yields once a property path has been resolved.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// A primitive value bound into a predicate or read from a record
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Text value
    String(String),
    /// Numeric value
    Number(f64),
    /// Boolean value
    Bool(bool),
    /// Point in time
    Date(DateTime<Utc>),
}

impl FilterValue {
    /// Render this value as a filter literal.
    ///
    /// Strings and dates are single-quoted (embedded quotes doubled), numbers
    /// and booleans use their literal form.
    pub fn escape(&self) -> String {
        match self {
            Self::String(s) => format!("'{}'", s.replace('\'', "''")),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => format!("'{}'", format_date(d)),
        }
    }

    /// Unquoted textual form, used by the string functions and query strings
    pub fn as_text(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => format_date(d),
        }
    }

    /// Interpret a bare (unquoted) word from a filter expression
    pub fn from_bareword(word: &str) -> Self {
        match word {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => match parse_number(word) {
                Some(n) => Self::Number(n),
                None => Self::String(word.to_string()),
            },
        }
    }

    /// Convert a JSON scalar. Objects, arrays and null have no scalar form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::String(s.clone())),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s) => Value::String(s.clone()),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Self::Bool(b) => Value::Bool(*b),
            Self::Date(d) => Value::String(format_date(d)),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.escape())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for FilterValue {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value.and_time(chrono::NaiveTime::MIN).and_utc())
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

/// Shortest literal form of a number (`5`, `5.5`, `-3`)
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

/// ISO-8601 UTC timestamp with millisecond precision
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a finite number; `inf`/`NaN` spellings are not numbers here.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse a date-like string.
///
/// Accepts RFC 3339 timestamps, offset-less `YYYY-MM-DDTHH:MM:SS[.fff]`
/// (taken as UTC) and plain `YYYY-MM-DD` (midnight UTC).
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn parse_bool_literal(s: &str) -> Option<bool> {
    match s.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Compare two scalar values, returning an ordering if they are comparable.
///
/// - Numbers: compared as f64
/// - Booleans: false < true
/// - Dates, or a date against a date-like string: compared as instants
/// - Strings: as instants when both are date-like, lexically when neither is,
///   otherwise incomparable
/// - Number against numeric string, boolean against `true`/`false`: coerced
/// - Anything else: `None`
pub fn compare_values(left: &FilterValue, right: &FilterValue) -> Option<Ordering> {
    use FilterValue::*;

    match (left, right) {
        (Number(a), Number(b)) => a.partial_cmp(b),
        (Bool(a), Bool(b)) => Some(a.cmp(b)),
        (Date(a), Date(b)) => Some(a.cmp(b)),
        (Date(a), String(s)) => parse_date(s).map(|b| a.cmp(&b)),
        (String(s), Date(b)) => parse_date(s).map(|a| a.cmp(b)),
        (String(a), String(b)) => match (parse_date(a), parse_date(b)) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            (None, None) => Some(a.cmp(b)),
            // A date-like string stands for an instant, as a `Date` would
            _ => None,
        },
        (Number(a), String(s)) => parse_number(s).and_then(|b| a.partial_cmp(&b)),
        (String(s), Number(b)) => parse_number(s).and_then(|a| a.partial_cmp(b)),
        (Bool(a), String(s)) => parse_bool_literal(s).map(|b| a.cmp(&b)),
        (String(s), Bool(b)) => parse_bool_literal(s).map(|a| a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape() {
        assert_eq!(FilterValue::from("John").escape(), "'John'");
        assert_eq!(FilterValue::from("O'Brien").escape(), "'O''Brien'");
        assert_eq!(FilterValue::from(5).escape(), "5");
        assert_eq!(FilterValue::from(5.5).escape(), "5.5");
        assert_eq!(FilterValue::from(-3).escape(), "-3");
        assert_eq!(FilterValue::from(true).escape(), "true");

        let date = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(FilterValue::from(date).escape(), "'2020-01-01T00:00:00.000Z'");
    }

    #[test]
    fn test_from_bareword() {
        assert_eq!(FilterValue::from_bareword("7"), FilterValue::Number(7.0));
        assert_eq!(FilterValue::from_bareword("-2.5"), FilterValue::Number(-2.5));
        assert_eq!(FilterValue::from_bareword("false"), FilterValue::Bool(false));
        assert_eq!(
            FilterValue::from_bareword("open"),
            FilterValue::String("open".into())
        );
        assert_eq!(
            FilterValue::from_bareword("NaN"),
            FilterValue::String("NaN".into())
        );
    }

    #[test]
    fn test_parse_date() {
        let expected = Utc.with_ymd_and_hms(2020, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_date("2020-06-01"), Some(expected));
        assert_eq!(parse_date("2020-06-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_date("2020-06-01T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_date("2020-06-01T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_date("2020-06-01T00:00:00"), Some(expected));
        assert_eq!(parse_date("June"), None);
        assert_eq!(parse_date("42"), None);
    }

    #[test]
    fn test_compare_numbers_and_strings() {
        use FilterValue::*;
        assert_eq!(compare_values(&Number(7.0), &Number(5.0)), Some(Ordering::Greater));
        assert_eq!(
            compare_values(&String("abc".into()), &String("abd".into())),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Number(5.0), &String("5".into())),
            Some(Ordering::Equal)
        );
        assert_eq!(compare_values(&Number(5.0), &String("five".into())), None);
        assert_eq!(compare_values(&Bool(true), &Number(1.0)), None);
        assert_eq!(
            compare_values(&Bool(true), &String("true".into())),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_compare_dates() {
        use FilterValue::*;
        let jan = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            compare_values(&String("2020-06-01T00:00:00Z".into()), &Date(jan)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_values(&Date(jan), &String("2020-01-01".into())),
            Some(Ordering::Equal)
        );
        // Different spellings of the same instant are equal
        assert_eq!(
            compare_values(
                &String("2020-01-01T01:00:00+01:00".into()),
                &String("2020-01-01T00:00:00.000Z".into())
            ),
            Some(Ordering::Equal)
        );
        assert_eq!(compare_values(&Date(jan), &String("soon".into())), None);
    }

    #[test]
    fn test_date_string_matches_date() {
        use FilterValue::*;
        let jan = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let rendered = String(format_date(&jan));

        for other in [
            String("abc".into()),
            String("2019-12-31".into()),
            Number(5.0),
            Bool(true),
        ] {
            assert_eq!(
                compare_values(&other, &rendered),
                compare_values(&other, &Date(jan)),
                "{:?}",
                other
            );
        }
        assert_eq!(compare_values(&String("abc".into()), &rendered), None);
        assert_eq!(compare_values(&rendered, &String("zzz".into())), None);
    }

    #[test]
    fn test_json_conversion() {
        assert_eq!(
            FilterValue::from_json(&serde_json::json!(3)),
            Some(FilterValue::Number(3.0))
        );
        assert_eq!(FilterValue::from_json(&serde_json::json!(null)), None);
        assert_eq!(FilterValue::from_json(&serde_json::json!({"a": 1})), None);
        assert_eq!(FilterValue::from(2).to_json(), serde_json::json!(2.0));
    }
}
