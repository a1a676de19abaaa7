//! Inspection helpers for loosely-typed JSON maps.
//!
//! Request payloads often arrive as `serde_json::Map<String, Value>`. The
//! `is_*` functions validate presence and type of a key with user-facing
//! error messages, while the accessor functions return an empty/zero value
//! instead of failing.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// A JSON object.
pub type JsonMap = Map<String, Value>;

/// Map value validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapValueError {
    /// Key is absent
    #[error("{0} must be provided")]
    MissingKey(String),

    /// Key present with a value of another type
    #[error("{key} found with wrong type: expected {expected}")]
    WrongType {
        /// Offending key
        key: String,
        /// Human-readable expected type
        expected: &'static str,
    },

    /// Array element is not an object
    #[error("Object at index {0} in array found with wrong type: expected JSON object")]
    WrongElementType(usize),

    /// Struct has no field with the requested name
    #[error("key not found")]
    KeyNotFound,

    /// Value does not serialize to a JSON object
    #[error("value must serialize to a JSON object")]
    NotAnObject,
}

fn require<'a>(source: &'a JsonMap, key: &str) -> Result<&'a Value, MapValueError> {
    source
        .get(key)
        .ok_or_else(|| MapValueError::MissingKey(key.to_string()))
}

/// Check that `key` exists and holds a string.
///
/// # Errors
///
/// Returns [`MapValueError`] when the key is missing or not a string.
pub fn is_string(source: &JsonMap, key: &str) -> Result<(), MapValueError> {
    match require(source, key)? {
        Value::String(_) => Ok(()),
        _ => Err(MapValueError::WrongType {
            key: key.to_string(),
            expected: "string",
        }),
    }
}

/// String value for `key`, empty when missing or not a string.
#[must_use]
pub fn string<'a>(source: &'a JsonMap, key: &str) -> &'a str {
    source.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Boolean value for `key`, `default` when missing or not a boolean.
#[must_use]
pub fn bool(source: &JsonMap, key: &str, default: bool) -> bool {
    source.get(key).and_then(Value::as_bool).unwrap_or(default)
}

/// Integer value for `key`, truncating fractional numbers; 0 when missing
/// or not a number.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn integer(source: &JsonMap, key: &str) -> i64 {
    match source.get(key) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64),
        _ => 0,
    }
}

/// Check that `key` exists and holds an array of objects.
///
/// # Errors
///
/// Returns [`MapValueError`] when the key is missing, not an array, or any
/// element is not an object.
pub fn is_map_slice(source: &JsonMap, key: &str) -> Result<(), MapValueError> {
    let Value::Array(items) = require(source, key)? else {
        return Err(MapValueError::WrongType {
            key: key.to_string(),
            expected: "JSON array",
        });
    };

    match items.iter().position(|item| !item.is_object()) {
        Some(index) => Err(MapValueError::WrongElementType(index)),
        None => Ok(()),
    }
}

/// Array of objects for `key`, empty when missing, not an array, or when
/// any element is not an object.
#[must_use]
pub fn map_slice<'a>(source: &'a JsonMap, key: &str) -> Vec<&'a JsonMap> {
    source
        .get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.iter().map(Value::as_object).collect::<Option<Vec<_>>>())
        .unwrap_or_default()
}

/// Array of strings for `key`, empty when missing, not an array, or when any
/// element is not a string.
#[must_use]
pub fn string_slice<'a>(source: &'a JsonMap, key: &str) -> Vec<&'a str> {
    source
        .get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.iter().map(Value::as_str).collect::<Option<Vec<_>>>())
        .unwrap_or_default()
}

/// Check that `key` exists and holds an object.
///
/// # Errors
///
/// Returns [`MapValueError`] when the key is missing or not an object.
pub fn is_map(source: &JsonMap, key: &str) -> Result<(), MapValueError> {
    match require(source, key)? {
        Value::Object(_) => Ok(()),
        _ => Err(MapValueError::WrongType {
            key: key.to_string(),
            expected: "JSON object",
        }),
    }
}

/// Object for `key`, empty when missing or not an object.
#[must_use]
pub fn map(source: &JsonMap, key: &str) -> JsonMap {
    source
        .get(key)
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

/// Convert any serializable value into `T` through its JSON representation.
///
/// # Errors
///
/// Returns the serde error when `input` does not fit the shape of `T`.
pub fn cast<I: Serialize + ?Sized, T: DeserializeOwned>(input: &I) -> Result<T, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(input)?)
}

/// Whether `items` contains `key` exactly.
#[must_use]
pub fn string_slice_contains_key<S: AsRef<str>>(items: &[S], key: &str) -> bool {
    items.iter().any(|item| item.as_ref() == key)
}

/// Find `item` in `items` ignoring case, returning the stored spelling.
#[must_use]
pub fn string_slice_contains_key_case_insensitive<'a, S: AsRef<str>>(
    items: &'a [S],
    item: &str,
) -> Option<&'a str> {
    let wanted = item.to_lowercase();
    items
        .iter()
        .map(AsRef::as_ref)
        .find(|candidate| candidate.to_lowercase() == wanted)
}

/// Whether `input` parses as a UUID.
#[must_use]
pub fn is_valid_uuid(input: &str) -> bool {
    Uuid::parse_str(input).is_ok()
}

/// Shallow copy of a map.
#[must_use]
pub fn copy_map(input: &JsonMap) -> JsonMap {
    input.clone()
}

/// Last element and the remaining prefix, `None` when empty.
#[must_use]
pub fn pop<T>(slice: &[T]) -> Option<(&T, &[T])> {
    slice.split_last()
}

fn same_kind(current: &Value, candidate: &Value) -> bool {
    match (current, candidate) {
        (Value::Number(a), Value::Number(b)) => a.is_f64() == b.is_f64(),
        (Value::String(_), Value::String(_))
        | (Value::Bool(_), Value::Bool(_))
        | (Value::Array(_), Value::Array(_))
        | (Value::Object(_), Value::Object(_))
        | (Value::Null, Value::Null) => true,
        _ => false,
    }
}

fn to_object<T: Serialize>(input: &T) -> Result<JsonMap, crate::CommonError> {
    match serde_json::to_value(input)? {
        Value::Object(object) => Ok(object),
        _ => Err(MapValueError::NotAnObject.into()),
    }
}

/// Build a new `T` from `input`, overriding every field whose name appears in
/// `overrides` with a value of the same JSON kind.
///
/// Fields absent from `overrides`, or present with a different kind, keep the
/// value from `input`. Integer fields only accept integer overrides.
///
/// # Errors
///
/// Returns an error when `T` does not serialize to a JSON object.
pub fn combine_struct_with_map<T>(input: &T, overrides: &JsonMap) -> Result<T, crate::CommonError>
where
    T: Serialize + DeserializeOwned,
{
    let mut fields = to_object(input)?;
    for (name, current) in &mut fields {
        if let Some(candidate) = overrides.get(name) {
            if same_kind(current, candidate) {
                current.clone_from(candidate);
            }
        }
    }
    Ok(serde_json::from_value(Value::Object(fields))?)
}

/// Field `key` of `input` rendered as a string.
///
/// # Errors
///
/// Returns [`MapValueError::KeyNotFound`] when `input` has no such field.
pub fn get_value<T: Serialize>(input: &T, key: &str) -> Result<String, crate::CommonError> {
    let fields = to_object(input)?;
    let value = fields.get(key).ok_or(MapValueError::KeyNotFound)?;
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn object(value: Value) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    fn places() -> JsonMap {
        object(json!({
            "taco mamacita": "north shore",
            "stir": "southside",
            "chili's": ["downtown", "near the mall"],
        }))
    }

    fn venues() -> JsonMap {
        object(json!({
            "restaurants": "main street meats",
            "bars": [{"stir": "southside"}, {"mike's": "northshore"}],
            "gyms": ["non map interface", {"sportsbarn": "downtown"}],
            "pubs": {"stir": "southside"},
        }))
    }

    #[test]
    fn test_is_string() {
        let places = places();
        assert!(is_string(&places, "stir").is_ok());
        assert_eq!(
            is_string(&places, "community pie").unwrap_err().to_string(),
            "community pie must be provided"
        );
        assert_eq!(
            is_string(&places, "chili's").unwrap_err().to_string(),
            "chili's found with wrong type: expected string"
        );
    }

    #[test]
    fn test_string() {
        let places = places();
        assert_eq!(string(&places, "stir"), "southside");
        assert_eq!(string(&places, "community pie"), "");
        assert_eq!(string(&places, "chili's"), "");
    }

    #[test]
    fn test_bool_and_integer() {
        let source = object(json!({"on": true, "count": 12.9, "big": 7, "name": "x"}));
        assert!(bool(&source, "on", false));
        assert!(bool(&source, "name", true));
        assert!(!bool(&source, "missing", false));
        assert_eq!(integer(&source, "count"), 12);
        assert_eq!(integer(&source, "big"), 7);
        assert_eq!(integer(&source, "name"), 0);
    }

    #[test]
    fn test_is_map_slice() {
        let venues = venues();
        assert!(is_map_slice(&venues, "bars").is_ok());
        assert_eq!(
            is_map_slice(&venues, "offices").unwrap_err().to_string(),
            "offices must be provided"
        );
        assert_eq!(
            is_map_slice(&venues, "restaurants").unwrap_err().to_string(),
            "restaurants found with wrong type: expected JSON array"
        );
        assert_eq!(
            is_map_slice(&venues, "gyms").unwrap_err().to_string(),
            "Object at index 0 in array found with wrong type: expected JSON object"
        );
    }

    #[test]
    fn test_map_slice() {
        let venues = venues();
        let bars = map_slice(&venues, "bars");
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].get("stir"), Some(&json!("southside")));
        assert!(map_slice(&venues, "offices").is_empty());
        assert!(map_slice(&venues, "restaurants").is_empty());
        assert!(map_slice(&venues, "gyms").is_empty());
    }

    #[test]
    fn test_string_slice() {
        let places = places();
        assert_eq!(string_slice(&places, "chili's"), vec!["downtown", "near the mall"]);
        assert!(string_slice(&places, "stir").is_empty());
        assert!(string_slice(&venues(), "gyms").is_empty());
    }

    #[test]
    fn test_is_map_and_map() {
        let venues = venues();
        assert!(is_map(&venues, "pubs").is_ok());
        assert_eq!(
            is_map(&venues, "offices").unwrap_err().to_string(),
            "offices must be provided"
        );
        assert_eq!(
            is_map(&venues, "restaurants").unwrap_err().to_string(),
            "restaurants found with wrong type: expected JSON object"
        );
        assert_eq!(map(&venues, "pubs"), object(json!({"stir": "southside"})));
        assert!(map(&venues, "restaurants").is_empty());
    }

    #[test]
    fn test_contains_key() {
        let items = vec!["Alpha".to_string(), "beta".to_string()];
        assert!(string_slice_contains_key(&items, "beta"));
        assert!(!string_slice_contains_key(&items, "alpha"));
        assert_eq!(string_slice_contains_key_case_insensitive(&items, "ALPHA"), Some("Alpha"));
        assert_eq!(string_slice_contains_key_case_insensitive(&items, "gamma"), None);
    }

    #[test]
    fn test_uuid_and_pop() {
        assert!(is_valid_uuid("a8098c1a-f86e-11da-bd1a-00112444be1e"));
        assert!(!is_valid_uuid("not-a-uuid"));

        let items = ["a", "b", "c"];
        let (last, rest) = pop(&items).unwrap();
        assert_eq!(*last, "c");
        assert_eq!(rest, &["a", "b"]);
        assert!(pop::<&str>(&[]).is_none());
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[allow(non_snake_case)]
    struct LineItem {
        Quantity: i64,
        Price: f64,
        Name: String,
    }

    #[test]
    fn test_combine_struct_with_map() {
        let input = LineItem {
            Quantity: 12,
            Price: 19.0,
            Name: "sock".to_string(),
        };
        let overrides = object(json!({"Quantity": 1, "Name": "box", "Price": "free"}));

        let combined = combine_struct_with_map(&input, &overrides).unwrap();
        assert_eq!(
            combined,
            LineItem {
                Quantity: 1,
                Price: 19.0,
                Name: "box".to_string(),
            }
        );
    }

    #[test]
    fn test_combine_rejects_float_for_integer() {
        let input = LineItem {
            Quantity: 3,
            Price: 1.5,
            Name: "pen".to_string(),
        };
        let overrides = object(json!({"Quantity": 2.5, "Price": 2.25}));

        let combined = combine_struct_with_map(&input, &overrides).unwrap();
        assert_eq!(combined.Quantity, 3);
        assert!((combined.Price - 2.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_get_value() {
        let input = LineItem {
            Quantity: 4,
            Price: 2.5,
            Name: "hat".to_string(),
        };
        assert_eq!(get_value(&input, "Name").unwrap(), "hat");
        assert_eq!(get_value(&input, "Quantity").unwrap(), "4");
        assert_eq!(get_value(&input, "Color").unwrap_err().to_string(), "key not found");
    }

    #[test]
    fn test_cast() {
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }
        let named: Named = cast(&json!({"name": "zed", "extra": 1})).unwrap();
        assert_eq!(named.name, "zed");
        assert!(cast::<_, Named>(&json!({"other": 1})).is_err());
    }
}
