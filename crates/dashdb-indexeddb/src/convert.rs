//! Conversions between dashdb records and IndexedDB objects
//!
//! A record is stored as a plain object `{ <keyPath>: key, value: "..." }`.
//! Integer keys become JS numbers and text keys JS strings, so IndexedDB's
//! own key ordering (numbers before strings) matches [`Key`]'s ordering.

use dashdb_core::schema::VALUE_FIELD;
use dashdb_core::{Key, Record};
use wasm_bindgen::JsValue;

use crate::error::{IndexedDbError, Result};

/// Largest integer a JS number holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
const MAX_SAFE_KEY: i64 = 9_007_199_254_740_991;

/// Convert a key to the JS value IndexedDB indexes.
///
/// Integers outside the safe JS range are rejected rather than rounded onto
/// a neighbouring key.
pub fn key_to_js(key: &Key) -> Result<JsValue> {
    match key {
        Key::Int(n) => Ok(JsValue::from_f64(int_key_to_f64(*n)?)),
        Key::Text(s) => Ok(JsValue::from_str(s)),
    }
}

fn int_key_to_f64(n: i64) -> Result<f64> {
    if n.unsigned_abs() > MAX_SAFE_KEY as u64 {
        return Err(IndexedDbError::InvalidRecord(format!(
            "key {} is outside the safe integer range",
            n
        )));
    }
    Ok(n as f64)
}

/// Convert a stored JS key back to a [`Key`]
pub fn key_from_js(val: &JsValue) -> Result<Key> {
    if let Some(s) = val.as_string() {
        return Ok(Key::Text(s));
    }
    match val.as_f64() {
        Some(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => Ok(Key::Int(n as i64)),
        Some(n) => Err(IndexedDbError::InvalidRecord(format!(
            "key {} is not an integer",
            n
        ))),
        None => Err(IndexedDbError::InvalidRecord(format!(
            "unsupported key {:?}",
            val
        ))),
    }
}

/// Build the stored object for `record`.
pub fn record_to_js(record: &Record, key_path: &str) -> Result<JsValue> {
    let obj = js_sys::Object::new();
    set_prop(&obj, key_path, &key_to_js(&record.key)?)?;
    set_prop(&obj, VALUE_FIELD, &JsValue::from_str(&record.value))?;
    Ok(obj.into())
}

/// Read a stored object back into a [`Record`].
pub fn record_from_js(val: &JsValue, key_path: &str) -> Result<Record> {
    let key = key_from_js(&get_prop(val, key_path)?)?;
    let value = get_prop(val, VALUE_FIELD)?
        .as_string()
        .ok_or_else(|| IndexedDbError::InvalidRecord(format!("{} is not a string", VALUE_FIELD)))?;
    Ok(Record { key, value })
}

/// Set a property on a JS object.
fn set_prop(obj: &js_sys::Object, key: &str, val: &JsValue) -> Result<()> {
    js_sys::Reflect::set(obj, &key.into(), val)
        .map_err(|_| IndexedDbError::JsValue(format!("failed to set property: {}", key)))?;
    Ok(())
}

/// Get a property from a JS object.
fn get_prop(val: &JsValue, key: &str) -> Result<JsValue> {
    js_sys::Reflect::get(val, &key.into())
        .map_err(|_| IndexedDbError::InvalidRecord(format!("missing property: {}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_integer_bounds() {
        assert_eq!(int_key_to_f64(MAX_SAFE_KEY).unwrap(), MAX_SAFE_INTEGER);
        assert_eq!(int_key_to_f64(-MAX_SAFE_KEY).unwrap(), -MAX_SAFE_INTEGER);
        assert_eq!(int_key_to_f64(0).unwrap(), 0.0);
    }

    #[test]
    fn test_unsafe_integer_rejected() {
        // 2^53 + 1 would round onto 2^53
        for n in [MAX_SAFE_KEY + 1, MAX_SAFE_KEY + 2, -MAX_SAFE_KEY - 1, i64::MIN, i64::MAX] {
            match int_key_to_f64(n) {
                Err(IndexedDbError::InvalidRecord(msg)) => assert!(msg.contains(&n.to_string())),
                other => panic!("expected InvalidRecord for {}, got {:?}", n, other),
            }
        }
    }
}
