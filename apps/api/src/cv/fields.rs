//! Field Resolver: priority-ordered alias lookup over loosely-typed JSON records.
//!
//! Absence (missing key, `null`, empty or whitespace-only string) is never an error:
//! every lookup falls through to the next alias and finally to a default.

use std::collections::BTreeMap;

use serde_json::Value;

/// True for `null` and for strings that are empty after trimming.
pub fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Returns the value of the first alias that is present and non-empty.
pub fn resolve<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj = record.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !is_absent(v))
}

/// String form of a scalar. Objects and arrays have none.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First non-empty scalar under any alias, as a string. Non-scalar values under an
/// alias are skipped rather than stringified.
pub fn resolve_opt(record: &Value, keys: &[&str]) -> Option<String> {
    resolve_keyed(record, keys).map(|(_, value)| value)
}

/// `resolve_opt` that also names the alias the value came from.
pub fn resolve_keyed<'k>(record: &Value, keys: &[&'k str]) -> Option<(&'k str, String)> {
    let obj = record.as_object()?;
    keys.iter().find_map(|k| {
        obj.get(*k)
            .filter(|v| !is_absent(v))
            .and_then(scalar_to_string)
            .map(|value| (*k, value))
    })
}

pub fn resolve_str(record: &Value, keys: &[&str], default: &str) -> String {
    resolve_opt(record, keys).unwrap_or_else(|| default.to_string())
}

/// The collection stored under the first present alias. A malformed (non-array)
/// value is treated as an empty collection.
pub fn resolve_array<'a>(record: &'a Value, keys: &[&str]) -> &'a [Value] {
    resolve(record, keys)
        .and_then(|v| v.as_array())
        .map(|arr| arr.as_slice())
        .unwrap_or(&[])
}

/// The first alias holding a JSON object.
pub fn resolve_object<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let obj = record.as_object()?;
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| v.is_object())
}

/// Non-absent fields of `record` that no alias consumed.
///
/// A leftover whose key is one of the `reserved` output names would be shadowed by
/// the canonical field, so it is carried as `<key>Raw`.
pub fn leftover_fields(record: &Value, consumed: &[&str], reserved: &[&str]) -> BTreeMap<String, Value> {
    let Some(obj) = record.as_object() else {
        return BTreeMap::new();
    };
    obj.iter()
        .filter(|(k, v)| !is_absent(v) && !consumed.contains(&k.as_str()))
        .map(|(k, v)| {
            let key = if reserved.contains(&k.as_str()) {
                format!("{k}Raw")
            } else {
                k.clone()
            };
            (key, v.clone())
        })
        .collect()
}

/// Reads the fields of one raw record, remembering which aliases supplied values
/// so everything else can be carried over as extras.
pub struct FieldReader<'a> {
    record: &'a Value,
    used: Vec<&'static str>,
}

impl<'a> FieldReader<'a> {
    pub fn new(record: &'a Value) -> Self {
        Self {
            record,
            used: Vec::new(),
        }
    }

    /// The first non-empty scalar alias, or an empty string.
    pub fn take(&mut self, keys: &[&'static str]) -> String {
        match resolve_keyed(self.record, keys) {
            Some((key, value)) => {
                self.used.push(key);
                value
            }
            None => String::new(),
        }
    }

    pub fn consume(&mut self, keys: impl IntoIterator<Item = &'static str>) {
        self.used.extend(keys);
    }

    pub fn leftovers(&self, reserved: &[&str]) -> BTreeMap<String, Value> {
        leftover_fields(self.record, &self.used, reserved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_str_first_non_empty_alias_wins() {
        let record = json!({"title": "", "position": null, "role": "Engineer", "jobTitle": "Dev"});
        assert_eq!(
            resolve_str(&record, &["title", "position", "role", "jobTitle"], ""),
            "Engineer"
        );
    }

    #[test]
    fn test_resolve_str_falls_back_to_default() {
        let record = json!({"other": "x"});
        assert_eq!(resolve_str(&record, &["title"], "n/a"), "n/a");
        assert_eq!(resolve_str(&json!("not an object"), &["title"], ""), "");
    }

    #[test]
    fn test_resolve_str_stringifies_numbers_and_skips_objects() {
        let record = json!({"dateFrom": {"y": 1}, "startDate": 2019});
        assert_eq!(resolve_str(&record, &["dateFrom", "startDate"], ""), "2019");
    }

    #[test]
    fn test_resolve_array_treats_malformed_as_empty() {
        let record = json!({"experience": "lots"});
        assert!(resolve_array(&record, &["experience"]).is_empty());
        let record = json!({"workExperiences": [1, 2]});
        assert_eq!(resolve_array(&record, &["experience", "workExperiences"]).len(), 2);
    }

    #[test]
    fn test_leftover_fields_skips_consumed_keys_and_nulls() {
        let record = json!({"title": "a", "position": "b", "location": "Berlin", "note": null});
        let extra = leftover_fields(&record, &["title"], &["title"]);
        assert_eq!(extra.len(), 2);
        assert_eq!(extra["position"], "b");
        assert_eq!(extra["location"], "Berlin");
    }

    #[test]
    fn test_unconsumed_reserved_key_is_renamed() {
        let record = json!({"dateFrom": {"y": 2019}, "startDate": "2019-04"});
        let mut reader = FieldReader::new(&record);
        assert_eq!(reader.take(&["dateFrom", "startDate"]), "2019-04");
        let extra = reader.leftovers(&["dateFrom"]);
        assert_eq!(extra.len(), 1);
        assert_eq!(extra["dateFromRaw"], json!({"y": 2019}));
    }

    #[test]
    fn test_reader_keeps_losing_aliases() {
        let record = json!({"title": "Eng", "position": "Senior Eng", "role": ""});
        let mut reader = FieldReader::new(&record);
        assert_eq!(reader.take(&["title", "position", "role"]), "Eng");
        let extra = reader.leftovers(&["title"]);
        assert_eq!(extra.len(), 1);
        assert_eq!(extra["position"], "Senior Eng");
    }
}
