//! Language Classifier & Extractor.
//!
//! Spoken languages regularly end up inside skill lists produced upstream. Entries
//! that look like a language are moved (not copied) to the languages section.
//! The match is a substring heuristic over a fixed name list; it is deterministic
//! but approximate, and there is no override for a misclassified skill.

use std::collections::HashSet;

use serde_json::Value;

use crate::cv::fields::{is_absent, scalar_to_string, FieldReader};
use crate::cv::models::LanguageItem;

/// Lower-case language names, German and English spellings.
const LANGUAGE_NAMES: &[&str] = &[
    "deutsch",
    "englisch",
    "französisch",
    "spanisch",
    "italienisch",
    "portugiesisch",
    "russisch",
    "polnisch",
    "türkisch",
    "arabisch",
    "chinesisch",
    "japanisch",
    "koreanisch",
    "niederländisch",
    "schwedisch",
    "norwegisch",
    "dänisch",
    "finnisch",
    "griechisch",
    "tschechisch",
    "ungarisch",
    "rumänisch",
    "kroatisch",
    "serbisch",
    "ukrainisch",
    "persisch",
    "hebräisch",
    "german",
    "english",
    "french",
    "spanish",
    "italian",
    "portuguese",
    "russian",
    "polish",
    "turkish",
    "arabic",
    "chinese",
    "mandarin",
    "cantonese",
    "japanese",
    "korean",
    "dutch",
    "swedish",
    "norwegian",
    "danish",
    "finnish",
    "greek",
    "czech",
    "hungarian",
    "romanian",
    "croatian",
    "serbian",
    "ukrainian",
    "hindi",
    "persian",
    "farsi",
    "hebrew",
];

/// Object keys that mark an entry as a language regardless of its content.
const LANGUAGE_FIELDS: &[&str] = &["language", "sprache", "niveau", "level"];

pub const LANGUAGE_NAME_KEYS: &[&str] = &["language", "name", "sprache", "skill", "title"];
pub const LANGUAGE_LEVEL_KEYS: &[&str] = &["level", "niveau", "proficiency", "stufe"];
const LANGUAGE_OUTPUT_KEYS: &[&str] = &["language", "level"];

fn mentions_language(text: &str) -> bool {
    let lower = text.to_lowercase();
    LANGUAGE_NAMES.iter().any(|name| lower.contains(name))
}

/// Classifies one raw entry of a skill-like list.
pub fn is_language(value: &Value) -> bool {
    match value {
        Value::String(s) => mentions_language(s),
        Value::Object(obj) => {
            LANGUAGE_FIELDS.iter().any(|k| obj.contains_key(*k))
                || serde_json::to_string(value)
                    .map(|s| mentions_language(&s))
                    .unwrap_or(false)
        }
        _ => false,
    }
}

/// Splits a raw skill list into `(skills, languages)`, preserving order in both.
pub fn partition_languages(raw: &[Value]) -> (Vec<&Value>, Vec<&Value>) {
    raw.iter().partition(|v| !is_language(v))
}

/// Maps any accepted language shape to `{ language, level }`, keeping unrecognized
/// object fields as extras.
///
/// An object is kept even when both fields are blank, since a blank entry is what
/// the editor adds. `None` for absent scalars and for arrays.
pub fn normalize_language(raw: &Value) -> Option<LanguageItem> {
    match raw {
        Value::Object(_) => {
            let mut reader = FieldReader::new(raw);
            let language = reader.take(LANGUAGE_NAME_KEYS);
            let level = reader.take(LANGUAGE_LEVEL_KEYS);
            Some(LanguageItem {
                language,
                level,
                extra: reader.leftovers(LANGUAGE_OUTPUT_KEYS),
            })
        }
        other if is_absent(other) => None,
        other => scalar_to_string(other).map(|language| LanguageItem::new(language, "")),
    }
}

/// Collapses entries with the same language (trimmed, case-insensitive).
/// The first occurrence wins. Entries with a blank language are never collapsed.
pub fn dedup_languages(items: Vec<LanguageItem>) -> Vec<LanguageItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let key = item.dedup_key();
            key.is_empty() || seen.insert(key)
        })
        .collect()
}
