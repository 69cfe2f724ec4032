//! Bullet Reconciler: one source of truth between bullet points and free text.
//!
//! The presence of a bullet array makes it authoritative, even when empty.
//! Descriptions are only split when read; the split is never written back except
//! through an explicit edit.

use serde_json::Value;

use crate::cv::fields::{is_absent, scalar_to_string};
use crate::cv::models::EntryContent;

pub const BULLET_KEYS: &[&str] = &["bulletPoints", "bullet_points", "bullets", "achievements"];
pub const DESCRIPTION_KEYS: &[&str] = &["description", "details", "beschreibung", "text"];

const BULLET_MARKERS: &[char] = &['-', '•', '●', '▪', '‣'];
const BULLET_TEXT_KEYS: &[&str] = &["text", "bullet", "content", "value"];

/// Splits free text into bullets: one per line, a single leading marker stripped,
/// blank lines dropped.
pub fn split_description(description: &str) -> Vec<String> {
    description
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix(BULLET_MARKERS).unwrap_or(line).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// The canonical bullet sequence for an entry.
pub fn get_bullets(content: &EntryContent) -> Vec<String> {
    match content {
        EntryContent::Bullets { bullet_points } => bullet_points.clone(),
        EntryContent::Description { description } => split_description(description),
    }
}

/// Materializes bullets with one empty trailing entry for the editor to fill and
/// clears the description. On an entry that already has bullets this only appends
/// another empty entry.
pub fn promote_to_bullets(content: &mut EntryContent) {
    match content {
        EntryContent::Bullets { bullet_points } => bullet_points.push(String::new()),
        EntryContent::Description { description } => {
            let mut bullet_points = split_description(description);
            bullet_points.push(String::new());
            *content = EntryContent::Bullets { bullet_points };
        }
    }
}

/// Replaces bullet `index` in place. An entry still holding free text is first
/// materialized to its split form (without a trailing blank). Out-of-range leaves
/// the content untouched.
pub fn update_bullet(content: &mut EntryContent, index: usize, text: &str) -> bool {
    if index >= get_bullets(content).len() {
        return false;
    }
    materialize(content);
    match content {
        EntryContent::Bullets { bullet_points } => {
            bullet_points[index] = text.to_string();
            true
        }
        EntryContent::Description { .. } => false,
    }
}

pub fn delete_bullet(content: &mut EntryContent, index: usize) -> bool {
    if index >= get_bullets(content).len() {
        return false;
    }
    materialize(content);
    match content {
        EntryContent::Bullets { bullet_points } => {
            bullet_points.remove(index);
            true
        }
        EntryContent::Description { .. } => false,
    }
}

fn materialize(content: &mut EntryContent) {
    if let EntryContent::Description { description } = content {
        let bullet_points = split_description(description);
        *content = EntryContent::Bullets { bullet_points };
    }
}

/// Reads the content of a raw entry and the keys it was taken from.
///
/// A bullet array wins whenever one is present, and every description alias is
/// then discarded. Otherwise the first description alias holding text (or a list,
/// which becomes bullets) is used, and a bullet key holding plain text is the last
/// resort for the description.
pub fn content_from_raw(record: &Value) -> (EntryContent, Vec<&'static str>) {
    let Some(obj) = record.as_object() else {
        return (EntryContent::default(), Vec::new());
    };

    let bullets = BULLET_KEYS
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_array).map(|arr| (*k, arr)));
    if let Some((key, arr)) = bullets {
        let mut used = vec![key];
        used.extend_from_slice(DESCRIPTION_KEYS);
        return (bullets_from(arr), used);
    }

    for key in DESCRIPTION_KEYS.iter().chain(BULLET_KEYS) {
        let Some(value) = obj.get(*key).filter(|v| !is_absent(v)) else {
            continue;
        };
        // Bullet keys only reach here holding non-arrays.
        if let Value::Array(arr) = value {
            return (bullets_from(arr), vec![*key]);
        }
        if let Some(description) = scalar_to_string(value) {
            return (EntryContent::Description { description }, vec![*key]);
        }
    }
    (EntryContent::default(), Vec::new())
}

fn bullets_from(arr: &[Value]) -> EntryContent {
    EntryContent::Bullets {
        bullet_points: arr.iter().filter_map(bullet_text).collect(),
    }
}

/// Text of one raw bullet. An object contributes its text field first, followed by
/// any other values it carries.
fn bullet_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Object(obj) => {
            let primary = BULLET_TEXT_KEYS
                .iter()
                .copied()
                .find(|k| obj.get(*k).is_some_and(|v| !is_absent(v)));
            let parts: Vec<String> = primary
                .and_then(|k| obj.get(k))
                .into_iter()
                .chain(
                    obj.iter()
                        .filter(|(k, v)| Some(k.as_str()) != primary && !is_absent(v))
                        .map(|(_, v)| v),
                )
                .map(leaf_text)
                .collect();
            let text = parts.join(" – ");
            (!text.is_empty()).then_some(text)
        }
        other => Some(leaf_text(other)),
    }
}

fn leaf_text(value: &Value) -> String {
    scalar_to_string(value).unwrap_or_else(|| value.to_string())
}
