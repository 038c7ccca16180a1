//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Field-name casing between the wire (camelCase) and memory (snake_case).
use serde_json::{Map, Value};

/// Payload fields whose values are application data; their keys are never renamed.
pub const OPAQUE_FIELDS: [&str; 2] = ["parameters", "context"];

/// Target casing for [`translate_keys`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCase {
    /// snake_case to camelCase, applied when encoding.
    Camel,
    /// camelCase to snake_case, applied when decoding.
    Snake,
}

impl KeyCase {
    fn convert(self, key: &str) -> String {
        match self {
            KeyCase::Camel => snake_to_camel(key),
            KeyCase::Snake => camel_to_snake(key),
        }
    }
}

/// Convert `water_level` to `waterLevel`.
///
/// The first segment is kept as written; every later non-empty segment gets its
/// first character upper-cased. Empty segments from doubled or trailing
/// underscores are dropped.
pub fn snake_to_camel(name: &str) -> String {
    let mut parts = name.split('_');
    let mut out = String::with_capacity(name.len());
    if let Some(first) = parts.next() {
        out.push_str(first);
    }
    for part in parts {
        let mut chars = part.chars();
        if let Some(head) = chars.next() {
            out.extend(head.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}

/// Convert `waterLevel` to `water_level`.
///
/// An underscore goes in front of an upper-case letter only when the previous
/// character is a lower-case letter or digit, so a run of capitals stays one
/// word: `deviceID` becomes `device_id`.
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch.is_ascii_uppercase()
            && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
        prev = Some(ch);
    }
    out
}

/// Recursively rename every object key in `value` to `case`.
///
/// Renaming stops below any key whose snake_case form is in [`OPAQUE_FIELDS`];
/// the subtree is still walked, but its keys are emitted untouched.
pub fn translate_keys(value: Value, case: KeyCase) -> Value {
    rename(value, case, false)
}

fn rename(value: Value, case: KeyCase, preserve: bool) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, child) in map {
                if preserve {
                    out.insert(key, rename(child, case, true));
                    continue;
                }
                let renamed = case.convert(&key);
                // Encoding checks the name before renaming, decoding after; both are snake_case.
                let snake = match case {
                    KeyCase::Camel => key.as_str(),
                    KeyCase::Snake => renamed.as_str(),
                };
                let opaque = OPAQUE_FIELDS.contains(&snake);
                let child = rename(child, case, opaque);
                out.insert(renamed, child);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rename(item, case, preserve))
                .collect(),
        ),
        scalar => scalar,
    }
}
