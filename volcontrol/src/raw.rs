//! Untyped payload tree as received from the player.
//!
//! The player's `getState` answer has no fixed schema: the same quantity may
//! show up under different keys, nested or not, as a number or a string.
//! [`RawSnapshot`] keeps the payload as-is so the resolver and the merge
//! policy can inspect it without committing to a shape.

use serde_json::Value;

use crate::errors::ControlError;

/// A node of the payload tree.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum RawSnapshot {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Mapping(RawMapping),
    Sequence(Vec<RawSnapshot>),
}

/// Insertion-ordered string-keyed mapping.
///
/// Order matters: candidates found in the payload are tried in the order the
/// player emitted them.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct RawMapping {
    entries: Vec<(String, RawSnapshot)>,
}

impl RawMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&RawSnapshot> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Inserts or replaces `key`. A replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: RawSnapshot) -> Option<RawSnapshot> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<RawSnapshot> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawSnapshot)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Shallow field-by-field merge: every top-level key of `other` replaces
    /// or extends `self`; keys absent from `other` are left untouched.
    pub fn update(&mut self, other: RawMapping) {
        for (key, value) in other.entries {
            self.insert(key, value);
        }
    }
}

impl FromIterator<(String, RawSnapshot)> for RawMapping {
    fn from_iter<T: IntoIterator<Item = (String, RawSnapshot)>>(iter: T) -> Self {
        let mut map = RawMapping::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl RawSnapshot {
    /// Parses a JSON document into a tree.
    pub fn from_json_str(body: &str) -> Result<Self, ControlError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| ControlError::Json(e.to_string()))?;
        Ok(RawSnapshot::from(value))
    }

    pub fn as_mapping(&self) -> Option<&RawMapping> {
        match self {
            RawSnapshot::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn into_mapping(self) -> Option<RawMapping> {
        match self {
            RawSnapshot::Mapping(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, RawSnapshot::Mapping(_))
    }

    /// Looks up a top-level key; `None` when `self` is not a mapping.
    pub fn get(&self, key: &str) -> Option<&RawSnapshot> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawSnapshot::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Renders scalar leaves as display text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawSnapshot::String(s) => Some(s.clone()),
            RawSnapshot::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            RawSnapshot::Number(n) => Some(n.to_string()),
            RawSnapshot::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Depth-first search for every value whose key contains one of
    /// `needles`, compared case-insensitively. `needles` must be lowercase.
    ///
    /// A key's value is reported before the values found below it, and a key
    /// matching several needles is reported once.
    pub fn deep_find<'a>(&'a self, needles: &[&str]) -> Vec<&'a RawSnapshot> {
        let mut found = Vec::new();
        self.deep_find_into(needles, &mut found);
        found
    }

    fn deep_find_into<'a>(&'a self, needles: &[&str], found: &mut Vec<&'a RawSnapshot>) {
        match self {
            RawSnapshot::Mapping(map) => {
                for (key, value) in map.iter() {
                    let lowered = key.to_lowercase();
                    if needles.iter().any(|n| lowered.contains(n)) {
                        found.push(value);
                    }
                    value.deep_find_into(needles, found);
                }
            }
            RawSnapshot::Sequence(items) => {
                for item in items {
                    item.deep_find_into(needles, found);
                }
            }
            _ => {}
        }
    }
}

impl From<Value> for RawSnapshot {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawSnapshot::Null,
            Value::Bool(b) => RawSnapshot::Bool(b),
            Value::Number(n) => n.as_f64().map(RawSnapshot::Number).unwrap_or_default(),
            Value::String(s) => RawSnapshot::String(s),
            Value::Array(items) => {
                RawSnapshot::Sequence(items.into_iter().map(RawSnapshot::from).collect())
            }
            Value::Object(map) => RawSnapshot::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, RawSnapshot::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<RawMapping> for RawSnapshot {
    fn from(map: RawMapping) -> Self {
        RawSnapshot::Mapping(map)
    }
}

impl From<f64> for RawSnapshot {
    fn from(n: f64) -> Self {
        RawSnapshot::Number(n)
    }
}

impl From<&str> for RawSnapshot {
    fn from(s: &str) -> Self {
        RawSnapshot::String(s.to_string())
    }
}
