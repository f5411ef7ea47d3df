//! Store - Typed key/value storage for game state

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A localized string: the source text plus the text for the active locale
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedString {
    pub original: String,
    pub translated: String,
}

impl LocalizedString {
    /// Create a new localized string
    pub fn new(original: impl Into<String>, translated: impl Into<String>) -> Self {
        Self {
            original: original.into(),
            translated: translated.into(),
        }
    }

    /// A string with no translation, shown as-is in every locale
    pub fn untranslated(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            original: text.clone(),
            translated: text,
        }
    }
}

impl fmt::Display for LocalizedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.translated)
    }
}

/// Kind of value held in a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Bool,
    Int,
    String,
    Localized,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            ValueKind::Bool => "bool",
            ValueKind::Int => "int",
            ValueKind::String => "string",
            ValueKind::Localized => "localized",
        })
    }
}

/// A stored value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Bool(bool),
    Int(i32),
    String(String),
    Localized(LocalizedString),
}

impl Value {
    /// Get the kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::String(_) => ValueKind::String,
            Value::Localized(_) => ValueKind::Localized,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Localized(l) => write!(f, "{:?} ({:?})", l.translated, l.original),
        }
    }
}

/// Types that can be stored in a [`ValueStore`]
pub trait StoreValue: Sized {
    fn from_value(value: &Value) -> Option<Self>;
    fn into_value(self) -> Value;
}

impl StoreValue for bool {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl StoreValue for i32 {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl StoreValue for String {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::String(self)
    }
}

impl StoreValue for LocalizedString {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Localized(l) => Some(l.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> Value {
        Value::Localized(self)
    }
}

/// In-memory mapping from keys to typed values
///
/// Reads never fail: an absent key, or a key holding a value of another
/// type, yields the caller's default. Keys are kept ordered so that
/// iteration (and therefore encoding) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueStore {
    values: BTreeMap<String, Value>,
}

impl ValueStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value, falling back to `default`
    pub fn get<T: StoreValue>(&self, key: &str, default: T) -> T {
        self.values
            .get(key)
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    /// Set a value, overwriting whatever was there
    pub fn set<T: StoreValue>(&mut self, key: &str, value: T) {
        self.insert(key.to_string(), value.into_value());
    }

    /// Insert an already-built value
    pub fn insert(&mut self, key: String, value: Value) {
        if let Some(existing) = self.values.get(&key) {
            if existing.kind() != value.kind() {
                tracing::warn!(
                    key = %key,
                    from = %existing.kind(),
                    to = %value.kind(),
                    "Store key re-typed"
                );
            }
        }
        self.values.insert(key, value);
    }

    /// Get the raw value for a key
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Check if a key has been written
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key, false)
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set(key, value);
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        self.get(key, default)
    }

    pub fn set_int(&mut self, key: &str, value: i32) {
        self.set(key, value);
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key, default.to_string())
    }

    pub fn set_string(&mut self, key: &str, value: &str) {
        self.set(key, value.to_string());
    }

    pub fn get_localized(&self, key: &str) -> LocalizedString {
        self.get(key, LocalizedString::default())
    }

    pub fn set_localized(&mut self, key: &str, value: LocalizedString) {
        self.set(key, value);
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}
