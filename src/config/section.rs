//! A single named section and its typed accessors.

use crate::error::{CompileError, Result, ValueType};

/// Delimiter used by list-valued keys unless a caller asks for another.
pub const LIST_DELIMITER: char = ',';

/// A value type that can be read out of a raw config string.
pub trait ConfigValue: Sized {
    /// Type reported in [`CompileError::TypeMismatch`] when parsing fails.
    const TYPE: ValueType;

    fn parse_value(raw: &str) -> Option<Self>;
}

impl ConfigValue for i64 {
    const TYPE: ValueType = ValueType::Int;

    fn parse_value(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl ConfigValue for f64 {
    const TYPE: ValueType = ValueType::Float;

    fn parse_value(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl ConfigValue for bool {
    const TYPE: ValueType = ValueType::Bool;

    fn parse_value(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Some(true),
            "0" | "no" | "false" | "off" => Some(false),
            _ => None,
        }
    }
}

/// An order-preserving mapping from key to raw value.
///
/// Keys are stored lowercased and looked up case-insensitively. Inserting an
/// existing key replaces its value without moving it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl ConfigSection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Builder-style insert, handy for constructing sections in code.
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        let key = key.to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.raw(key).is_some()
    }

    /// Keys in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, raw value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Raw value of `key`, if present.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn raw_mut(&mut self, key: &str) -> Option<&mut String> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Raw value of `key`, failing with `MissingKey` if absent.
    pub fn get_str(&self, key: &str) -> Result<&str> {
        self.raw(key).ok_or_else(|| CompileError::MissingKey {
            layer: self.name.clone(),
            key: key.to_string(),
        })
    }

    /// Parse `key` as a `T`.
    pub fn get<T: ConfigValue>(&self, key: &str) -> Result<T> {
        let raw = self.get_str(key)?;
        T::parse_value(raw).ok_or_else(|| self.type_mismatch(key, T::TYPE))
    }

    /// Parse `key` as a `delimiter`-separated list of `T`. Fails if any
    /// element does not parse.
    pub fn get_list<T: ConfigValue>(&self, key: &str, delimiter: char) -> Result<Vec<T>> {
        let raw = self.get_str(key)?;
        raw.split(delimiter)
            .map(|item| T::parse_value(item).ok_or_else(|| self.type_mismatch(key, T::TYPE.list())))
            .collect()
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_float(&self, key: &str) -> Result<f64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn get_int_list(&self, key: &str) -> Result<Vec<i64>> {
        self.get_list(key, LIST_DELIMITER)
    }

    pub fn get_float_list(&self, key: &str) -> Result<Vec<f64>> {
        self.get_list(key, LIST_DELIMITER)
    }

    pub fn get_bool_list(&self, key: &str) -> Result<Vec<bool>> {
        self.get_list(key, LIST_DELIMITER)
    }

    /// Comma-separated list of names with surrounding whitespace removed.
    pub fn get_name_list(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .get_str(key)?
            .split(LIST_DELIMITER)
            .map(|s| s.trim().to_string())
            .collect())
    }

    fn type_mismatch(&self, key: &str, expected: ValueType) -> CompileError {
        CompileError::TypeMismatch {
            layer: self.name.clone(),
            key: key.to_string(),
            expected,
        }
    }
}
