//! Per-attribute string tables for `IndexedStr` attributes

use std::collections::HashMap;

/// Maps strings to small integer tokens
///
/// Tokens are assigned sequentially from zero and never reused. A token's
/// string can be overwritten in place with [`IndexedStrTable::set`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexedStrTable {
    strings: Vec<String>,
    lookup: HashMap<String, i32>,
}

impl IndexedStrTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the token for `value`, appending it if it is new
    pub fn register(&mut self, value: &str) -> i32 {
        if let Some(&token) = self.lookup.get(value) {
            return token;
        }
        let token = self.strings.len() as i32;
        self.strings.push(value.to_owned());
        self.lookup.insert(value.to_owned(), token);
        token
    }

    /// Token for `value`, if registered
    pub fn lookup(&self, value: &str) -> Option<i32> {
        self.lookup.get(value).copied()
    }

    /// String for `token`, if in range
    pub fn get(&self, token: i32) -> Option<&str> {
        usize::try_from(token)
            .ok()
            .and_then(|index| self.strings.get(index))
            .map(String::as_str)
    }

    /// Overwrite the string stored at `token`
    ///
    /// Returns false when the token is out of range.
    pub fn set(&mut self, token: i32, value: &str) -> bool {
        let Some(slot) = usize::try_from(token)
            .ok()
            .and_then(|index| self.strings.get_mut(index))
        else {
            return false;
        };

        if self.lookup.get(slot.as_str()) == Some(&token) {
            self.lookup.remove(slot.as_str());
        }
        slot.clear();
        slot.push_str(value);
        self.lookup.entry(value.to_owned()).or_insert(token);
        true
    }

    /// All strings in token order
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Number of registered strings
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True when nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
