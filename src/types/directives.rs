//! Global directive overrides applied on top of a document.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::Result;

/// Directive overrides supplied from the command line or config.
///
/// Keys are kept sorted so the appended block is a pure function of the set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GlobalDirectives {
    entries: BTreeMap<String, Value>,
}

impl GlobalDirectives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a directive; `None` removes any previous value.
    pub fn set<V: Serialize>(&mut self, name: impl Into<String>, value: Option<V>) -> Result<()> {
        let name = name.into();
        match value {
            Some(value) => {
                self.entries.insert(name, serde_json::to_value(value)?);
            }
            None => {
                self.entries.remove(&name);
            }
        }
        Ok(())
    }

    pub fn with<V: Serialize>(mut self, name: impl Into<String>, value: Option<V>) -> Result<Self> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Serializes every defined directive as a trailing comment block.
    pub fn to_appended_block(&self) -> Result<String> {
        let mut block = String::new();
        for (name, value) in &self.entries {
            if value.is_null() {
                continue;
            }
            block.push_str(&format!("\n<!-- {}: {} -->", name, serde_json::to_string(value)?));
        }
        Ok(block)
    }
}
