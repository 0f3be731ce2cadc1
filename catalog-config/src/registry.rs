//! Field behaviors, looked up by the binding name a field definition declares.
//!
//! A definitions document names how each field type behaves through its
//! `d:implementation/d:binding`. The [`FieldRegistry`] maps those names to statically
//! known [`FieldBehavior`] implementations; a binding with no registered behavior is
//! reported as [`CatalogError::UnknownImplementation`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::definitions::FieldDefinition;
use crate::error::{CatalogError, Result};
use crate::field_config::FieldConfiguration;
use crate::item::FieldData;

/// Binding of the behavior that summarizes a field by its first enabled part.
pub const FIRST_PART: &str = "first-part";
/// Binding of the behavior that formats each entry through a `pattern` property.
pub const PATTERN: &str = "pattern";

const ENTRY_SEPARATOR: &str = "; ";

/// What a field type can do once bound to its definition and configuration.
pub trait FieldBehavior: Send + Sync {
    /// Binding name this behavior is registered under.
    fn binding(&self) -> &str;

    /// A one-line, human readable rendering of `data`.
    ///
    /// Returns `None` when the data holds nothing worth showing.
    fn summarize(
        &self,
        definition: &FieldDefinition,
        configuration: &FieldConfiguration,
        data: &FieldData,
    ) -> Option<String>;
}

/// Shows the first enabled part of each entry.
#[derive(Debug, Default)]
pub struct FirstPartBehavior;

impl FieldBehavior for FirstPartBehavior {
    fn binding(&self) -> &str {
        FIRST_PART
    }

    fn summarize(
        &self,
        _definition: &FieldDefinition,
        configuration: &FieldConfiguration,
        data: &FieldData,
    ) -> Option<String> {
        let values: Vec<&str> = data
            .entries
            .iter()
            .filter_map(|entry| {
                entry
                    .iter()
                    .find(|p| !configuration.is_part_disabled(&p.name) && !p.value.trim().is_empty())
                    .map(|p| p.value.as_str())
            })
            .collect();
        join_entries(values)
    }
}

/// Formats each entry by substituting `{part}` placeholders in the definition's
/// `pattern` property. Without a pattern, an entry's enabled parts are joined by spaces.
#[derive(Debug, Default)]
pub struct PatternBehavior;

impl FieldBehavior for PatternBehavior {
    fn binding(&self) -> &str {
        PATTERN
    }

    fn summarize(
        &self,
        definition: &FieldDefinition,
        configuration: &FieldConfiguration,
        data: &FieldData,
    ) -> Option<String> {
        let pattern = definition.implementation().property("pattern");
        let values: Vec<String> = data
            .entries
            .iter()
            .map(|entry| {
                let enabled = entry
                    .iter()
                    .filter(|p| !configuration.is_part_disabled(&p.name));
                match pattern {
                    Some(pattern) => {
                        let mut text = pattern.to_string();
                        for part in enabled {
                            text = text.replace(&format!("{{{}}}", part.name), &part.value);
                        }
                        strip_placeholders(&text)
                    }
                    None => enabled
                        .map(|p| p.value.as_str())
                        .collect::<Vec<_>>()
                        .join(" "),
                }
            })
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
            .collect();
        join_entries(values)
    }
}

/// Drop `{...}` placeholders that no part filled in.
fn strip_placeholders(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

fn join_entries<S: AsRef<str>>(values: Vec<S>) -> Option<String> {
    if values.is_empty() {
        return None;
    }
    Some(
        values
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(ENTRY_SEPARATOR),
    )
}

/// Behaviors by binding name.
pub struct FieldRegistry {
    behaviors: HashMap<String, Arc<dyn FieldBehavior>>,
}

impl FieldRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            behaviors: HashMap::new(),
        }
    }

    /// A registry holding the built-in `first-part` and `pattern` behaviors.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(FirstPartBehavior);
        registry.register(PatternBehavior);
        registry
    }

    /// Register `behavior` under its binding name, replacing any earlier one.
    pub fn register<B: FieldBehavior + 'static>(&mut self, behavior: B) {
        self.behaviors
            .insert(behavior.binding().to_string(), Arc::new(behavior));
    }

    pub fn behavior(&self, binding: &str) -> Result<Arc<dyn FieldBehavior>> {
        self.behaviors
            .get(binding)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownImplementation {
                binding: binding.to_string(),
            })
    }

    /// Registered binding names, sorted.
    pub fn bindings(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.behaviors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Bind the behavior named by `definition` to a merged configuration.
    pub fn bind<'a>(
        &self,
        definition: &'a FieldDefinition,
        configuration: &'a FieldConfiguration,
    ) -> Result<BoundField<'a>> {
        let behavior = self.behavior(&definition.implementation().binding)?;
        Ok(BoundField {
            definition,
            configuration,
            behavior,
            value: None,
        })
    }

    pub fn len(&self) -> usize {
        self.behaviors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.is_empty()
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRegistry")
            .field("bindings", &self.bindings())
            .finish()
    }
}

/// A field behavior bound to one definition and configuration, holding a value.
pub struct BoundField<'a> {
    definition: &'a FieldDefinition,
    configuration: &'a FieldConfiguration,
    behavior: Arc<dyn FieldBehavior>,
    value: Option<FieldData>,
}

impl<'a> BoundField<'a> {
    pub fn definition(&self) -> &'a FieldDefinition {
        self.definition
    }

    pub fn configuration(&self) -> &'a FieldConfiguration {
        self.configuration
    }

    pub fn value(&self) -> Option<&FieldData> {
        self.value.as_ref()
    }

    /// Replace the bound value. The data must be of this field's type.
    pub fn set_value(&mut self, value: Option<FieldData>) -> Result<()> {
        if let Some(data) = &value {
            if data.field_type() != self.definition.field_type() {
                return Err(CatalogError::FieldTypeMismatch {
                    expected: self.definition.field_type().to_string(),
                    actual: data.field_type().to_string(),
                });
            }
        }
        self.value = value;
        Ok(())
    }

    pub fn summary(&self) -> Option<String> {
        self.value
            .as_ref()
            .and_then(|data| self.behavior.summarize(self.definition, self.configuration, data))
    }
}
