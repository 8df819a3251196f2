//! Accumulator for prefix facts discovered while compiling a stylesheet
//!
//! Both passes record what they expanded or kept into a [`PrefixMap`]. At
//! the end of a run it is flattened into a [`CapabilityMap`], the structure
//! runtime feature detection consumes:
//!
//! ```json
//! {
//!   "display": ["flex|-ms-flexbox", "inline-flex|-ms-inline-flexbox"],
//!   "hyphens|-ms-hyphens": ["auto"],
//!   "width": ["calc(100% - 10px)"]
//! }
//! ```
//!
//! Every collection keeps insertion order so that a single-threaded
//! traversal always produces the same output.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Values recorded under one generic value. `generic` is `None` for the
/// bucket of properties expanded by name only.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValueBucket {
    generic: Option<String>,
    values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PropertyFacts {
    name: String,
    buckets: Vec<ValueBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ValueFunctionFact {
    function: String,
    property: String,
    value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixMap {
    properties: Vec<PropertyFacts>,
    alternative_names: Vec<(String, Vec<String>)>,
    value_functions: Vec<ValueFunctionFact>,
    global_properties: Vec<String>,
    global_property_values: Vec<(String, Vec<String>)>,
}

impl PrefixMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `value` for `name` under `generic`, e.g. `display: -ms-flexbox`
    /// under `flex`. Passing `None` files the value in the name-only bucket.
    pub fn add_property(&mut self, name: &str, value: &str, generic: Option<&str>) {
        let index = match self.properties.iter().position(|p| p.name == name) {
            Some(index) => index,
            None => {
                self.properties.push(PropertyFacts {
                    name: name.to_string(),
                    buckets: Vec::new(),
                });
                self.properties.len() - 1
            }
        };
        let facts = &mut self.properties[index];

        let bucket_index = match facts.buckets.iter().position(|b| b.generic.as_deref() == generic) {
            Some(index) => index,
            None => {
                facts.buckets.push(ValueBucket {
                    generic: generic.map(str::to_string),
                    values: Vec::new(),
                });
                facts.buckets.len() - 1
            }
        };
        push_unique(&mut facts.buckets[bucket_index].values, value);
    }

    /// Records that `alternate` is another name of `name`, e.g.
    /// `-ms-hyphens` for `hyphens`.
    pub fn add_alternative_property_name(&mut self, name: &str, alternate: &str) {
        if name == alternate {
            return;
        }
        push_unique(ordered_entry(&mut self.alternative_names, name), alternate);
    }

    /// Records that `function` was expanded in `property`, whose full value
    /// was `value`. The first write sticks unless a later value is strictly
    /// shorter.
    pub fn add_value_function(&mut self, function: &str, property: &str, value: &str) {
        match self.value_functions.iter_mut().find(|f| f.function == function) {
            Some(existing) => {
                if value.len() < existing.value.len() {
                    existing.property = property.to_string();
                    existing.value = value.to_string();
                }
            }
            None => self.value_functions.push(ValueFunctionFact {
                function: function.to_string(),
                property: property.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Marks `name` as supported with any value; it is left out of the
    /// flattened map.
    pub fn add_global_prop(&mut self, name: &str) {
        push_unique(&mut self.global_properties, name);
    }

    /// Marks the `name: value` pair as supported; its bucket is left out of
    /// the flattened map.
    pub fn add_global_prop_value(&mut self, name: &str, value: &str) {
        push_unique(ordered_entry(&mut self.global_property_values, name), value);
    }

    pub fn values(&self, name: &str, generic: Option<&str>) -> Option<&[String]> {
        self.properties
            .iter()
            .find(|p| p.name == name)?
            .buckets
            .iter()
            .find(|b| b.generic.as_deref() == generic)
            .map(|b| b.values.as_slice())
    }

    pub fn alternative_names(&self, name: &str) -> Option<&[String]> {
        self.alternative_names
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, alternates)| alternates.as_slice())
    }

    /// `(property, value)` recorded for `function`.
    pub fn value_function(&self, function: &str) -> Option<(&str, &str)> {
        self.value_functions
            .iter()
            .find(|f| f.function == function)
            .map(|f| (f.property.as_str(), f.value.as_str()))
    }

    pub fn is_global_prop(&self, name: &str) -> bool {
        self.global_properties.iter().any(|p| p == name)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.alternative_names.is_empty()
            && self.value_functions.is_empty()
            && self.global_properties.is_empty()
            && self.global_property_values.is_empty()
    }

    /// Builds the emission structure. Global properties are skipped
    /// entirely; global property values drop only their own bucket.
    pub fn flatten(&self) -> CapabilityMap {
        let mut map = CapabilityMap::default();

        for facts in &self.properties {
            if self.is_global_prop(&facts.name) {
                continue;
            }

            let key = match self.alternative_names(&facts.name) {
                Some(alternates) if !alternates.is_empty() => {
                    format!("{}|{}", facts.name, alternates.join("|"))
                }
                _ => facts.name.clone(),
            };

            let global_values = self
                .global_property_values
                .iter()
                .find(|(n, _)| *n == facts.name)
                .map(|(_, values)| values.as_slice())
                .unwrap_or(&[]);

            let mut joined = Vec::new();
            for bucket in &facts.buckets {
                match &bucket.generic {
                    None => {
                        if let Some(first) = bucket.values.first() {
                            joined.push(first.clone());
                        }
                    }
                    Some(generic) => {
                        if global_values.contains(generic) {
                            continue;
                        }
                        let mut entry = vec![generic.as_str()];
                        entry.extend(
                            bucket
                                .values
                                .iter()
                                .map(String::as_str)
                                .filter(|v| v != generic),
                        );
                        joined.push(entry.join("|"));
                    }
                }
            }

            if !joined.is_empty() {
                map.insert(key, joined);
            }
        }

        for fact in &self.value_functions {
            map.insert(fact.property.clone(), vec![fact.value.clone()]);
        }

        map
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

fn ordered_entry<'a>(entries: &'a mut Vec<(String, Vec<String>)>, key: &str) -> &'a mut Vec<String> {
    let index = match entries.iter().position(|(k, _)| k == key) {
        Some(index) => index,
        None => {
            entries.push((key.to_string(), Vec::new()));
            entries.len() - 1
        }
    };
    &mut entries[index].1
}

/// Flattened [`PrefixMap`]: emission key to value list, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityMap {
    entries: Vec<(String, Vec<String>)>,
}

impl CapabilityMap {
    /// Inserts or overwrites `key`; an overwritten key keeps its position.
    pub fn insert(&mut self, key: String, values: Vec<String>) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = values,
            None => self.entries.push((key, values)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, values)| values.as_slice())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for CapabilityMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, values) in &self.entries {
            map.serialize_entry(key, values)?;
        }
        map.end()
    }
}
