//! Predicate engine.
//!
//! Each object kind has a closed enum of supported filters. A filter is
//! built once from a key and its values, resolving any cross-object
//! references up front, and is then a pure predicate over snapshots.
//! Values of one key are OR'd; a [`FilterSet`] ANDs the keys together.

pub mod container;
pub mod pod;
pub mod time;
pub mod volume;

use std::collections::BTreeMap;

use corral_common::error::{CorralError, Result};
use corral_runtime::backend::Runtime;
use regex::Regex;

pub use container::ContainerFilter;
pub use pod::PodFilter;
pub use volume::VolumeFilter;

/// A typed predicate over one object kind.
pub trait Filter: Sized {
    /// Snapshot type the predicate runs against.
    type Object;

    /// Builds the filter for `key` from its values.
    ///
    /// The second element of the returned pair is a non-fatal warning; the
    /// filter is usable either way.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::InvalidFilter`] for an unsupported key, or
    /// an error for a value that cannot be parsed or resolved.
    fn build(
        key: &str,
        values: &[String],
        runtime: &dyn Runtime,
    ) -> Result<(Self, Option<CorralError>)>;

    /// Returns `true` if the object passes.
    fn matches(&self, object: &Self::Object) -> bool;
}

/// Filters for several keys, all of which must pass.
#[derive(Debug)]
pub struct FilterSet<F> {
    filters: Vec<F>,
}

impl<F> Default for FilterSet<F> {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
        }
    }
}

impl<F: Filter> FilterSet<F> {
    /// Parses `key=value` strings, grouping values by key.
    ///
    /// # Errors
    ///
    /// Returns an error for a string without `=`, or any error from
    /// building an individual filter. Nothing is enumerated before all
    /// filters are built.
    pub fn parse(raw: &[String], runtime: &dyn Runtime) -> Result<Self> {
        let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for entry in raw {
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                CorralError::invalid_argument(format!(
                    "filter {entry:?} must be in the form key=value"
                ))
            })?;
            grouped.entry(key).or_default().push(value.to_string());
        }
        Self::from_groups(grouped, runtime)
    }

    /// Builds one filter per key from already grouped values.
    ///
    /// # Errors
    ///
    /// Returns the first error from building a filter.
    pub fn from_groups<K: AsRef<str>>(
        groups: impl IntoIterator<Item = (K, Vec<String>)>,
        runtime: &dyn Runtime,
    ) -> Result<Self> {
        let mut set = Self::default();
        for (key, values) in groups {
            let (filter, warning) = F::build(key.as_ref(), &values, runtime)?;
            if let Some(warning) = warning {
                tracing::warn!(key = key.as_ref(), %warning, "filter warning");
            }
            set.filters.push(filter);
        }
        Ok(set)
    }

    /// Returns `true` if the object passes every filter.
    pub fn matches(&self, object: &F::Object) -> bool {
        self.filters.iter().all(|f| f.matches(object))
    }

    /// Keeps only the objects that pass.
    pub fn apply(&self, objects: Vec<F::Object>) -> Vec<F::Object> {
        if self.filters.is_empty() {
            return objects;
        }
        objects.into_iter().filter(|o| self.matches(o)).collect()
    }
}

impl<F> FilterSet<F> {
    /// Returns `true` if no filters were given.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// An ID or name pattern: a literal plus its regex form, if it is one.
#[derive(Debug, Clone)]
pub struct TextMatcher {
    literal: String,
    pattern: Option<Regex>,
}

impl TextMatcher {
    /// Compiles a matcher. Values that are not valid regexes match
    /// literally only.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self {
            literal: value.to_string(),
            pattern: Regex::new(value).ok(),
        }
    }

    fn all(values: &[String]) -> Vec<Self> {
        values.iter().map(|v| Self::new(v)).collect()
    }

    /// Matches an ID by prefix or regex.
    #[must_use]
    pub fn matches_id(&self, id: &str) -> bool {
        id.starts_with(&self.literal) || self.pattern.as_ref().is_some_and(|re| re.is_match(id))
    }

    /// Matches a name exactly or by regex.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        name == self.literal || self.pattern.as_ref().is_some_and(|re| re.is_match(name))
    }
}

/// A `key` or `key=value` requirement on a string map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    key: String,
    value: Option<String>,
}

impl LabelMatcher {
    /// Parses `key` or `key=value`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('=') {
            Some((key, value)) => Self {
                key: key.to_string(),
                value: Some(value.to_string()),
            },
            None => Self {
                key: raw.to_string(),
                value: None,
            },
        }
    }

    fn all(values: &[String]) -> Vec<Self> {
        values.iter().map(|v| Self::parse(v)).collect()
    }

    /// Returns `true` if the key is present with the required value, if any.
    #[must_use]
    pub fn matches(&self, map: &BTreeMap<String, String>) -> bool {
        map.get(&self.key)
            .is_some_and(|v| self.value.as_ref().is_none_or(|want| want == v))
    }
}

/// Requires exactly one value, as `until` does.
fn single<'a>(key: &str, values: &'a [String]) -> Result<&'a str> {
    match values {
        [one] => Ok(one),
        _ => Err(CorralError::invalid_argument(format!(
            "{key} filter takes exactly one value, got {}",
            values.len()
        ))),
    }
}

/// Resolves each value, skipping the ones that do not exist.
///
/// Not-found errors drop only the failing value; every other error
/// propagates.
fn resolve_each<T>(
    values: &[String],
    mut resolve: impl FnMut(&str) -> Result<T>,
) -> Result<Vec<T>> {
    let mut resolved = Vec::with_capacity(values.len());
    for value in values {
        match resolve(value) {
            Ok(found) => resolved.push(found),
            Err(err) if err.is_not_found() => {
                tracing::debug!(value = %value, %err, "skipping unresolvable filter value");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(resolved)
}
