//! Volume filters.

use chrono::{DateTime, Utc};
use corral_common::error::{CorralError, Result};
use corral_runtime::backend::Runtime;
use corral_runtime::volume::Volume;

use super::{Filter, LabelMatcher, TextMatcher, single, time};

/// A supported volume filter with its parsed values.
#[derive(Debug, Clone)]
pub enum VolumeFilter {
    /// Exact name or regex.
    Name(Vec<TextMatcher>),
    /// Label presence or value.
    Label(Vec<LabelMatcher>),
    /// Created before the timestamp.
    Until(DateTime<Utc>),
    /// Whether the volume has no users.
    Dangling(Vec<bool>),
    /// Driver name.
    Driver(Vec<String>),
    /// Scope name.
    Scope(Vec<String>),
    /// Driver option presence or value.
    Opt(Vec<LabelMatcher>),
}

fn parse_dangling(value: &str) -> Result<bool> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(CorralError::invalid_argument(format!(
            "{other:?} is not a valid value for the \"dangling\" filter - must be true or false"
        ))),
    }
}

impl Filter for VolumeFilter {
    type Object = Volume;

    fn build(
        key: &str,
        values: &[String],
        _runtime: &dyn Runtime,
    ) -> Result<(Self, Option<CorralError>)> {
        let filter = match key {
            "name" => Self::Name(TextMatcher::all(values)),
            "label" => Self::Label(LabelMatcher::all(values)),
            "until" => Self::Until(time::parse_timestamp(single(key, values)?, Utc::now())?),
            "dangling" => Self::Dangling(
                values
                    .iter()
                    .map(|v| parse_dangling(v))
                    .collect::<Result<_>>()?,
            ),
            "driver" => Self::Driver(values.to_vec()),
            "scope" => Self::Scope(values.to_vec()),
            "opt" => Self::Opt(LabelMatcher::all(values)),
            other => {
                return Err(CorralError::InvalidFilter {
                    key: other.to_string(),
                });
            }
        };
        Ok((filter, None))
    }

    fn matches(&self, v: &Volume) -> bool {
        match self {
            Self::Name(ms) => ms.iter().any(|m| m.matches_name(&v.name)),
            Self::Label(ms) => ms.iter().any(|m| m.matches(&v.labels)),
            Self::Until(ts) => v.created < *ts,
            Self::Dangling(flags) => flags.contains(&v.is_dangling()),
            Self::Driver(drivers) => drivers.contains(&v.driver),
            Self::Scope(scopes) => scopes.contains(&v.scope),
            Self::Opt(ms) => ms.iter().any(|m| m.matches(&v.options)),
        }
    }
}
