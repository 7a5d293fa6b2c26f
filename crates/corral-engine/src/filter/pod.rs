//! Pod filters.

use chrono::{DateTime, Utc};
use corral_common::error::{CorralError, Result};
use corral_common::types::{ContainerState, PodStatus};
use corral_runtime::backend::Runtime;
use corral_runtime::pod::Pod;

use super::{Filter, LabelMatcher, TextMatcher, resolve_each, single, time};

/// A supported pod filter with its parsed values.
#[derive(Debug, Clone)]
pub enum PodFilter {
    /// ID prefix or regex.
    Id(Vec<TextMatcher>),
    /// Exact name or regex.
    Name(Vec<TextMatcher>),
    /// Label presence or value.
    Label(Vec<LabelMatcher>),
    /// Derived pod status.
    Status(Vec<PodStatus>),
    /// Created before the timestamp.
    Until(DateTime<Utc>),
    /// Canonical names of networks the infra container is attached to.
    Network(Vec<String>),
    /// Some member ID matches.
    CtrIds(Vec<TextMatcher>),
    /// Some member name matches.
    CtrNames(Vec<TextMatcher>),
    /// Exact member count.
    CtrNumber(Vec<usize>),
    /// Some member is in the status.
    CtrStatus(Vec<&'static str>),
}

impl Filter for PodFilter {
    type Object = Pod;

    fn build(
        key: &str,
        values: &[String],
        runtime: &dyn Runtime,
    ) -> Result<(Self, Option<CorralError>)> {
        let filter = match key {
            "id" => Self::Id(TextMatcher::all(values)),
            "name" => Self::Name(TextMatcher::all(values)),
            "label" => Self::Label(LabelMatcher::all(values)),
            "status" => Self::Status(
                values
                    .iter()
                    .map(|v| v.parse())
                    .collect::<Result<_>>()?,
            ),
            "until" => Self::Until(time::parse_timestamp(single(key, values)?, Utc::now())?),
            "network" => Self::Network(resolve_each(values, |v| {
                runtime.network_inspect(v).map(|n| n.name)
            })?),
            "ctr-ids" => Self::CtrIds(TextMatcher::all(values)),
            "ctr-names" => Self::CtrNames(TextMatcher::all(values)),
            "ctr-number" => Self::CtrNumber(
                values
                    .iter()
                    .map(|v| {
                        v.parse().map_err(|e| {
                            CorralError::invalid_argument(format!(
                                "ctr-number {v:?} is not a number: {e}"
                            ))
                        })
                    })
                    .collect::<Result<_>>()?,
            ),
            "ctr-status" => Self::CtrStatus(
                values
                    .iter()
                    .map(|v| v.parse::<ContainerState>().map(ContainerState::filter_name))
                    .collect::<Result<_>>()?,
            ),
            other => {
                return Err(CorralError::InvalidFilter {
                    key: other.to_string(),
                });
            }
        };
        Ok((filter, None))
    }

    fn matches(&self, p: &Pod) -> bool {
        match self {
            Self::Id(ms) => ms.iter().any(|m| m.matches_id(p.id.as_str())),
            Self::Name(ms) => ms.iter().any(|m| m.matches_name(&p.name)),
            Self::Label(ms) => ms.iter().any(|m| m.matches(&p.labels)),
            Self::Status(statuses) => statuses.contains(&p.status()),
            Self::Until(ts) => p.created < *ts,
            Self::Network(names) => p.networks.iter().any(|n| names.contains(n)),
            Self::CtrIds(ms) => p
                .members
                .iter()
                .any(|c| ms.iter().any(|m| m.matches_id(c.id.as_str()))),
            Self::CtrNames(ms) => p
                .members
                .iter()
                .any(|c| ms.iter().any(|m| m.matches_name(&c.name))),
            Self::CtrNumber(counts) => counts.contains(&p.members.len()),
            Self::CtrStatus(names) => p
                .members
                .iter()
                .any(|c| names.contains(&c.state.filter_name())),
        }
    }
}
