//! Container filters.

use chrono::{DateTime, Utc};
use corral_common::constants::CONTAINER_NETWORK_MODE_PREFIX;
use corral_common::error::{CorralError, Result, ResultExt};
use corral_common::types::{ContainerId, ContainerState, PodId, RestartPolicy};
use corral_runtime::backend::Runtime;
use corral_runtime::container::Container;

use super::{Filter, LabelMatcher, TextMatcher, resolve_each, single, time};

/// A `source` or `source:dest` volume reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRef {
    source: String,
    dest: Option<String>,
}

impl VolumeRef {
    fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((source, dest)) => Self {
                source: source.to_string(),
                dest: Some(dest.to_string()),
            },
            None => Self {
                source: raw.to_string(),
                dest: None,
            },
        }
    }

    fn matches(&self, ctr: &Container) -> bool {
        let dest_ok = |dest: &str| self.dest.as_deref().is_none_or(|want| want == dest);
        ctr.mounts
            .iter()
            .any(|m| m.source == self.source && dest_ok(&m.destination))
            || ctr
                .named_volumes
                .iter()
                .any(|v| v.name == self.source && dest_ok(&v.dest))
    }
}

/// A supported container filter with its parsed values.
#[derive(Debug, Clone)]
pub enum ContainerFilter {
    /// ID prefix or regex.
    Id(Vec<TextMatcher>),
    /// Exact name or regex.
    Name(Vec<TextMatcher>),
    /// Label presence or value.
    Label(Vec<LabelMatcher>),
    /// Status names, as produced by [`ContainerState::filter_name`].
    Status(Vec<&'static str>),
    /// Exit codes of exited containers.
    Exited(Vec<i32>),
    /// Image ID, image reference, or repository of a `latest` image.
    Ancestor(Vec<String>),
    /// Created strictly before the earliest referenced container.
    Before(DateTime<Utc>),
    /// Created strictly after the latest referenced container.
    Since(DateTime<Utc>),
    /// Mount or named volume references.
    Volume(Vec<VolumeRef>),
    /// Health-check status.
    Health(Vec<String>),
    /// Created before the timestamp.
    Until(DateTime<Utc>),
    /// Member of one of the pods.
    Pod(Vec<PodId>),
    /// Attached to one of the networks, or sharing the network namespace
    /// of one of the containers.
    Network {
        /// Canonical network names.
        names: Vec<String>,
        /// Containers whose network namespace is shared.
        owners: Vec<ContainerId>,
    },
    /// Restart policies.
    RestartPolicy(Vec<RestartPolicy>),
}

impl ContainerFilter {
    fn build_status(values: &[String]) -> Result<Self> {
        values
            .iter()
            .map(|v| v.parse::<ContainerState>().map(ContainerState::filter_name))
            .collect::<Result<_>>()
            .map(Self::Status)
    }

    fn build_exited(values: &[String]) -> Result<Self> {
        values
            .iter()
            .map(|v| {
                v.parse::<i32>().map_err(|e| {
                    CorralError::invalid_argument(format!("exited code {v:?} is not a number: {e}"))
                })
            })
            .collect::<Result<_>>()
            .map(Self::Exited)
    }

    /// Creation times of the referenced containers.
    fn reference_times(values: &[String], runtime: &dyn Runtime) -> Result<Vec<DateTime<Utc>>> {
        values
            .iter()
            .map(|v| {
                runtime
                    .lookup_container(v)
                    .map(|c| c.created)
                    .with_context(|| format!("unable to find container by name or id of {v}"))
            })
            .collect()
    }

    fn build_network(values: &[String], runtime: &dyn Runtime) -> Result<Self> {
        let (shared, plain): (Vec<String>, Vec<String>) = values
            .iter()
            .cloned()
            .partition(|v| v.starts_with(CONTAINER_NETWORK_MODE_PREFIX));
        let shared: Vec<String> = shared
            .iter()
            .map(|v| v[CONTAINER_NETWORK_MODE_PREFIX.len()..].to_string())
            .collect();
        let owners = resolve_each(&shared, |v| runtime.lookup_container_id(v))?;
        let names = resolve_each(&plain, |v| runtime.network_inspect(v).map(|n| n.name))?;
        Ok(Self::Network { names, owners })
    }

    fn build_restart_policy(values: &[String]) -> (Self, Option<CorralError>) {
        let mut policies = Vec::new();
        let mut invalid = Vec::new();
        for value in values {
            match value.parse::<RestartPolicy>() {
                Ok(policy) => policies.push(policy),
                Err(_) => invalid.push(value.as_str()),
            }
        }
        let warning = (!invalid.is_empty()).then(|| {
            CorralError::invalid_argument(format!(
                "Unrecognized restart policy names: {}",
                invalid.join(", ")
            ))
        });
        (Self::RestartPolicy(policies), warning)
    }
}

impl Filter for ContainerFilter {
    type Object = Container;

    fn build(
        key: &str,
        values: &[String],
        runtime: &dyn Runtime,
    ) -> Result<(Self, Option<CorralError>)> {
        let filter = match key {
            "id" => Self::Id(TextMatcher::all(values)),
            "name" => Self::Name(TextMatcher::all(values)),
            "label" => Self::Label(LabelMatcher::all(values)),
            "status" => Self::build_status(values)?,
            "exited" => Self::build_exited(values)?,
            "ancestor" => Self::Ancestor(values.to_vec()),
            "before" => Self::reference_times(values, runtime)?
                .into_iter()
                .min()
                .map(Self::Before)
                .ok_or_else(|| CorralError::invalid_argument("before filter needs a value"))?,
            "since" => Self::reference_times(values, runtime)?
                .into_iter()
                .max()
                .map(Self::Since)
                .ok_or_else(|| CorralError::invalid_argument("since filter needs a value"))?,
            "volume" => Self::Volume(values.iter().map(|v| VolumeRef::parse(v)).collect()),
            "health" => Self::Health(values.to_vec()),
            "until" => Self::Until(time::parse_timestamp(single(key, values)?, Utc::now())?),
            "pod" => Self::Pod(resolve_each(values, |v| {
                runtime.lookup_pod(v).map(|p| p.id)
            })?),
            "network" => Self::build_network(values, runtime)?,
            "restart-policy" => return Ok(Self::build_restart_policy(values)),
            other => {
                return Err(CorralError::InvalidFilter {
                    key: other.to_string(),
                });
            }
        };
        Ok((filter, None))
    }

    fn matches(&self, c: &Container) -> bool {
        match self {
            Self::Id(ms) => ms.iter().any(|m| m.matches_id(c.id.as_str())),
            Self::Name(ms) => ms.iter().any(|m| m.matches_name(&c.name)),
            Self::Label(ms) => ms.iter().any(|m| m.matches(&c.labels)),
            Self::Status(names) => names.contains(&c.state.filter_name()),
            Self::Exited(codes) => c.exited && codes.contains(&c.exit_code),
            Self::Ancestor(images) => images.iter().any(|image| {
                c.image_id == *image
                    || c.image_name == *image
                    || (c.has_default_tag() && c.image_repository() == image)
            }),
            Self::Before(boundary) => c.created < *boundary,
            Self::Since(boundary) => c.created > *boundary,
            Self::Volume(refs) => refs.iter().any(|r| r.matches(c)),
            Self::Health(states) => c
                .health
                .as_deref()
                .is_some_and(|h| states.iter().any(|s| s == h)),
            Self::Until(ts) => c.created < *ts,
            Self::Pod(pods) => c.pod_id.as_ref().is_some_and(|p| pods.contains(p)),
            Self::Network { names, owners } => {
                c.networks.iter().any(|n| names.contains(n))
                    || c
                        .network_namespace_owner()
                        .is_some_and(|o| owners.iter().any(|id| id.as_str() == o))
            }
            Self::RestartPolicy(policies) => policies.contains(&c.restart_policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use corral_common::error::ErrorKind;
    use corral_runtime::backend::memory::MemoryRuntime;
    use corral_runtime::network::Network;
    use corral_runtime::pod::Pod;

    use super::*;
    use crate::filter::FilterSet;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn build(key: &str, values: &[&str], rt: &MemoryRuntime) -> ContainerFilter {
        ContainerFilter::build(key, &strings(values), rt).unwrap().0
    }

    #[test]
    fn unknown_key_is_rejected() {
        let rt = MemoryRuntime::new();
        let err = ContainerFilter::build("colour", &strings(&["red"]), &rt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFilter);
        assert_eq!(err.to_string(), "colour is an invalid filter");
    }

    #[test]
    fn status_accepts_aliases_and_rejects_garbage() {
        let rt = MemoryRuntime::new();
        let stopped = build("status", &["stopped"], &rt);
        assert!(stopped.matches(&Container::new("a", "x").in_state(ContainerState::Exited)));
        let created = build("status", &["created"], &rt);
        assert!(created.matches(&Container::new("b", "x").in_state(ContainerState::Configured)));

        let err = ContainerFilter::build("status", &strings(&["running", "sleepy"]), &rt)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn exited_requires_numbers() {
        let rt = MemoryRuntime::new();
        let f = build("exited", &["0", "137"], &rt);
        assert!(f.matches(&Container::new("a", "x").exited_with(137)));
        assert!(!f.matches(&Container::new("b", "x").exited_with(1)));
        assert!(!f.matches(&Container::new("c", "x")));
        assert!(ContainerFilter::build("exited", &strings(&["zero"]), &rt).is_err());
    }

    #[test]
    fn ancestor_matches_repository_only_for_latest() {
        let rt = MemoryRuntime::new();
        let f = build("ancestor", &["nginx"], &rt);
        assert!(f.matches(&Container::new("a", "nginx:latest")));
        assert!(f.matches(&Container::new("b", "nginx")));
        assert!(!f.matches(&Container::new("c", "nginx:1.25")));

        let mut by_id = Container::new("d", "other");
        by_id.image_id = "sha256abc".into();
        assert!(build("ancestor", &["sha256abc"], &rt).matches(&by_id));
    }

    #[test]
    fn before_and_since_use_outermost_references() {
        let rt = MemoryRuntime::new();
        let t0 = Utc::now() - Duration::hours(3);
        for (name, offset) in [("old", 0), ("mid", 1), ("new", 2)] {
            let _ = rt
                .insert_container(
                    Container::new(name, "x").created_at(t0 + Duration::hours(offset)),
                )
                .unwrap();
        }
        let probe = Container::new("probe", "x").created_at(t0 + Duration::minutes(90));

        assert!(!build("before", &["mid", "old"], &rt).matches(&probe));
        assert!(build("before", &["new"], &rt).matches(&probe));
        assert!(!build("since", &["old", "new"], &rt).matches(&probe));
        assert!(build("since", &["old", "mid"], &rt).matches(&probe));

        let err = ContainerFilter::build("since", &strings(&["old", "ghost"]), &rt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoSuchContainer);
    }

    #[test]
    fn volume_matches_source_and_optional_dest() {
        let rt = MemoryRuntime::new();
        let ctr = Container::new("a", "x").with_volume("data", "/var/lib/data");
        assert!(build("volume", &["data"], &rt).matches(&ctr));
        assert!(build("volume", &["data:/var/lib/data"], &rt).matches(&ctr));
        assert!(!build("volume", &["data:/srv"], &rt).matches(&ctr));
        assert!(build("volume", &["data:/srv", "data"], &rt).matches(&ctr));
    }

    #[test]
    fn pod_filter_skips_missing_pods() {
        let rt = MemoryRuntime::new();
        let pod = rt.insert_pod(Pod::new("web")).unwrap();
        let f = build("pod", &["ghost", "web"], &rt);
        assert!(f.matches(&Container::new("a", "x").in_pod(pod, false)));
        assert!(!f.matches(&Container::new("b", "x")));
    }

    #[test]
    fn network_filter_resolves_names_and_shared_namespaces() {
        let rt = MemoryRuntime::new();
        rt.insert_network(Network::new("n1", "frontend")).unwrap();
        let owner = rt.insert_container(Container::new("owner", "x")).unwrap();

        let f = build("network", &["missing", "n1", "container:owner", "container:ghost"], &rt);
        assert!(f.matches(&Container::new("a", "x").on_network("frontend")));

        let mut joined = Container::new("b", "x");
        joined.network_mode = format!("container:{owner}");
        assert!(f.matches(&joined));
        assert!(!f.matches(&Container::new("c", "x").on_network("backend")));
    }

    #[test]
    fn restart_policy_warns_but_still_filters() {
        let rt = MemoryRuntime::new();
        let (f, warning) =
            ContainerFilter::build("restart-policy", &strings(&["always", "bogus", "sometimes"]), &rt)
                .unwrap();
        assert_eq!(
            warning.unwrap().to_string(),
            "invalid argument: Unrecognized restart policy names: bogus, sometimes"
        );
        let mut always = Container::new("a", "x");
        always.restart_policy = RestartPolicy::Always;
        assert!(f.matches(&always));
        assert!(!f.matches(&Container::new("b", "x")));

        let none = build("restart-policy", &["none"], &rt);
        assert!(none.matches(&Container::new("c", "x")));
    }

    #[test]
    fn values_or_within_key_and_across_keys() {
        let rt = MemoryRuntime::new();
        let set: FilterSet<ContainerFilter> =
            FilterSet::parse(&strings(&["label=a=1", "label=a=2", "name=foo"]), &rt).unwrap();

        let foo1 = Container::new("foo", "x").with_label("a", "1");
        let foo2 = Container::new("foo", "x").with_label("a", "2");
        let bar1 = Container::new("bar", "x").with_label("a", "1");
        let foo3 = Container::new("foo", "x").with_label("a", "3");
        assert!(set.matches(&foo1));
        assert!(set.matches(&foo2));
        assert!(!set.matches(&bar1));
        assert!(!set.matches(&foo3));
    }

    #[test]
    fn predicates_are_repeatable() {
        let rt = MemoryRuntime::new();
        let f = build("name", &["^we"], &rt);
        let ctr = Container::new("web", "x");
        assert_eq!(f.matches(&ctr), f.matches(&ctr));
        assert!(f.matches(&ctr));
    }

    #[test]
    fn until_takes_one_value() {
        let rt = MemoryRuntime::new();
        let f = build("until", &["1h"], &rt);
        assert!(f.matches(&Container::new("a", "x").created_at(Utc::now() - Duration::hours(2))));
        assert!(!f.matches(&Container::new("b", "x")));
        assert!(ContainerFilter::build("until", &strings(&["1h", "2h"]), &rt).is_err());
    }

    #[test]
    fn malformed_filter_string_is_rejected() {
        let rt = MemoryRuntime::new();
        let err = FilterSet::<ContainerFilter>::parse(&strings(&["status"]), &rt).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
