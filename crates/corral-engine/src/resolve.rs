//! Object resolver: turns a selection into snapshots plus the raw
//! strings that produced them.

use corral_common::error::{CorralError, Result};
use corral_common::types::ResourceKind;
use corral_runtime::backend::Runtime;
use corral_runtime::container::Container;
use corral_runtime::object::ManagedObject;
use corral_runtime::pod::Pod;
use corral_runtime::volume::Volume;

use crate::filter::{ContainerFilter, Filter, PodFilter, VolumeFilter};

/// Which objects a command applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every live object of the kind.
    All,
    /// The most recently created object.
    Latest,
    /// Objects named by the caller, by name, ID, or ID prefix.
    Names(Vec<String>),
}

impl Selector {
    /// Builds a selector from the usual `--all` / `--latest` / names inputs.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::InvalidArgument`] when the inputs conflict or
    /// select nothing.
    pub fn from_flags(all: bool, latest: bool, names: &[String]) -> Result<Self> {
        match (all, latest, names.is_empty()) {
            (true, true, _) => Err(CorralError::invalid_argument(
                "--all and --latest cannot be used together",
            )),
            (true, false, false) | (false, true, false) => Err(CorralError::invalid_argument(
                "--all and --latest cannot be used with names or IDs",
            )),
            (true, false, true) => Ok(Self::All),
            (false, true, true) => Ok(Self::Latest),
            (false, false, false) => Ok(Self::Names(names.to_vec())),
            (false, false, true) => Err(CorralError::invalid_argument(
                "you must provide at least one name or ID",
            )),
        }
    }

    /// Returns `true` for [`Selector::All`].
    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// An object kind the resolver can look up.
pub trait Resolvable: ManagedObject {
    /// Filter type for this kind.
    type Filter: Filter<Object = Self> + Send + 'static;

    /// Looks up one object by name or ID.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuch*` error if nothing matches.
    fn lookup(runtime: &dyn Runtime, name_or_id: &str) -> Result<Self>;

    /// Enumerates every object of the kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn all(runtime: &dyn Runtime) -> Result<Vec<Self>>;

    /// Returns the most recently created object.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuch*` error if there are none.
    fn latest(runtime: &dyn Runtime) -> Result<Self>;
}

impl Resolvable for Container {
    type Filter = ContainerFilter;

    fn lookup(runtime: &dyn Runtime, name_or_id: &str) -> Result<Self> {
        runtime.lookup_container(name_or_id)
    }

    fn all(runtime: &dyn Runtime) -> Result<Vec<Self>> {
        runtime.all_containers()
    }

    fn latest(runtime: &dyn Runtime) -> Result<Self> {
        runtime.latest_container()
    }
}

impl Resolvable for Pod {
    type Filter = PodFilter;

    fn lookup(runtime: &dyn Runtime, name_or_id: &str) -> Result<Self> {
        runtime.lookup_pod(name_or_id)
    }

    fn all(runtime: &dyn Runtime) -> Result<Vec<Self>> {
        runtime.all_pods()
    }

    fn latest(runtime: &dyn Runtime) -> Result<Self> {
        runtime.latest_pod()
    }
}

impl Resolvable for Volume {
    type Filter = VolumeFilter;

    fn lookup(runtime: &dyn Runtime, name_or_id: &str) -> Result<Self> {
        runtime.lookup_volume(name_or_id)
    }

    fn all(runtime: &dyn Runtime) -> Result<Vec<Self>> {
        runtime.all_volumes()
    }

    fn latest(runtime: &dyn Runtime) -> Result<Self> {
        runtime
            .all_volumes()?
            .into_iter()
            .max_by_key(|v| v.created)
            .ok_or_else(|| CorralError::not_found(ResourceKind::Volume, "latest"))
    }
}

/// Resolved objects, each paired with the raw input that produced it,
/// plus the first lookup failure.
#[derive(Debug)]
pub struct Resolution<T> {
    objects: Vec<T>,
    raw_inputs: Vec<String>,
    first_error: Option<CorralError>,
}

impl<T> Default for Resolution<T> {
    fn default() -> Self {
        Self {
            objects: Vec::new(),
            raw_inputs: Vec::new(),
            first_error: None,
        }
    }
}

impl<T> Resolution<T> {
    fn push(&mut self, object: T, raw_input: String) {
        self.objects.push(object);
        self.raw_inputs.push(raw_input);
    }

    fn record(&mut self, err: CorralError) {
        if self.first_error.is_none() {
            self.first_error = Some(err);
        }
    }

    /// Resolved objects, in input order.
    pub fn objects(&self) -> &[T] {
        &self.objects
    }

    /// The raw input for each object, index-aligned with [`Self::objects`].
    pub fn raw_inputs(&self) -> &[String] {
        &self.raw_inputs
    }

    /// The first lookup failure, if any.
    pub const fn first_error(&self) -> Option<&CorralError> {
        self.first_error.as_ref()
    }

    /// Keeps only the objects that pass, along with their raw inputs.
    pub fn retain(&mut self, keep: impl Fn(&T) -> bool) {
        let (objects, raw_inputs): (Vec<T>, Vec<String>) = std::mem::take(&mut self.objects)
            .into_iter()
            .zip(std::mem::take(&mut self.raw_inputs))
            .filter(|(object, _)| keep(object))
            .unzip();
        self.objects = objects;
        self.raw_inputs = raw_inputs;
    }

    /// Returns the object/raw-input pairs unless a lookup failed.
    ///
    /// With `ignore_missing`, a not-found failure is tolerated and the
    /// missing names are dropped.
    ///
    /// # Errors
    ///
    /// Returns the first lookup failure when it is not excused.
    pub fn into_pairs(self, ignore_missing: bool) -> Result<Vec<(T, String)>> {
        match self.first_error {
            Some(err) if !(ignore_missing && err.is_not_found()) => Err(err),
            Some(err) => {
                tracing::debug!(%err, "ignoring missing objects");
                Ok(self.objects.into_iter().zip(self.raw_inputs).collect())
            }
            None => Ok(self.objects.into_iter().zip(self.raw_inputs).collect()),
        }
    }
}

/// Resolves a selection.
///
/// Named lookups are independent: a failure is recorded and the
/// remaining names are still resolved.
///
/// # Errors
///
/// Returns an error only when enumerating all objects or finding the
/// latest one fails.
pub fn resolve<T: Resolvable>(selector: &Selector, runtime: &dyn Runtime) -> Result<Resolution<T>> {
    let mut resolution = Resolution::default();
    match selector {
        Selector::All => {
            for object in T::all(runtime)? {
                let raw = object.id().to_string();
                resolution.push(object, raw);
            }
        }
        Selector::Latest => {
            let object = T::latest(runtime)?;
            let raw = object.id().to_string();
            resolution.push(object, raw);
        }
        Selector::Names(names) => {
            for name in names {
                match T::lookup(runtime, name) {
                    Ok(object) => resolution.push(object, name.clone()),
                    Err(err) => {
                        tracing::debug!(name = %name, %err, "lookup failed");
                        resolution.record(err);
                    }
                }
            }
        }
    }
    Ok(resolution)
}
