//! Resource records managed by the registry.
//!
//! Each record type carries a [`ResourceMeta`] (name and timestamps), the ids
//! of every segment of its name, and its own payload fields. The
//! [`Resource`] trait ties a record type to its kind and update rules; filter
//! schemas come from `#[derive(Filterable)]`.

mod api;
mod project;
mod spec;
mod version;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::filter::Filterable;
use crate::names::{ResourceKind, ResourceName};

pub use api::Api;
pub use project::Project;
pub use spec::Spec;
pub use version::Version;

/// Fields every record carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceMeta {
    pub name: String,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

/// A record type stored by the registry.
pub trait Resource:
    Serialize + DeserializeOwned + Filterable + Clone + Default + Send + Sync + 'static
{
    const KIND: ResourceKind;

    /// Field paths an update may change.
    const MUTABLE_FIELDS: &'static [&'static str];

    fn meta(&self) -> &ResourceMeta;

    fn meta_mut(&mut self) -> &mut ResourceMeta;

    /// Set the name and the id fields derived from it.
    fn assign_name(&mut self, name: &ResourceName);

    /// Copy one mutable field from `source`. Returns `false` for unknown paths.
    fn copy_field(&mut self, path: &str, source: &Self) -> bool;

    /// Recompute fields derived from others.
    fn refresh_derived(&mut self) {}

    /// Drop payloads omitted from the basic view.
    fn strip_for_view(&mut self, _view: View) {}
}

/// How much of a record a read returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    /// Everything except bulk contents.
    #[default]
    Basic,
    /// Everything.
    Full,
}

impl FromStr for View {
    type Err = RegistryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "" | "basic" => Ok(View::Basic),
            "full" => Ok(View::Full),
            other => Err(RegistryError::InvalidArgument(format!(
                "unknown view {:?}, expected basic or full",
                other
            ))),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Basic => write!(f, "basic"),
            View::Full => write!(f, "full"),
        }
    }
}

/// Field paths an update applies. Empty means every mutable field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateMask {
    paths: Vec<String>,
}

impl UpdateMask {
    /// A mask selecting every mutable field.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a comma-separated path list such as `display_name,description`.
    pub fn parse(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(str::trim)
                .filter(|path| !path.is_empty()),
        )
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Copy the masked fields of `source` into `target`.
    ///
    /// Every path is checked before anything is copied, so a rejected mask
    /// leaves `target` untouched.
    pub fn apply<R: Resource>(&self, target: &mut R, source: &R) -> Result<(), RegistryError> {
        if let Some(path) = self
            .paths
            .iter()
            .find(|path| !R::MUTABLE_FIELDS.contains(&path.as_str()))
        {
            return Err(RegistryError::InvalidArgument(format!(
                "field {:?} of {} cannot be updated",
                path,
                R::KIND
            )));
        }

        let paths: Vec<&str> = if self.paths.is_empty() {
            R::MUTABLE_FIELDS.to_vec()
        } else {
            self.paths.iter().map(String::as_str).collect()
        };
        for path in paths {
            if !target.copy_field(path, source) {
                return Err(RegistryError::internal(format!(
                    "{} declares {:?} mutable but cannot copy it",
                    R::KIND,
                    path
                )));
            }
        }
        Ok(())
    }
}

/// Serde adapter for byte payloads carried as standard base64 strings.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
