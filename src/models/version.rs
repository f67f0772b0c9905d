use resource_registry_macros::Filterable;
use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta};
use crate::names::{ResourceKind, ResourceName};

/// One version of an API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Filterable)]
#[serde(default)]
pub struct Version {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[filter]
    pub project_id: String,
    #[filter]
    pub api_id: String,
    #[filter]
    pub version_id: String,
    #[filter]
    pub display_name: String,
    #[filter]
    pub description: String,
    /// Lifecycle stage, e.g. `production` or `deprecated`.
    #[filter]
    pub state: String,
}

impl Resource for Version {
    const KIND: ResourceKind = ResourceKind::Version;
    const MUTABLE_FIELDS: &'static [&'static str] = &["display_name", "description", "state"];

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn assign_name(&mut self, name: &ResourceName) {
        self.meta.name = name.to_string();
        self.project_id = name.id_of(ResourceKind::Project).unwrap_or_default().to_string();
        self.api_id = name.id_of(ResourceKind::Api).unwrap_or_default().to_string();
        self.version_id = name.id().to_string();
    }

    fn copy_field(&mut self, path: &str, source: &Self) -> bool {
        match path {
            "display_name" => self.display_name = source.display_name.clone(),
            "description" => self.description = source.description.clone(),
            "state" => self.state = source.state.clone(),
            _ => return false,
        }
        true
    }
}
