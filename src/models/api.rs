use resource_registry_macros::Filterable;
use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta};
use crate::names::{ResourceKind, ResourceName};

/// An API within a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Filterable)]
#[serde(default)]
pub struct Api {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[filter]
    pub project_id: String,
    #[filter]
    pub api_id: String,
    #[filter]
    pub display_name: String,
    #[filter]
    pub description: String,
    /// Free-form availability level, e.g. `GENERAL` or `PREVIEW`.
    #[filter]
    pub availability: String,
    /// Name of the version clients should prefer.
    #[filter]
    pub recommended_version: String,
}

impl Resource for Api {
    const KIND: ResourceKind = ResourceKind::Api;
    const MUTABLE_FIELDS: &'static [&'static str] = &[
        "display_name",
        "description",
        "availability",
        "recommended_version",
    ];

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn assign_name(&mut self, name: &ResourceName) {
        self.meta.name = name.to_string();
        self.project_id = name.id_of(ResourceKind::Project).unwrap_or_default().to_string();
        self.api_id = name.id().to_string();
    }

    fn copy_field(&mut self, path: &str, source: &Self) -> bool {
        match path {
            "display_name" => self.display_name = source.display_name.clone(),
            "description" => self.description = source.description.clone(),
            "availability" => self.availability = source.availability.clone(),
            "recommended_version" => {
                self.recommended_version = source.recommended_version.clone()
            }
            _ => return false,
        }
        true
    }
}
