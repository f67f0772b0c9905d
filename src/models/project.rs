use resource_registry_macros::Filterable;
use serde::{Deserialize, Serialize};

use super::{Resource, ResourceMeta};
use crate::names::{ResourceKind, ResourceName};

/// Top-level container for apis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Filterable)]
#[serde(default)]
pub struct Project {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[filter]
    pub project_id: String,
    #[filter]
    pub display_name: String,
    #[filter]
    pub description: String,
}

impl Resource for Project {
    const KIND: ResourceKind = ResourceKind::Project;
    const MUTABLE_FIELDS: &'static [&'static str] = &["display_name", "description"];

    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }

    fn assign_name(&mut self, name: &ResourceName) {
        self.meta.name = name.to_string();
        self.project_id = name.id().to_string();
    }

    fn copy_field(&mut self, path: &str, source: &Self) -> bool {
        match path {
            "display_name" => self.display_name = source.display_name.clone(),
            "description" => self.description = source.description.clone(),
            _ => return false,
        }
        true
    }
}
