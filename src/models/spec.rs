use resource_registry_macros::Filterable;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{base64_bytes, Resource, ResourceMeta, View};
use crate::names::{ResourceKind, ResourceName};

/// A description document (OpenAPI, protobuf, ...) attached to a version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Filterable)]
#[serde(default)]
pub struct Spec {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[filter]
    pub project_id: String,
    #[filter]
    pub api_id: String,
    #[filter]
    pub version_id: String,
    #[filter]
    pub spec_id: String,
    #[filter]
    pub filename: String,
    #[filter]
    pub description: String,
    /// Format of `contents`, e.g. `openapi/v3+gzip`.
    #[filter]
    pub style: String,
    #[serde(with = "base64_bytes")]
    pub contents: Vec<u8>,
    /// Length of `contents`. Derived.
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of `contents`. Derived.
    pub hash: String,
}

impl Spec {
    /// Whether `contents` is marked as gzip-compressed.
    pub fn is_gzipped(&self) -> bool {
        self.style.ends_with("+gzip")
    }
}

impl Resource for Spec {
    const KIND: ResourceKind = ResourceKind::Spec;
    const MUTABLE_FIELDS: &'static [&'static str] =
        &["filename", "description", "style", "contents"];

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
        self.version_id = name.id_of(ResourceKind::Version).unwrap_or_default().to_string();
        self.spec_id = name.id().to_string();
    }

    fn copy_field(&mut self, path: &str, source: &Self) -> bool {
        match path {
            "filename" => self.filename = source.filename.clone(),
            "description" => self.description = source.description.clone(),
            "style" => self.style = source.style.clone(),
            "contents" => self.contents = source.contents.clone(),
            _ => return false,
        }
        true
    }

    fn refresh_derived(&mut self) {
        self.size_bytes = self.contents.len() as u64;
        self.hash = hex_digest(&self.contents);
    }

    fn strip_for_view(&mut self, view: View) {
        if view == View::Basic {
            self.contents.clear();
        }
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}
