//! Hierarchical resource names.
//!
//! A name is a sequence of `collection/id` pairs following the fixed
//! hierarchy `projects > apis > versions > specs`, e.g.
//! `projects/demo/apis/petstore/versions/v1/specs/openapi.yaml`. Names are
//! validated when constructed and never change afterwards.

use std::fmt;

use crate::store::StoreKey;

/// Longest identifier accepted for any segment.
pub const MAX_ID_LENGTH: usize = 63;

/// The kinds of resource the registry manages, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Project,
    Api,
    Version,
    Spec,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Project,
        ResourceKind::Api,
        ResourceKind::Version,
        ResourceKind::Spec,
    ];

    /// The collection label used in names (`projects`, `apis`, ...).
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Project => "projects",
            ResourceKind::Api => "apis",
            ResourceKind::Version => "versions",
            ResourceKind::Spec => "specs",
        }
    }

    /// The entity kind under which records are stored.
    pub fn entity(self) -> &'static str {
        match self {
            ResourceKind::Project => "Project",
            ResourceKind::Api => "Api",
            ResourceKind::Version => "Version",
            ResourceKind::Spec => "Spec",
        }
    }

    /// Number of `collection/id` pairs in a name of this kind.
    pub fn depth(self) -> usize {
        match self {
            ResourceKind::Project => 1,
            ResourceKind::Api => 2,
            ResourceKind::Version => 3,
            ResourceKind::Spec => 4,
        }
    }

    pub fn from_collection(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.collection() == label)
    }

    fn at_depth(depth: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.depth() == depth)
    }

    pub fn parent(self) -> Option<Self> {
        Self::at_depth(self.depth() - 1)
    }

    pub fn child(self) -> Option<Self> {
        Self::at_depth(self.depth() + 1)
    }

    /// Every kind nested below this one, deepest first.
    pub fn descendants(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .rev()
            .filter(|kind| kind.depth() > self.depth())
            .collect()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity())
    }
}

/// Why a name failed to parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    Empty,
    /// A collection label other than the one the hierarchy requires at this position.
    UnexpectedCollection {
        position: usize,
        expected: &'static str,
        found: String,
    },
    /// A trailing collection label with no id after it.
    MissingId { collection: String },
    InvalidId {
        kind: ResourceKind,
        id: String,
        reason: &'static str,
    },
    /// More pairs than the deepest kind allows.
    TooDeep { depth: usize },
    /// A well-formed name of the wrong kind.
    WrongKind {
        expected: ResourceKind,
        found: ResourceKind,
    },
    /// A parent was supplied where none is allowed, or omitted where one is required.
    InvalidParent { child: ResourceKind, parent: String },
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "resource name is empty"),
            NameError::UnexpectedCollection {
                position,
                expected,
                found,
            } => write!(
                f,
                "expected collection {:?} at segment {}, found {:?}",
                expected, position, found
            ),
            NameError::MissingId { collection } => {
                write!(f, "collection {:?} is missing an id", collection)
            }
            NameError::InvalidId { kind, id, reason } => {
                write!(f, "invalid {} id {:?}: {}", kind, id, reason)
            }
            NameError::TooDeep { depth } => {
                write!(f, "resource name has {} segments, at most 4 are allowed", depth)
            }
            NameError::WrongKind { expected, found } => {
                write!(f, "expected a {} name, got a {} name", expected, found)
            }
            NameError::InvalidParent { child, parent } => {
                write!(f, "{:?} is not a valid parent for a {}", parent, child)
            }
        }
    }
}

impl std::error::Error for NameError {}

/// Check an identifier against the syntax for its kind.
///
/// Ids are 1 to 63 characters of lowercase ASCII letters, digits, `-`, `.`
/// and `_`, starting with a letter or digit. Spec ids are file names and may
/// also contain upper-case letters.
pub fn validate_id(kind: ResourceKind, id: &str) -> Result<(), NameError> {
    let invalid = |reason| NameError::InvalidId {
        kind,
        id: id.to_string(),
        reason,
    };

    let first = id.chars().next().ok_or_else(|| invalid("must not be empty"))?;
    if id.len() > MAX_ID_LENGTH {
        return Err(invalid("must be at most 63 characters"));
    }
    if !first.is_ascii_alphanumeric() {
        return Err(invalid("must start with a letter or digit"));
    }
    let allow_upper = kind == ResourceKind::Spec;
    let valid = id.chars().all(|c| {
        c.is_ascii_lowercase()
            || c.is_ascii_digit()
            || matches!(c, '-' | '.' | '_')
            || (allow_upper && c.is_ascii_uppercase())
    });
    if !valid {
        return Err(invalid("contains characters outside [a-z0-9-._]"));
    }
    Ok(())
}

/// A validated resource name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    ids: Vec<String>,
    name: String,
}

impl ResourceName {
    /// Parse any registry name, inferring its kind from the number of segments.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        if raw.is_empty() {
            return Err(NameError::Empty);
        }

        let parts: Vec<&str> = raw.split('/').collect();
        let mut ids = Vec::with_capacity(parts.len() / 2);
        for (index, pair) in parts.chunks(2).enumerate() {
            let depth = index + 1;
            let kind = ResourceKind::at_depth(depth).ok_or(NameError::TooDeep {
                depth: parts.len().div_ceil(2),
            })?;
            if pair[0] != kind.collection() {
                return Err(NameError::UnexpectedCollection {
                    position: index * 2,
                    expected: kind.collection(),
                    found: pair[0].to_string(),
                });
            }
            let id = pair.get(1).ok_or_else(|| NameError::MissingId {
                collection: pair[0].to_string(),
            })?;
            validate_id(kind, id)?;
            ids.push(id.to_string());
        }

        Ok(Self::from_ids(ids))
    }

    /// Parse a name that must be of the given kind.
    pub fn parse_kind(raw: &str, kind: ResourceKind) -> Result<Self, NameError> {
        let name = Self::parse(raw)?;
        if name.kind() != kind {
            return Err(NameError::WrongKind {
                expected: kind,
                found: name.kind(),
            });
        }
        Ok(name)
    }

    /// Name of a top-level project.
    pub fn project(id: &str) -> Result<Self, NameError> {
        validate_id(ResourceKind::Project, id)?;
        Ok(Self::from_ids(vec![id.to_string()]))
    }

    fn from_ids(ids: Vec<String>) -> Self {
        let name = ids
            .iter()
            .zip(ResourceKind::ALL)
            .map(|(id, kind)| format!("{}/{}", kind.collection(), id))
            .collect::<Vec<_>>()
            .join("/");
        Self { ids, name }
    }

    pub fn kind(&self) -> ResourceKind {
        // Construction guarantees 1..=4 ids.
        ResourceKind::ALL[self.ids.len() - 1]
    }

    /// The trailing id.
    pub fn id(&self) -> &str {
        &self.ids[self.ids.len() - 1]
    }

    /// The id of the segment of the given kind, if this name reaches that deep.
    pub fn id_of(&self, kind: ResourceKind) -> Option<&str> {
        self.ids.get(kind.depth() - 1).map(String::as_str)
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Canonical storage key: entity kind plus the full name.
    pub fn key(&self) -> StoreKey {
        StoreKey::new(self.kind().entity(), self.name.clone())
    }

    /// The owning resource, or `None` for a project.
    pub fn parent(&self) -> Option<Self> {
        if self.ids.len() == 1 {
            return None;
        }
        Some(Self::from_ids(self.ids[..self.ids.len() - 1].to_vec()))
    }

    /// Name of a direct child of the given kind.
    pub fn child(&self, kind: ResourceKind, id: &str) -> Result<Self, NameError> {
        if kind.parent() != Some(self.kind()) {
            return Err(NameError::InvalidParent {
                child: kind,
                parent: self.name.clone(),
            });
        }
        validate_id(kind, id)?;
        let mut ids = self.ids.clone();
        ids.push(id.to_string());
        Ok(Self::from_ids(ids))
    }

    /// Prefix shared by the names of every descendant.
    pub fn descendant_prefix(&self) -> String {
        format!("{}/", self.name)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Parse the parent under which resources of kind `child` are created or listed.
///
/// Projects have no parent, so their parent must be empty; every other kind
/// needs a name of the kind directly above it.
pub fn parse_parent(raw: &str, child: ResourceKind) -> Result<Option<ResourceName>, NameError> {
    match child.parent() {
        None if raw.is_empty() => Ok(None),
        None => Err(NameError::InvalidParent {
            child,
            parent: raw.to_string(),
        }),
        Some(_) if raw.is_empty() => Err(NameError::InvalidParent {
            child,
            parent: raw.to_string(),
        }),
        Some(parent_kind) => ResourceName::parse_kind(raw, parent_kind).map(Some),
    }
}

/// Drop the trailing `collection/id` pair of a raw name without validating it.
pub fn parent_name(name: &str) -> String {
    let parts: Vec<&str> = name.split('/').collect();
    parts[..parts.len().saturating_sub(2)].join("/")
}
