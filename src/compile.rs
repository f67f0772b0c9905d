//! Compiling uploaded OpenAPI specs.
//!
//! A spec's `style` selects the dialect (`openapi/v2...` or `openapi/v3...`).
//! Its contents, inflated first when gzip-compressed, are parsed as JSON or
//! YAML and checked for the dialect's root marker. The compiled document is
//! the canonical JSON serialization of the parsed tree (object keys sorted),
//! gzip-compressed at the best level, and is uploaded as a sibling spec
//! under the same version.

use std::fmt;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::context::CallContext;
use crate::error::RegistryError;
use crate::models::{Spec, UpdateMask};
use crate::names::{ResourceKind, ResourceName};
use crate::registry::Registry;
use crate::store::StoreProvider;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The OpenAPI dialects the compiler understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    OpenApiV2,
    OpenApiV3,
}

impl Dialect {
    /// The dialect a spec style names, if any.
    pub fn from_style(style: &str) -> Option<Self> {
        if style.starts_with("openapi/v2") {
            Some(Dialect::OpenApiV2)
        } else if style.starts_with("openapi/v3") {
            Some(Dialect::OpenApiV3)
        } else {
            None
        }
    }

    /// Id of the compiled sibling spec.
    pub fn compiled_spec_id(self) -> &'static str {
        match self {
            Dialect::OpenApiV2 => "swagger.json",
            Dialect::OpenApiV3 => "openapi.json",
        }
    }

    fn marker(self) -> &'static str {
        match self {
            Dialect::OpenApiV2 => "swagger",
            Dialect::OpenApiV3 => "openapi",
        }
    }

    fn major(self) -> &'static str {
        match self {
            Dialect::OpenApiV2 => "2.",
            Dialect::OpenApiV3 => "3.",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::OpenApiV2 => write!(f, "OpenAPI v2"),
            Dialect::OpenApiV3 => write!(f, "OpenAPI v3"),
        }
    }
}

#[derive(Debug)]
pub enum CompileError {
    /// The style names no supported dialect.
    UnsupportedStyle(String),
    /// Gzip-framed contents failed to inflate.
    Decompress(std::io::Error),
    /// Contents are neither JSON nor YAML.
    Parse(String),
    /// The document lacks the dialect's root marker or names another version.
    NotADocument { dialect: Dialect, found: String },
    Compress(std::io::Error),
    /// Reading the source or uploading the result failed.
    Registry(RegistryError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UnsupportedStyle(style) => {
                write!(f, "style {:?} names no supported dialect", style)
            }
            CompileError::Decompress(e) => write!(f, "contents failed to inflate: {}", e),
            CompileError::Parse(msg) => write!(f, "contents are not JSON or YAML: {}", msg),
            CompileError::NotADocument { dialect, found } => {
                write!(f, "not an {} document: {}", dialect, found)
            }
            CompileError::Compress(e) => write!(f, "compiled document failed to compress: {}", e),
            CompileError::Registry(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Decompress(e) | CompileError::Compress(e) => Some(e),
            CompileError::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for CompileError {
    fn from(err: RegistryError) -> Self {
        CompileError::Registry(err)
    }
}

/// A compiled document ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledDocument {
    pub dialect: Dialect,
    pub spec_id: &'static str,
    /// Gzip-compressed canonical JSON.
    pub contents: Vec<u8>,
}

impl CompiledDocument {
    /// The spec record that uploads this document, keeping the source's style.
    pub fn to_spec(&self, style: &str) -> Spec {
        Spec {
            filename: self.spec_id.to_string(),
            style: style.to_string(),
            contents: self.contents.clone(),
            ..Default::default()
        }
    }
}

/// Compile the contents of the spec named `name`.
pub fn compile_document(
    name: &str,
    style: &str,
    contents: &[u8],
) -> Result<CompiledDocument, CompileError> {
    let dialect = Dialect::from_style(style)
        .ok_or_else(|| CompileError::UnsupportedStyle(style.to_string()))?;
    let raw = inflate(contents)?;
    let document = parse(&raw)?;
    check_marker(dialect, &document)?;

    let canonical =
        serde_json::to_vec(&document).map_err(|e| CompileError::Parse(e.to_string()))?;
    let contents = deflate(&canonical)?;
    debug!(
        name,
        %dialect,
        source_bytes = raw.len(),
        compiled_bytes = contents.len(),
        "compiled"
    );
    Ok(CompiledDocument {
        dialect,
        spec_id: dialect.compiled_spec_id(),
        contents,
    })
}

/// Fetch a spec, compile it and upload the result next to it.
///
/// The compiled spec is created under the same version; if it already
/// exists it is replaced.
#[instrument(skip(registry, ctx))]
pub fn compile_spec<P: StoreProvider>(
    registry: &Registry<P>,
    ctx: &CallContext,
    name: &str,
) -> Result<Spec, CompileError> {
    let source: Spec = registry.get(ctx, name)?;
    let compiled = compile_document(name, &source.style, &source.contents)?;
    let upload = compiled.to_spec(&source.style);

    let spec_name = ResourceName::parse_kind(name, ResourceKind::Spec)
        .map_err(RegistryError::from)?;
    let parent = spec_name
        .parent()
        .ok_or_else(|| RegistryError::internal("spec name has no parent"))?;

    let uploaded = match registry.create(ctx, parent.as_str(), compiled.spec_id, &upload) {
        Err(err) if err.is_already_exists() => {
            let target = parent
                .child(ResourceKind::Spec, compiled.spec_id)
                .map_err(RegistryError::from)?;
            registry.update(ctx, target.as_str(), &upload, &UpdateMask::all(), true)?
        }
        other => other?,
    };
    info!(source = name, compiled = %uploaded.meta.name, "uploaded compiled spec");
    Ok(uploaded)
}

/// Inflate gzip-framed bytes; anything else passes through unchanged.
pub fn inflate(contents: &[u8]) -> Result<Vec<u8>, CompileError> {
    if !contents.starts_with(&GZIP_MAGIC) {
        return Ok(contents.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(contents)
        .read_to_end(&mut out)
        .map_err(CompileError::Decompress)?;
    Ok(out)
}

/// Gzip at the best compression level.
pub fn deflate(bytes: &[u8]) -> Result<Vec<u8>, CompileError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes).map_err(CompileError::Compress)?;
    encoder.finish().map_err(CompileError::Compress)
}

fn parse(raw: &[u8]) -> Result<Value, CompileError> {
    if let Ok(value) = serde_json::from_slice::<Value>(raw) {
        return Ok(value);
    }
    serde_yaml::from_slice::<Value>(raw).map_err(|e| CompileError::Parse(e.to_string()))
}

fn check_marker(dialect: Dialect, document: &Value) -> Result<(), CompileError> {
    let not_a_document = |found: String| CompileError::NotADocument { dialect, found };

    let root = document
        .as_object()
        .ok_or_else(|| not_a_document("root is not an object".into()))?;
    let version = match root.get(dialect.marker()) {
        Some(Value::String(version)) => version.clone(),
        // YAML reads an unquoted `2.0` as a number.
        Some(Value::Number(version)) => version.to_string(),
        Some(_) => return Err(not_a_document(format!("{:?} is not a version", dialect.marker()))),
        None => return Err(not_a_document(format!("missing {:?}", dialect.marker()))),
    };
    if !version.starts_with(dialect.major()) {
        return Err(not_a_document(format!(
            "{} version is {}",
            dialect.marker(),
            version
        )));
    }
    Ok(())
}
