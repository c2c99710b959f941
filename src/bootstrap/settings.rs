use super::error::SessionError;
use log::debug;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of externally supplied per-unit properties.
pub const EXTERNAL_PREFIX: &str = "dbbootstrap";

/// Keys accepted in configuration resources but not used by this backend.
const IGNORED_KEYS: &[&str] = &["hbm2ddl.auto"];

/// Resolves configuration references to resource contents.
pub trait ResourceLoader {
    fn load(&self, resource: &str) -> Result<String, SessionError>;

    /// Load a resource and parse it as a flat property map.
    fn load_properties(&self, resource: &str) -> Result<HashMap<String, String>, SessionError> {
        let text = self.load(resource)?;
        parse_properties(resource, &text)
    }
}

/// Resources found under an ordered list of root directories.
/// The first root holding the resource wins.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResources {
    roots: Vec<PathBuf>,
}

impl DirectoryResources {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn push_root(&mut self, root: impl Into<PathBuf>) {
        self.roots.push(root.into());
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn locate(&self, resource: &str) -> Option<PathBuf> {
        let relative = Path::new(resource.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        self.roots
            .iter()
            .map(|root| root.join(relative))
            .find(|path| path.is_file())
    }
}

impl ResourceLoader for DirectoryResources {
    fn load(&self, resource: &str) -> Result<String, SessionError> {
        let path = self
            .locate(resource)
            .ok_or_else(|| SessionError::ResourceNotFound(resource.to_string()))?;
        debug!("Loading configuration resource {}", path.display());
        fs::read_to_string(&path).map_err(|source| SessionError::ResourceUnreadable {
            resource: resource.to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    entries: HashMap<String, String>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resource: &str, content: &str) -> Self {
        self.insert(resource, content);
        self
    }

    pub fn insert(&mut self, resource: &str, content: &str) {
        self.entries.insert(resource.to_string(), content.to_string());
    }
}

impl ResourceLoader for InMemoryResources {
    fn load(&self, resource: &str) -> Result<String, SessionError> {
        self.entries
            .get(resource)
            .cloned()
            .ok_or_else(|| SessionError::ResourceNotFound(resource.to_string()))
    }
}

/// Parse a configuration resource: a JSON object of scalar properties,
/// either at the top level or under `"properties"`.
pub fn parse_properties(resource: &str, text: &str) -> Result<HashMap<String, String>, SessionError> {
    let malformed = |reason: String| SessionError::MalformedResource {
        resource: resource.to_string(),
        reason,
    };

    let document: JsonValue = serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    let object = match document.get("properties") {
        Some(JsonValue::Object(nested)) => nested,
        Some(_) => return Err(malformed("'properties' must be an object".into())),
        None => document
            .as_object()
            .ok_or_else(|| malformed("expected a JSON object".into()))?,
    };

    let mut properties = HashMap::new();
    for (key, value) in object {
        if IGNORED_KEYS.contains(&key.as_str()) {
            debug!("Ignoring property '{}' in {}", key, resource);
            continue;
        }
        let value = match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            other => {
                return Err(malformed(format!(
                    "property '{}' must be a scalar, got {}",
                    key, other
                )));
            }
        };
        properties.insert(key.clone(), value);
    }
    Ok(properties)
}

/// Properties supplied from outside the deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalProperties {
    values: BTreeMap<String, String>,
}

impl ExternalProperties {
    pub fn new(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Apply every `dbbootstrap.<name>.<key>` property to `properties` as
    /// `<key>`, replacing what the resource said.
    pub fn overlay(&self, name: &str, properties: &mut HashMap<String, String>) {
        let prefix = format!("{}.{}.", EXTERNAL_PREFIX, name);
        for (key, value) in &self.values {
            if let Some(local) = key.strip_prefix(&prefix) {
                if !local.is_empty() {
                    debug!("External property {} overrides '{}'", key, local);
                    properties.insert(local.to_string(), value.clone());
                }
            }
        }
    }
}

/// Split a `key=value` assignment.
pub fn parse_assignment(text: &str) -> Result<(String, String), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", text))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", text));
    }
    Ok((key.to_string(), value.to_string()))
}
