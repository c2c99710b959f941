use super::error::BootstrapError;
use super::unit::BootstrapUnit;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A deployment (or subdeployment) being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentScope {
    name: String,
    root: PathBuf,
    parent: Option<String>,
}

impl DeploymentScope {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            parent: None,
        }
    }

    /// Derive the scope from the root directory's file name.
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(name, root)
    }

    pub fn subdeployment_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn is_subdeployment(&self) -> bool {
        self.parent.is_some()
    }
}

/// Finds the bootstrap units of a deployment, in discovery order.
pub trait Discovery {
    fn scan(&self, scope: &DeploymentScope) -> Result<Vec<Box<dyn BootstrapUnit>>, BootstrapError>;
}

pub type UnitConstructor = Box<dyn Fn() -> Box<dyn BootstrapUnit>>;

/// Unit types known to the process, looked up by type name.
#[derive(Default)]
pub struct UnitRegistry {
    constructors: BTreeMap<String, UnitConstructor>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F, U>(&mut self, type_name: &str, constructor: F)
    where
        F: Fn() -> U + 'static,
        U: BootstrapUnit + 'static,
    {
        self.constructors.insert(
            type_name.to_string(),
            Box::new(move || Box::new(constructor()) as Box<dyn BootstrapUnit>),
        );
    }

    pub fn with<F, U>(mut self, type_name: &str, constructor: F) -> Self
    where
        F: Fn() -> U + 'static,
        U: BootstrapUnit + 'static,
    {
        self.register(type_name, constructor);
        self
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn type_names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn resolve(&self, type_name: &str) -> Result<Box<dyn BootstrapUnit>, BootstrapError> {
        self.constructors
            .get(type_name)
            .map(|construct| construct())
            .ok_or_else(|| BootstrapError::Discovery {
                unit: type_name.to_string(),
                reason: "no such unit type is registered".into(),
            })
    }
}
