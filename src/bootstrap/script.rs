use super::error::BootstrapError;
use super::unit::{BootstrapUnit, DEFAULT_PRIORITY, Operation, Phase};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// File name suffix of unit descriptors inside an archive.
pub const DESCRIPTOR_SUFFIX: &str = ".bootstrap.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptDescriptor {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub configuration: Option<String>,
    #[serde(default)]
    pub create: Vec<ScriptOperation>,
    #[serde(default)]
    pub update: Vec<ScriptOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptOperation {
    pub name: String,
    #[serde(default)]
    pub sql: Vec<String>,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

/// A unit declared by a descriptor file: every operation runs its SQL
/// statements in order through the injected session.
#[derive(Debug, Clone)]
pub struct ScriptUnit {
    descriptor: ScriptDescriptor,
}

impl ScriptUnit {
    pub fn new(descriptor: ScriptDescriptor) -> Self {
        Self { descriptor }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text).map(Self::new)
    }

    pub fn load(path: &Path) -> Result<Self, BootstrapError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text).map_err(|e| BootstrapError::Discovery {
            unit: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn descriptor(&self) -> &ScriptDescriptor {
        &self.descriptor
    }
}

impl BootstrapUnit for ScriptUnit {
    fn type_name(&self) -> &str {
        &self.descriptor.type_name
    }

    fn priority(&self) -> i32 {
        self.descriptor.priority
    }

    fn name(&self) -> Option<&str> {
        self.descriptor.name.as_deref()
    }

    fn configuration(&self) -> Option<&str> {
        self.descriptor.configuration.as_deref()
    }

    fn operations(&self, phase: Phase) -> Vec<Operation> {
        let scripts = match phase {
            Phase::Create => &self.descriptor.create,
            Phase::Update => &self.descriptor.update,
        };

        scripts
            .iter()
            .map(|script| {
                let statements: Rc<[String]> = script.sql.iter().cloned().collect();
                Operation::with_session(script.name.clone(), phase, move |session| {
                    for sql in statements.iter() {
                        session
                            .execute(sql)
                            .with_context(|| format!("executing `{}`", sql))?;
                    }
                    Ok(())
                })
            })
            .collect()
    }
}
