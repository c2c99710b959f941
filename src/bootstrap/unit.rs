use super::session::Session;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority of units that do not declare one.
pub const DEFAULT_PRIORITY: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Create,
    Update,
}

impl Phase {
    /// Execution order of the two passes.
    pub const ALL: [Phase; 2] = [Phase::Create, Phase::Update];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Create => write!(f, "Create"),
            Phase::Update => write!(f, "Update"),
        }
    }
}

/// A database bootstrapper found in a deployment.
///
/// Units with a higher [`priority`](BootstrapUnit::priority) run first in
/// both passes. Units of equal priority run in an unspecified order.
pub trait BootstrapUnit {
    /// Identity used in logs and reports.
    fn type_name(&self) -> &str;

    fn priority(&self) -> i32 {
        DEFAULT_PRIORITY
    }

    /// Namespace for external overrides: `dbbootstrap.<name>.<key>`.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Reference to the resource holding this unit's connection settings.
    fn configuration(&self) -> Option<&str> {
        None
    }

    /// Operations for `phase`, in the order they must run.
    fn operations(&self, phase: Phase) -> Vec<Operation>;
}

pub type StandaloneFn = Box<dyn Fn() -> anyhow::Result<()>>;
pub type SessionFn = Box<dyn Fn(&mut dyn Session) -> anyhow::Result<()>>;

pub enum OperationBody {
    Standalone(StandaloneFn),
    WithSession(SessionFn),
}

pub struct Operation {
    name: String,
    phase: Phase,
    body: OperationBody,
}

impl Operation {
    pub fn standalone<F>(name: impl Into<String>, phase: Phase, body: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + 'static,
    {
        Self {
            name: name.into(),
            phase,
            body: OperationBody::Standalone(Box::new(body)),
        }
    }

    /// An operation that runs inside a session the orchestrator opens,
    /// wraps in a transaction and closes around it.
    pub fn with_session<F>(name: impl Into<String>, phase: Phase, body: F) -> Self
    where
        F: Fn(&mut dyn Session) -> anyhow::Result<()> + 'static,
    {
        Self {
            name: name.into(),
            phase,
            body: OperationBody::WithSession(Box::new(body)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn body(&self) -> &OperationBody {
        &self.body
    }

    pub fn needs_session(&self) -> bool {
        matches!(self.body, OperationBody::WithSession(_))
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("needs_session", &self.needs_session())
            .finish()
    }
}
