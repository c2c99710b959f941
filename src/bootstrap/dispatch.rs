use super::session::Session;
use super::unit::{BootstrapUnit, Operation, OperationBody, Phase};
use anyhow::bail;

/// Finds a unit's operations for a phase and calls them.
pub trait OperationDispatcher {
    fn find_operations(&self, unit: &dyn BootstrapUnit, phase: Phase) -> Vec<Operation>;

    /// Invoke `operation`, injecting `session` when the operation needs one.
    fn invoke(
        &self,
        operation: &Operation,
        unit: &dyn BootstrapUnit,
        session: Option<&mut dyn Session>,
    ) -> anyhow::Result<()>;
}

/// Dispatches straight to the operations a unit declares.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnitDispatcher;

impl OperationDispatcher for UnitDispatcher {
    fn find_operations(&self, unit: &dyn BootstrapUnit, phase: Phase) -> Vec<Operation> {
        unit.operations(phase)
            .into_iter()
            .filter(|op| op.phase() == phase)
            .collect()
    }

    fn invoke(
        &self,
        operation: &Operation,
        unit: &dyn BootstrapUnit,
        session: Option<&mut dyn Session>,
    ) -> anyhow::Result<()> {
        match (operation.body(), session) {
            (OperationBody::Standalone(body), _) => body(),
            (OperationBody::WithSession(body), Some(session)) => body(session),
            (OperationBody::WithSession(_), None) => bail!(
                "operation '{}' of unit '{}' was invoked without a session",
                operation.name(),
                unit.type_name()
            ),
        }
    }
}
