use super::dispatch::OperationDispatcher;
use super::error::BootstrapError;
use super::report::{BootstrapReport, Outcome};
use super::session::{Session, SessionProvider};
use super::unit::{BootstrapUnit, Operation, Phase};
use std::cmp::Reverse;
use std::time::Instant;
use tracing::{Level, event, info_span};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapOptions {
    /// Keep running the remaining operations after one fails.
    pub continue_on_failure: bool,
}

/// Runs every Create operation of every unit, then every Update operation,
/// highest priority first.
///
/// Operations that need a session get a new one per invocation, wrapped in
/// a transaction that commits on success and rolls back on failure. The
/// session is closed exactly once either way.
pub struct Orchestrator<'a> {
    sessions: &'a dyn SessionProvider,
    options: BootstrapOptions,
}

struct Failure {
    error: BootstrapError,
    outcome: Outcome,
}

impl Failure {
    fn new(error: BootstrapError, outcome: Outcome) -> Self {
        Self { error, outcome }
    }
}

impl<'a> Orchestrator<'a> {
    pub fn new(sessions: &'a dyn SessionProvider) -> Self {
        Self {
            sessions,
            options: BootstrapOptions::default(),
        }
    }

    pub fn with_options(mut self, options: BootstrapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> BootstrapOptions {
        self.options
    }

    /// Execute both passes over `units`.
    ///
    /// With the default fail-fast policy the first failure aborts the run
    /// and is returned. With `continue_on_failure` every failure is kept in
    /// [`BootstrapReport::failures`] and the run always returns the report.
    /// Transactions committed before a failure stay committed.
    pub fn run(
        &self,
        mut units: Vec<Box<dyn BootstrapUnit>>,
        dispatcher: &dyn OperationDispatcher,
    ) -> Result<BootstrapReport, BootstrapError> {
        let started = Instant::now();
        let mut report = BootstrapReport::start();
        let span = info_span!(
            "bootstrap.run",
            run_id = %report.run_id(),
            units = units.len(),
            continue_on_failure = self.options.continue_on_failure
        );
        let _enter = span.enter();

        // Stable, but callers must not rely on the order of equal priorities.
        units.sort_by_key(|unit| Reverse(unit.priority()));

        for phase in Phase::ALL {
            event!(Level::DEBUG, %phase, "bootstrap phase started");
            for unit in &units {
                if let Err(error) = self.run_unit(unit.as_ref(), phase, dispatcher, &mut report) {
                    report.finish(started.elapsed());
                    event!(
                        Level::ERROR,
                        committed = report.count(Outcome::Committed),
                        invoked = report.count(Outcome::Invoked),
                        "bootstrap aborted; operations completed before the failure remain applied"
                    );
                    return Err(error);
                }
            }
        }

        report.finish(started.elapsed());
        event!(
            Level::INFO,
            "Database bootstrapping took [{}] ms",
            report.elapsed().as_millis()
        );
        if !report.failures().is_empty() {
            event!(
                Level::WARN,
                failures = report.failures().len(),
                "bootstrap finished with failures"
            );
        }
        Ok(report)
    }

    /// Run one unit's operations for `phase`. Returns `Err` only when the
    /// failure policy says the whole run must stop.
    fn run_unit(
        &self,
        unit: &dyn BootstrapUnit,
        phase: Phase,
        dispatcher: &dyn OperationDispatcher,
        report: &mut BootstrapReport,
    ) -> Result<(), BootstrapError> {
        let unit_name = unit.type_name();
        let mut operations = dispatcher.find_operations(unit, phase).into_iter();

        while let Some(operation) = operations.next() {
            let span = info_span!(
                "bootstrap.operation",
                unit = %unit_name,
                %phase,
                operation = %operation.name(),
                priority = unit.priority()
            );
            let _enter = span.enter();

            match self.run_operation(unit, &operation, dispatcher) {
                Ok(outcome) => {
                    event!(Level::DEBUG, %outcome, "bootstrap operation finished");
                    report.record(unit_name, phase, operation.name(), outcome);
                }
                Err(Failure { error, outcome }) => {
                    event!(Level::ERROR, error = %error, "bootstrap operation failed");
                    report.record(unit_name, phase, operation.name(), outcome);

                    if error.is_acquisition_failure() {
                        for skipped in operations.by_ref() {
                            event!(Level::WARN, skipped = %skipped.name(), "operation skipped");
                            report.record(unit_name, phase, skipped.name(), Outcome::Skipped);
                        }
                    }

                    if !self.options.continue_on_failure {
                        return Err(error);
                    }
                    report.push_failure(error);
                }
            }
        }
        Ok(())
    }

    fn run_operation(
        &self,
        unit: &dyn BootstrapUnit,
        operation: &Operation,
        dispatcher: &dyn OperationDispatcher,
    ) -> Result<Outcome, Failure> {
        if !operation.needs_session() {
            return dispatcher
                .invoke(operation, unit, None)
                .map(|_| Outcome::Invoked)
                .map_err(|source| {
                    Failure::new(operation_failed(unit, operation, source), Outcome::Failed)
                });
        }

        let configuration = unit.configuration().ok_or_else(|| {
            Failure::new(
                BootstrapError::MissingSession {
                    unit: unit.type_name().to_string(),
                    operation: operation.name().to_string(),
                },
                Outcome::Failed,
            )
        })?;

        let mut session = self
            .sessions
            .open(configuration, unit.name())
            .map_err(|source| {
                Failure::new(
                    BootstrapError::SessionAcquisition {
                        unit: unit.type_name().to_string(),
                        phase: operation.phase(),
                        operation: operation.name().to_string(),
                        source,
                    },
                    Outcome::Failed,
                )
            })?;

        let result = self.run_in_transaction(session.as_mut(), unit, operation, dispatcher);

        if let Err(e) = session.close() {
            event!(Level::WARN, error = %e, "failed to close session");
        }
        result
    }

    fn run_in_transaction(
        &self,
        session: &mut dyn Session,
        unit: &dyn BootstrapUnit,
        operation: &Operation,
        dispatcher: &dyn OperationDispatcher,
    ) -> Result<Outcome, Failure> {
        session.begin().map_err(|e| {
            Failure::new(
                BootstrapError::SessionAcquisition {
                    unit: unit.type_name().to_string(),
                    phase: operation.phase(),
                    operation: operation.name().to_string(),
                    source: e.into(),
                },
                Outcome::Failed,
            )
        })?;

        let outcome = dispatcher
            .invoke(operation, unit, Some(&mut *session))
            .and_then(|()| {
                // The body may have resolved the transaction itself.
                if !session.in_transaction() {
                    return Ok(());
                }
                session
                    .commit()
                    .map_err(|e| anyhow::Error::new(e).context("commit failed"))
            });

        match outcome {
            Ok(()) => Ok(Outcome::Committed),
            Err(source) => {
                if session.in_transaction() {
                    if let Err(e) = session.rollback() {
                        event!(Level::WARN, error = %e, "rollback failed");
                    }
                }
                Err(Failure::new(
                    operation_failed(unit, operation, source),
                    Outcome::RolledBack,
                ))
            }
        }
    }
}

fn operation_failed(
    unit: &dyn BootstrapUnit,
    operation: &Operation,
    source: anyhow::Error,
) -> BootstrapError {
    BootstrapError::OperationFailed {
        unit: unit.type_name().to_string(),
        phase: operation.phase(),
        operation: operation.name().to_string(),
        source,
    }
}
