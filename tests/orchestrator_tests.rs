use anyhow::bail;
use dbbootstrap::bootstrap::{BootstrapError, Outcome, SessionError};
use dbbootstrap::{
    BootstrapOptions, BootstrapUnit, DbError, Operation, Orchestrator, Phase, QueryResult,
    Session, SessionProvider, UnitDispatcher,
};
use std::cell::RefCell;
use std::rc::Rc;

/// Shared, ordered record of everything the units and sessions did.
#[derive(Clone, Default)]
struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn count(&self, entry: &str) -> usize {
        self.0.borrow().iter().filter(|e| *e == entry).count()
    }

    /// Only the operation invocations, `unit:operation`.
    fn invocations(&self) -> Vec<String> {
        self.0
            .borrow()
            .iter()
            .filter(|e| e.contains(':') && !e.starts_with("open:"))
            .cloned()
            .collect()
    }
}

struct SpySession {
    journal: Journal,
    active: bool,
    fail_commit: bool,
}

impl Session for SpySession {
    fn execute(&mut self, sql: &str) -> dbbootstrap::Result<QueryResult> {
        self.journal.push(format!("execute {}", sql));
        Ok(QueryResult::empty())
    }

    fn begin(&mut self) -> dbbootstrap::Result<()> {
        self.journal.push("begin");
        self.active = true;
        Ok(())
    }

    fn commit(&mut self) -> dbbootstrap::Result<()> {
        self.journal.push("commit");
        if self.fail_commit {
            return Err(DbError::WriteConflict("spy".into()));
        }
        self.active = false;
        Ok(())
    }

    fn rollback(&mut self) -> dbbootstrap::Result<()> {
        self.journal.push("rollback");
        self.active = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.active
    }

    fn close(&mut self) -> dbbootstrap::Result<()> {
        self.journal.push("close");
        Ok(())
    }
}

#[derive(Default)]
struct SpyProvider {
    journal: Journal,
    broken: Option<&'static str>,
    fail_commit: bool,
}

impl SessionProvider for SpyProvider {
    fn open(&self, configuration: &str, _name: Option<&str>) -> Result<Box<dyn Session>, SessionError> {
        self.journal.push(format!("open:{}", configuration));
        if self.broken == Some(configuration) {
            return Err(SessionError::ResourceNotFound(configuration.to_string()));
        }
        Ok(Box::new(SpySession {
            journal: self.journal.clone(),
            active: false,
            fail_commit: self.fail_commit,
        }))
    }
}

#[derive(Clone, Copy)]
enum Kind {
    Session,
    Standalone,
    Failing,
    SelfCommitting,
}

struct TestUnit {
    type_name: &'static str,
    priority: i32,
    configuration: Option<&'static str>,
    operations: Vec<(Phase, &'static str, Kind)>,
    journal: Journal,
}

impl TestUnit {
    fn new(journal: &Journal, type_name: &'static str, priority: i32) -> Self {
        Self {
            type_name,
            priority,
            configuration: Some("db.json"),
            operations: Vec::new(),
            journal: journal.clone(),
        }
    }

    fn configuration(mut self, configuration: Option<&'static str>) -> Self {
        self.configuration = configuration;
        self
    }

    fn op(mut self, phase: Phase, name: &'static str, kind: Kind) -> Self {
        self.operations.push((phase, name, kind));
        self
    }

    fn boxed(self) -> Box<dyn BootstrapUnit> {
        Box::new(self)
    }
}

impl BootstrapUnit for TestUnit {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn configuration(&self) -> Option<&str> {
        self.configuration
    }

    fn operations(&self, phase: Phase) -> Vec<Operation> {
        self.operations
            .iter()
            .filter(|(p, _, _)| *p == phase)
            .map(|&(phase, name, kind)| {
                let journal = self.journal.clone();
                let entry = format!("{}:{}", self.type_name, name);
                match kind {
                    Kind::Standalone => Operation::standalone(name, phase, move || {
                        journal.push(entry.clone());
                        Ok(())
                    }),
                    Kind::Session => Operation::with_session(name, phase, move |session| {
                        journal.push(entry.clone());
                        session.execute("SELECT 1")?;
                        Ok(())
                    }),
                    Kind::Failing => Operation::with_session(name, phase, move |_| {
                        journal.push(entry.clone());
                        bail!("{} exploded", entry)
                    }),
                    Kind::SelfCommitting => Operation::with_session(name, phase, move |session| {
                        journal.push(entry.clone());
                        session.commit()?;
                        Ok(())
                    }),
                }
            })
            .collect()
    }
}

fn two_phase(journal: &Journal, type_name: &'static str, priority: i32) -> Box<dyn BootstrapUnit> {
    TestUnit::new(journal, type_name, priority)
        .op(Phase::Create, "create", Kind::Session)
        .op(Phase::Update, "update", Kind::Session)
        .boxed()
}

fn continuing() -> BootstrapOptions {
    BootstrapOptions {
        continue_on_failure: true,
    }
}

#[test]
fn test_units_run_in_descending_priority_every_time() {
    for _ in 0..3 {
        let provider = SpyProvider::default();
        let journal = provider.journal.clone();
        let units = vec![
            two_phase(&journal, "low", 1),
            two_phase(&journal, "high", 99),
            two_phase(&journal, "middle", 50),
        ];

        Orchestrator::new(&provider).run(units, &UnitDispatcher).unwrap();

        assert_eq!(
            journal.invocations(),
            vec![
                "high:create",
                "middle:create",
                "low:create",
                "high:update",
                "middle:update",
                "low:update"
            ]
        );
    }
}

#[test]
fn test_update_runs_only_after_every_create() {
    let provider = SpyProvider::default();
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "a", 10)
            .op(Phase::Update, "a-update", Kind::Standalone)
            .boxed(),
        TestUnit::new(&journal, "b", 1)
            .op(Phase::Create, "b-create-1", Kind::Standalone)
            .op(Phase::Create, "b-create-2", Kind::Session)
            .boxed(),
    ];

    Orchestrator::new(&provider).run(units, &UnitDispatcher).unwrap();

    assert_eq!(
        journal.invocations(),
        vec!["b:b-create-1", "b:b-create-2", "a:a-update"]
    );
}

#[test]
fn test_successful_operation_commits_and_closes_once() {
    let provider = SpyProvider::default();
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "a", 1)
            .op(Phase::Create, "create", Kind::Session)
            .boxed(),
    ];

    let report = Orchestrator::new(&provider).run(units, &UnitDispatcher).unwrap();

    assert_eq!(
        journal.entries(),
        vec!["open:db.json", "begin", "a:create", "execute SELECT 1", "commit", "close"]
    );
    assert!(report.is_complete());
    assert_eq!(report.count(Outcome::Committed), 1);
}

#[test]
fn test_failed_operation_rolls_back_and_closes_once() {
    let provider = SpyProvider::default();
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "a", 1)
            .op(Phase::Create, "boom", Kind::Failing)
            .op(Phase::Create, "never", Kind::Session)
            .boxed(),
    ];

    let err = Orchestrator::new(&provider)
        .run(units, &UnitDispatcher)
        .unwrap_err();

    match err {
        BootstrapError::OperationFailed {
            unit,
            phase,
            operation,
            ..
        } => {
            assert_eq!(unit, "a");
            assert_eq!(phase, Phase::Create);
            assert_eq!(operation, "boom");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(journal.count("rollback"), 1);
    assert_eq!(journal.count("close"), 1);
    assert_eq!(journal.count("commit"), 0);
    assert_eq!(journal.invocations(), vec!["a:boom"]);
}

#[test]
fn test_fail_fast_stops_before_update_pass() {
    let provider = SpyProvider::default();
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "first", 2)
            .op(Phase::Create, "create", Kind::Session)
            .boxed(),
        TestUnit::new(&journal, "second", 1)
            .op(Phase::Create, "boom", Kind::Failing)
            .op(Phase::Update, "update", Kind::Session)
            .boxed(),
    ];

    assert!(Orchestrator::new(&provider).run(units, &UnitDispatcher).is_err());
    assert_eq!(journal.invocations(), vec!["first:create", "second:boom"]);
    assert_eq!(journal.count("commit"), 1);
}

#[test]
fn test_continue_on_failure_runs_everything() {
    let provider = SpyProvider::default();
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "a", 2)
            .op(Phase::Create, "boom", Kind::Failing)
            .op(Phase::Create, "after", Kind::Session)
            .boxed(),
        two_phase(&journal, "b", 1),
    ];

    let report = Orchestrator::new(&provider)
        .with_options(continuing())
        .run(units, &UnitDispatcher)
        .unwrap();

    assert_eq!(
        journal.invocations(),
        vec!["a:boom", "a:after", "b:create", "b:update"]
    );
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.count(Outcome::RolledBack), 1);
    assert_eq!(report.count(Outcome::Committed), 3);
    assert!(!report.is_complete());
    assert_eq!(journal.count("open:db.json"), journal.count("close"));
}

#[test]
fn test_commit_failure_is_an_operation_failure() {
    let provider = SpyProvider {
        fail_commit: true,
        ..SpyProvider::default()
    };
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "a", 1)
            .op(Phase::Create, "create", Kind::Session)
            .boxed(),
    ];

    let err = Orchestrator::new(&provider)
        .run(units, &UnitDispatcher)
        .unwrap_err();

    assert!(matches!(err, BootstrapError::OperationFailed { .. }));
    assert!(err.to_string().contains("commit failed"));
    assert_eq!(journal.count("rollback"), 1);
    assert_eq!(journal.count("close"), 1);
}

#[test]
fn test_operation_that_commits_itself_is_not_committed_again() {
    let provider = SpyProvider::default();
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "a", 2)
            .op(Phase::Create, "create", Kind::SelfCommitting)
            .boxed(),
        two_phase(&journal, "b", 1),
    ];

    let report = Orchestrator::new(&provider).run(units, &UnitDispatcher).unwrap();

    assert_eq!(
        &journal.entries()[..5],
        &["open:db.json", "begin", "a:create", "commit", "close"]
    );
    assert_eq!(journal.count("rollback"), 0);
    assert_eq!(journal.invocations(), vec!["a:create", "b:create", "b:update"]);
    assert_eq!(report.records()[0].outcome, Outcome::Committed);
    assert!(report.is_complete());
}

#[test]
fn test_session_acquisition_failure_skips_rest_of_unit_phase() {
    let provider = SpyProvider {
        broken: Some("broken.json"),
        ..SpyProvider::default()
    };
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "broken", 2)
            .configuration(Some("broken.json"))
            .op(Phase::Create, "first", Kind::Session)
            .op(Phase::Create, "second", Kind::Session)
            .boxed(),
        two_phase(&journal, "healthy", 1),
    ];

    let report = Orchestrator::new(&provider)
        .with_options(continuing())
        .run(units, &UnitDispatcher)
        .unwrap();

    assert_eq!(journal.invocations(), vec!["healthy:create", "healthy:update"]);
    assert_eq!(journal.count("open:broken.json"), 1);
    assert_eq!(report.count(Outcome::Failed), 1);
    assert_eq!(report.count(Outcome::Skipped), 1);
    assert!(matches!(
        report.failures()[0],
        BootstrapError::SessionAcquisition { .. }
    ));
}

#[test]
fn test_session_operation_without_configuration() {
    let provider = SpyProvider::default();
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "a", 1)
            .configuration(None)
            .op(Phase::Create, "create", Kind::Session)
            .boxed(),
    ];

    let err = Orchestrator::new(&provider)
        .run(units, &UnitDispatcher)
        .unwrap_err();

    assert!(matches!(err, BootstrapError::MissingSession { .. }));
    assert!(journal.entries().is_empty());
}

#[test]
fn test_standalone_operations_get_no_session() {
    let provider = SpyProvider::default();
    let journal = provider.journal.clone();
    let units = vec![
        TestUnit::new(&journal, "a", 1)
            .configuration(None)
            .op(Phase::Create, "create", Kind::Standalone)
            .boxed(),
    ];

    let report = Orchestrator::new(&provider).run(units, &UnitDispatcher).unwrap();

    assert_eq!(journal.entries(), vec!["a:create"]);
    assert_eq!(report.records()[0].outcome, Outcome::Invoked);
}

#[test]
fn test_empty_unit_set() {
    let provider = SpyProvider::default();
    let report = Orchestrator::new(&provider)
        .run(Vec::new(), &UnitDispatcher)
        .unwrap();

    assert!(report.records().is_empty());
    assert!(report.is_complete());
    assert!(report.started_at() <= chrono::Utc::now());
}
