//! Two-pass, priority-ordered database bootstrapping.
//!
//! A deployment is scanned for [`BootstrapUnit`]s. The [`Orchestrator`]
//! then runs every unit's Create operations, highest priority first,
//! followed by every unit's Update operations in the same order.

pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod orchestrator;
pub mod report;
pub mod scan;
pub mod script;
pub mod session;
pub mod settings;
pub mod unit;

pub use discovery::{DeploymentScope, Discovery, UnitRegistry};
pub use dispatch::{OperationDispatcher, UnitDispatcher};
pub use error::{BootstrapError, SessionError};
pub use orchestrator::{BootstrapOptions, Orchestrator};
pub use report::{BootstrapReport, OperationRecord, Outcome};
pub use scan::{DeploymentScan, DeploymentScanner, ScanDetector};
pub use script::{ScriptDescriptor, ScriptOperation, ScriptUnit};
pub use session::{
    ConnectionSession, ConnectionSessionFactory, MemSessionProvider, Session, SessionProvider,
};
pub use settings::{DirectoryResources, ExternalProperties, InMemoryResources, ResourceLoader};
pub use unit::{BootstrapUnit, DEFAULT_PRIORITY, Operation, OperationBody, Phase};
