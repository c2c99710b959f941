// ============================================================================
// dbbootstrap Library
// ============================================================================

pub mod core;
pub mod storage;
pub mod result;
pub mod facade;
pub mod connection;
pub mod bootstrap;
pub mod config;
mod parser;
mod executor;

// Re-export main types for convenience
pub use facade::{DatabaseRegistry, InMemoryDB};
pub use core::{Result, DbError, Value, DataType};
pub use result::QueryResult;
pub use connection::{Connection, config::ConnectionSettings};

// Re-export bootstrap API
pub use bootstrap::{
    BootstrapError, BootstrapOptions, BootstrapReport, BootstrapUnit, DeploymentScanner,
    DeploymentScope, MemSessionProvider, Operation, Orchestrator, Outcome, Phase, Session,
    SessionProvider, UnitDispatcher,
};
pub use config::SubsystemConfig;

/// Scan a deployment and bootstrap every unit found in it.
///
/// Sessions are opened against `registry` using configuration resources
/// from the scanned archives.
///
/// # Examples
///
/// ```no_run
/// use dbbootstrap::{bootstrap_deployment, DatabaseRegistry, DeploymentScope, SubsystemConfig};
/// use dbbootstrap::bootstrap::UnitRegistry;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SubsystemConfig::load(Path::new("dbbootstrap.json"))?;
/// let registry = DatabaseRegistry::new();
/// let scope = DeploymentScope::from_root("deployments/app.war");
///
/// let report = bootstrap_deployment(&config, UnitRegistry::new(), &scope, &registry)?;
/// println!("{}", report);
/// # Ok(())
/// # }
/// ```
pub fn bootstrap_deployment(
    config: &SubsystemConfig,
    units: bootstrap::UnitRegistry,
    scope: &DeploymentScope,
    registry: &DatabaseRegistry,
) -> std::result::Result<BootstrapReport, BootstrapError> {
    let scanner = DeploymentScanner::from_config(config, units)?;
    let scan = scanner.scan_deployment(scope)?;

    let sessions = MemSessionProvider::new(registry.clone(), scan.resources)
        .with_external(config.external_properties());
    Orchestrator::new(&sessions)
        .with_options(config.options())
        .run(scan.units, &UnitDispatcher)
}
