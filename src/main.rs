use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dbbootstrap::bootstrap::settings::parse_assignment;
use dbbootstrap::bootstrap::{DeploymentScanner, UnitRegistry};
use dbbootstrap::{
    DatabaseRegistry, DeploymentScope, MemSessionProvider, Orchestrator, SubsystemConfig,
    UnitDispatcher,
};
use std::cmp::Reverse;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dbbootstrap")]
#[command(about = "Run priority-ordered database bootstrappers found in a deployment")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a deployment and run its Create and Update operations
    Run {
        #[command(flatten)]
        target: Target,
        /// External property, `dbbootstrap.<unit name>.<key>=<value>`
        #[arg(long = "property", value_parser = parse_assignment)]
        properties: Vec<(String, String)>,
        #[arg(long)]
        continue_on_failure: bool,
        /// Print the contents of every table afterwards
        #[arg(long)]
        dump: bool,
    },
    /// List the units a deployment holds, in execution order
    Inspect {
        #[command(flatten)]
        target: Target,
    },
}

#[derive(clap::Args)]
struct Target {
    #[arg(long)]
    config: PathBuf,
    /// Exploded deployment directory
    #[arg(long)]
    deployment: PathBuf,
    /// Deployment name, defaults to the directory name
    #[arg(long)]
    name: Option<String>,
}

impl Target {
    fn load(&self) -> Result<(SubsystemConfig, DeploymentScope)> {
        let config = SubsystemConfig::load(&self.config)
            .with_context(|| format!("loading {}", self.config.display()))?;
        if !self.deployment.is_dir() {
            bail!("deployment {} is not a directory", self.deployment.display());
        }
        let scope = match &self.name {
            Some(name) => DeploymentScope::new(name.clone(), self.deployment.clone()),
            None => DeploymentScope::from_root(self.deployment.clone()),
        };
        Ok((config, scope))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            target,
            properties,
            continue_on_failure,
            dump,
        } => run(&target, properties, continue_on_failure, dump),
        Command::Inspect { target } => inspect(&target),
    }
}

fn run(
    target: &Target,
    properties: Vec<(String, String)>,
    continue_on_failure: bool,
    dump: bool,
) -> Result<()> {
    let (mut config, scope) = target.load()?;
    config.properties.extend(properties);
    config.continue_on_failure |= continue_on_failure;

    let scan = DeploymentScanner::from_config(&config, UnitRegistry::new())?.scan_deployment(&scope)?;
    let registry = DatabaseRegistry::new();
    let sessions = MemSessionProvider::new(registry.clone(), scan.resources)
        .with_external(config.external_properties());

    let outcome = Orchestrator::new(&sessions)
        .with_options(config.options())
        .run(scan.units, &UnitDispatcher);

    // Committed work stays applied after a fail-fast abort; show it either way.
    if dump {
        dump_databases(&registry)?;
    }
    let report = outcome.context("bootstrap aborted")?;
    println!("{}", report);
    println!(
        "Run {} started at {}",
        report.run_id(),
        report.started_at().format("%Y-%m-%d %H:%M:%S%.3f UTC")
    );

    if !report.is_complete() {
        bail!("bootstrap finished with {} failure(s)", report.failures().len());
    }
    Ok(())
}

fn inspect(target: &Target) -> Result<()> {
    let (config, scope) = target.load()?;
    let scan = DeploymentScanner::from_config(&config, UnitRegistry::new())?.scan_deployment(&scope)?;

    let mut units = scan.units;
    units.sort_by_key(|unit| Reverse(unit.priority()));
    for unit in &units {
        println!(
            "{:>6}  {:<30} name={} configuration={}",
            unit.priority(),
            unit.type_name(),
            unit.name().unwrap_or("-"),
            unit.configuration().unwrap_or("-")
        );
    }
    for root in scan.resources.roots() {
        println!("resources: {}", root.display());
    }
    Ok(())
}

fn dump_databases(registry: &DatabaseRegistry) -> Result<()> {
    print!("{}", render_databases(registry)?);
    Ok(())
}

fn render_databases(registry: &DatabaseRegistry) -> Result<String> {
    let mut out = String::new();
    for name in registry.names()? {
        let db = registry.get(&name)?;
        let mut db = db.write().map_err(|_| anyhow::anyhow!("database {} is poisoned", name))?;
        for table in db.list_tables() {
            let result = db.execute(&format!("SELECT * FROM {}", table))?;
            out.push_str(&format!("{}.{}\n{}\n", name, table, result));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbbootstrap::bootstrap::{InMemoryResources, ScriptUnit};
    use dbbootstrap::BootstrapUnit;

    fn unit(json: &str) -> Box<dyn BootstrapUnit> {
        Box::new(ScriptUnit::from_json(json).unwrap())
    }

    #[test]
    fn test_render_shows_work_committed_before_abort() {
        let registry = DatabaseRegistry::new();
        let resources =
            InMemoryResources::new().with("people.json", r#"{"connection.url": "memdb:people"}"#);
        let sessions = MemSessionProvider::new(registry.clone(), resources);
        let units = vec![
            unit(
                r#"{ "type": "Create", "priority": 2, "configuration": "people.json",
                     "create": [{ "name": "c", "sql": ["CREATE TABLE person (PersonId INT)",
                                                      "INSERT INTO person VALUES (1)"] }] }"#,
            ),
            unit(
                r#"{ "type": "Broken", "priority": 1, "configuration": "people.json",
                     "create": [{ "name": "b", "sql": ["INSERT INTO nope VALUES (1)"] }] }"#,
            ),
        ];

        assert!(Orchestrator::new(&sessions).run(units, &UnitDispatcher).is_err());

        let rendered = render_databases(&registry).unwrap();
        assert!(rendered.contains("people.person"));
        assert!(rendered.contains("PersonId"));
    }
}
