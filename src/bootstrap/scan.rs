use super::discovery::{DeploymentScope, Discovery, UnitRegistry};
use super::error::BootstrapError;
use super::script::{DESCRIPTOR_SUFFIX, ScriptUnit};
use super::settings::DirectoryResources;
use super::unit::BootstrapUnit;
use crate::config::{ConfigError, DetectorConfig, SubsystemConfig};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::{debug, info, trace, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Compile `filter_on_name` patterns. No patterns means no filtering.
pub fn build_filter(patterns: &[String]) -> Result<Option<GlobSet>, globset::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    builder.build().map(Some)
}

/// What scanning one deployment produced.
#[derive(Default)]
pub struct DeploymentScan {
    pub units: Vec<Box<dyn BootstrapUnit>>,
    /// Content roots of the scanned archives, for configuration lookups.
    pub resources: DirectoryResources,
}

/// Decides whether a deployment holds bootstrap units and finds them.
#[derive(Debug, Clone)]
pub struct ScanDetector {
    filename: String,
    filter: Option<GlobSet>,
    classes: Vec<String>,
}

impl ScanDetector {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            filter: None,
            classes: Vec::new(),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Self::new(config.filename.clone())
            .with_filter(&config.filter_on_name)
            .map(|detector| detector.with_classes(config.classes.clone()))
    }

    pub fn with_filter(mut self, patterns: &[String]) -> Result<Self, ConfigError> {
        self.filter = build_filter(patterns).map_err(|e| ConfigError::InvalidDetector {
            filename: self.filename.clone(),
            reason: e.to_string(),
        })?;
        Ok(self)
    }

    pub fn with_classes(mut self, classes: Vec<String>) -> Self {
        self.classes = classes;
        self
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Scan `scope`, or return `None` when this detector does not apply to it.
    pub fn process(
        &self,
        scope: &DeploymentScope,
        registry: &UnitRegistry,
    ) -> Result<Option<DeploymentScan>, BootstrapError> {
        if let Some(parent) = scope.parent() {
            trace!("Skipping subdeployment {} of {}", scope.name(), parent);
            return Ok(None);
        }
        if scope.name() != self.filename {
            trace!("Deployment {} does not match {}", scope.name(), self.filename);
            return Ok(None);
        }

        let mut archives = vec![scope.root().to_path_buf()];
        collect_archives(scope.root(), &mut archives)?;

        // Configuration lookups see every archive; the name filter only
        // narrows where descriptors are picked up.
        let mut scan = DeploymentScan::default();
        for archive in &archives {
            scan.resources.push_root(content_root(archive));
        }

        if self.classes.is_empty() {
            for archive in archives.iter().filter(|archive| self.accepts(archive)) {
                let mut descriptors = Vec::new();
                collect_descriptors(&content_root(archive), &mut descriptors)?;
                for path in descriptors {
                    match ScriptUnit::load(&path) {
                        Ok(unit) => {
                            debug!("Found bootstrap unit {} in {}", unit.type_name(), path.display());
                            scan.units.push(Box::new(unit));
                        }
                        Err(e) => warn!("Skipping descriptor {}: {}", path.display(), e),
                    }
                }
            }
        } else {
            for class in &self.classes {
                match registry.resolve(class) {
                    Ok(unit) => scan.units.push(unit),
                    Err(e) => warn!("{} (registered: {})", e, registry.type_names().join(", ")),
                }
            }
        }

        Ok(Some(scan))
    }

    /// Whether descriptors in `archive` are picked up.
    fn accepts(&self, archive: &Path) -> bool {
        let Some(filter) = &self.filter else {
            return true;
        };
        let keep = archive.file_name().is_some_and(|name| filter.is_match(name));
        if !keep {
            trace!("Filtered out archive {}", archive.display());
        }
        keep
    }
}

/// Runs every configured detector over a deployment.
#[derive(Default)]
pub struct DeploymentScanner {
    detectors: Vec<ScanDetector>,
    registry: UnitRegistry,
}

impl DeploymentScanner {
    pub fn new(registry: UnitRegistry) -> Self {
        Self {
            detectors: Vec::new(),
            registry,
        }
    }

    pub fn from_config(config: &SubsystemConfig, registry: UnitRegistry) -> Result<Self, ConfigError> {
        let detectors = config
            .scan
            .iter()
            .map(ScanDetector::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            detectors,
            registry,
        })
    }

    pub fn with_detector(mut self, detector: ScanDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn detectors(&self) -> &[ScanDetector] {
        &self.detectors
    }

    pub fn scan_deployment(&self, scope: &DeploymentScope) -> Result<DeploymentScan, BootstrapError> {
        let started = Instant::now();
        let mut combined = DeploymentScan::default();

        for detector in &self.detectors {
            if let Some(scan) = detector.process(scope, &self.registry)? {
                combined.units.extend(scan.units);
                for root in scan.resources.roots() {
                    if !combined.resources.roots().contains(root) {
                        combined.resources.push_root(root.clone());
                    }
                }
            }
        }

        info!(
            "Scanned deployment {} in [{}] ms, found {} bootstrap unit(s)",
            scope.name(),
            started.elapsed().as_millis(),
            combined.units.len()
        );
        Ok(combined)
    }
}

impl Discovery for DeploymentScanner {
    fn scan(&self, scope: &DeploymentScope) -> Result<Vec<Box<dyn BootstrapUnit>>, BootstrapError> {
        self.scan_deployment(scope).map(|scan| scan.units)
    }
}

fn is_archive(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("jar") | Some("war")
    )
}

/// Where an archive keeps its resources: `WEB-INF/classes` for a web
/// archive that has one, otherwise the archive itself.
fn content_root(archive: &Path) -> PathBuf {
    if archive.extension().is_some_and(|ext| ext == "war") {
        let classes = archive.join("WEB-INF").join("classes");
        if classes.is_dir() {
            return classes;
        }
    }
    archive.to_path_buf()
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

fn collect_archives(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for path in sorted_entries(dir)? {
        if path.is_dir() {
            if is_archive(&path) {
                out.push(path.clone());
            }
            collect_archives(&path, out)?;
        } else if is_archive(&path) {
            warn!("Packed archive {} is not scanned; deploy it exploded", path.display());
        }
    }
    Ok(())
}

/// Descriptors inside `dir`, not descending into nested archives.
fn collect_descriptors(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for path in sorted_entries(dir)? {
        if path.is_dir() {
            if !is_archive(&path) {
                collect_descriptors(&path, out)?;
            }
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(DESCRIPTOR_SUFFIX))
        {
            out.push(path);
        }
    }
    Ok(())
}
