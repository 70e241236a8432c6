//! Unit format registry.
//!
//! Scanning binary plugin formats lives outside this crate. A format adapter
//! implements [`UnitFormat`] and is registered with a [`FormatRegistry`],
//! which the host consults to turn a locator string into a unit.

use crate::error::{HostError, LoadStage, Result};
use crate::metadata::UnitDescription;
use crate::unit::ProcessingUnit;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// One loadable unit format (VST3, CLAP, in-process, ...).
pub trait UnitFormat: Send + Sync {
    fn name(&self) -> &str;

    /// Cheap check whether `locator` could belong to this format.
    fn might_contain(&self, locator: &str) -> bool;

    /// List the units found at `locator`.
    fn scan(&self, locator: &str) -> Result<Vec<UnitDescription>>;

    fn instantiate(
        &self,
        description: &UnitDescription,
        sample_rate: f64,
        block_size: usize,
    ) -> Result<Box<dyn ProcessingUnit>>;
}

/// Ordered list of formats. The first format accepting a locator wins.
#[derive(Clone, Default)]
pub struct FormatRegistry {
    formats: Arc<RwLock<Vec<Arc<dyn UnitFormat>>>>,
}

impl FormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(self, format: Arc<dyn UnitFormat>) -> Self {
        self.add_format(format);
        self
    }

    pub fn add_format(&self, format: Arc<dyn UnitFormat>) {
        debug!("Registered unit format: {}", format.name());
        self.formats.write().push(format);
    }

    pub fn format_names(&self) -> Vec<String> {
        self.formats
            .read()
            .iter()
            .map(|f| f.name().to_string())
            .collect()
    }

    pub fn resolve(&self, locator: &str) -> Result<Arc<dyn UnitFormat>> {
        self.formats
            .read()
            .iter()
            .find(|f| f.might_contain(locator))
            .cloned()
            .ok_or_else(|| HostError::UnitNotFound {
                locator: locator.to_string(),
            })
    }

    /// Resolve, scan and instantiate the first unit found at `locator`.
    pub fn instantiate(
        &self,
        locator: &str,
        sample_rate: f64,
        block_size: usize,
    ) -> Result<(UnitDescription, Box<dyn ProcessingUnit>)> {
        let format = self.resolve(locator)?;
        let descriptions = format
            .scan(locator)
            .map_err(|e| stage_failure(locator, LoadStage::Scanning, e))?;
        for (i, desc) in descriptions.iter().enumerate() {
            debug!("{}: {}", i, desc.descriptive_name);
        }

        let description = descriptions
            .into_iter()
            .next()
            .ok_or_else(|| HostError::NoDescriptionsFound {
                locator: locator.to_string(),
            })?;

        info!(
            "Instantiating '{}' via {} format",
            description.descriptive_name,
            format.name()
        );
        let unit = format
            .instantiate(&description, sample_rate, block_size)
            .map_err(|e| stage_failure(locator, LoadStage::Instantiation, e))?;
        Ok((description, unit))
    }
}

/// Tag a format error with the load stage it came from. Lookup misses stay
/// `UnitNotFound`.
fn stage_failure(locator: &str, stage: LoadStage, err: HostError) -> HostError {
    match err {
        HostError::InstantiationFailed { .. } | HostError::UnitNotFound { .. } => err,
        other => HostError::InstantiationFailed {
            locator: locator.to_string(),
            stage,
            reason: other.to_string(),
        },
    }
}

/// Function that constructs a unit from its description
pub type UnitConstructor =
    Arc<dyn Fn(&UnitDescription) -> Result<Box<dyn ProcessingUnit>> + Send + Sync>;

struct StaticEntry {
    descriptions: Vec<UnitDescription>,
    constructor: UnitConstructor,
}

/// In-process format: locators map straight to constructors.
///
/// # Example
/// ```ignore
/// let format = StaticFormat::new("builtin");
/// format.register("builtin:gain", "Gain", |_| Ok(Box::new(Gain::new())));
/// let registry = FormatRegistry::new().with_format(Arc::new(format));
/// ```
pub struct StaticFormat {
    name: String,
    entries: RwLock<HashMap<String, StaticEntry>>,
}

impl StaticFormat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register a single unit under `locator`.
    pub fn register<F>(&self, locator: impl Into<String>, unit_name: impl Into<String>, constructor: F)
    where
        F: Fn(&UnitDescription) -> Result<Box<dyn ProcessingUnit>> + Send + Sync + 'static,
    {
        let locator = locator.into();
        let description = UnitDescription::new(locator.clone(), self.name.clone(), unit_name);
        self.register_descriptions(locator, vec![description], constructor);
    }

    /// Register `locator` with an explicit (possibly empty) list of units.
    pub fn register_descriptions<F>(
        &self,
        locator: impl Into<String>,
        descriptions: Vec<UnitDescription>,
        constructor: F,
    ) where
        F: Fn(&UnitDescription) -> Result<Box<dyn ProcessingUnit>> + Send + Sync + 'static,
    {
        self.entries.write().insert(
            locator.into(),
            StaticEntry {
                descriptions,
                constructor: Arc::new(constructor),
            },
        );
    }
}

impl UnitFormat for StaticFormat {
    fn name(&self) -> &str {
        &self.name
    }

    fn might_contain(&self, locator: &str) -> bool {
        self.entries.read().contains_key(locator)
    }

    fn scan(&self, locator: &str) -> Result<Vec<UnitDescription>> {
        self.entries
            .read()
            .get(locator)
            .map(|entry| entry.descriptions.clone())
            .ok_or_else(|| HostError::UnitNotFound {
                locator: locator.to_string(),
            })
    }

    fn instantiate(
        &self,
        description: &UnitDescription,
        _sample_rate: f64,
        _block_size: usize,
    ) -> Result<Box<dyn ProcessingUnit>> {
        let constructor = self
            .entries
            .read()
            .get(&description.locator)
            .map(|entry| Arc::clone(&entry.constructor))
            .ok_or_else(|| HostError::UnitNotFound {
                locator: description.locator.clone(),
            })?;
        constructor(description)
    }
}
