//! Builder for configuring and constructing a `UnitHost`.

use crate::{
    BridgeConfig, ControlExecutor, FormatRegistry, ProcessingUnit, Result, StaticFormat,
    UnitDescription, UnitFormat, UnitHost,
};
use std::sync::Arc;
use tracing::debug;

/// Name of the in-process format that [`UnitHostBuilder::unit`] registers into.
pub const BUILTIN_FORMAT: &str = "builtin";

/// Formats are consulted in the order they were added; units registered with
/// [`UnitHostBuilder::unit`] live in a `builtin` format placed last.
///
/// # Example
///
/// ```ignore
/// use blockhost::prelude::*;
///
/// let host = blockhost::builder()
///     .sample_rate(48000.0)
///     .block_size(32)
///     .unit("builtin:gain", "Gain", |_| Ok(Box::new(Gain::default())))
///     .build()?;
///
/// host.load("builtin:gain")?;
/// ```
pub struct UnitHostBuilder {
    config: BridgeConfig,
    formats: Vec<Arc<dyn UnitFormat>>,
    builtin: Option<StaticFormat>,
    executor: Option<Arc<ControlExecutor>>,
}

impl Default for UnitHostBuilder {
    fn default() -> Self {
        Self {
            config: BridgeConfig::default(),
            formats: Vec::new(),
            builtin: None,
            executor: None,
        }
    }
}

impl UnitHostBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 44100
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.sample_rate = sample_rate;
        self
    }

    /// Default: 2
    pub fn channels(mut self, count: usize) -> Self {
        self.config.num_channels = count;
        self
    }

    /// Default: 16
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.config.block_size = block_size;
        self
    }

    /// Default: 256
    pub fn max_block_size(mut self, max_block_size: usize) -> Self {
        self.config.max_block_size = max_block_size;
        self
    }

    /// Default: true
    pub fn force_synchronous(mut self, force: bool) -> Self {
        self.config.force_synchronous = force;
        self
    }

    /// Default: false
    pub fn transport_auto_advance(mut self, enabled: bool) -> Self {
        self.config.transport_auto_advance = enabled;
        self
    }

    pub fn format(mut self, format: Arc<dyn UnitFormat>) -> Self {
        self.formats.push(format);
        self
    }

    /// Register an in-process unit under `locator`.
    pub fn unit<F>(mut self, locator: impl Into<String>, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&UnitDescription) -> blockhost_host::Result<Box<dyn ProcessingUnit>>
            + Send
            + Sync
            + 'static,
    {
        self.builtin
            .get_or_insert_with(|| StaticFormat::new(BUILTIN_FORMAT))
            .register(locator, name, constructor);
        self
    }

    /// Run control operations on a shared executor instead of a fresh thread.
    pub fn executor(mut self, executor: Arc<ControlExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn build(self) -> Result<UnitHost> {
        self.config.validate()?;

        let registry = FormatRegistry::new();
        for format in self.formats {
            registry.add_format(format);
        }
        if let Some(builtin) = self.builtin {
            registry.add_format(Arc::new(builtin));
        }
        debug!("Unit formats: {:?}", registry.format_names());

        let host = match self.executor {
            Some(executor) => UnitHost::with_executor(self.config, registry, executor)?,
            None => UnitHost::new(self.config, registry)?,
        };
        Ok(host)
    }
}
