//! Unit metadata and format scan results.

use serde::{Deserialize, Serialize};

/// Audio I/O configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioIO {
    /// Number of audio input channels
    pub inputs: usize,
    /// Number of audio output channels
    pub outputs: usize,
}

impl AudioIO {
    /// Stereo in, stereo out
    pub fn stereo() -> Self {
        Self {
            inputs: 2,
            outputs: 2,
        }
    }
}

/// Static facts about a processing unit instance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UnitMetadata {
    pub id: String,
    pub name: String,
    pub vendor: String,
    pub version: String,
    pub audio_io: AudioIO,
    pub receives_midi: bool,
    pub produces_midi: bool,
}

impl UnitMetadata {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vendor: String::new(),
            version: "1.0.0".to_string(),
            audio_io: AudioIO::stereo(),
            receives_midi: false,
            produces_midi: false,
        }
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn audio_io(mut self, inputs: usize, outputs: usize) -> Self {
        self.audio_io = AudioIO { inputs, outputs };
        self
    }

    pub fn midi(mut self, receives: bool, produces: bool) -> Self {
        self.receives_midi = receives;
        self.produces_midi = produces;
        self
    }
}

/// Snapshot of one parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub index: usize,
    pub name: String,
    /// Unit label ("dB", "Hz", ...).
    pub label: String,
    /// Normalized 0..1.
    pub value: f32,
    pub display: String,
}

/// One loadable unit found by a format scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDescription {
    pub locator: String,
    pub format: String,
    pub name: String,
    pub descriptive_name: String,
    pub vendor: String,
    /// Format-native identifier.
    pub uid: String,
}

impl UnitDescription {
    pub fn new(
        locator: impl Into<String>,
        format: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            locator: locator.into(),
            format: format.into(),
            descriptive_name: name.clone(),
            uid: name.clone(),
            name,
            vendor: String::new(),
        }
    }

    pub fn vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn descriptive_name(mut self, name: impl Into<String>) -> Self {
        self.descriptive_name = name.into();
        self
    }
}
