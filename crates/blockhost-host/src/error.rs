//! Error types for unit hosting

use blockhost_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Scanning,
    Instantiation,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStage::Scanning => write!(f, "scanning"),
            LoadStage::Instantiation => write!(f, "creating instance"),
        }
    }
}

/// Errors surfaced by control-thread operations.
///
/// None of these ever reach the audio callback; the bridge keeps passing
/// audio through while they are logged.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("No format recognises unit locator: {locator}")]
    UnitNotFound { locator: String },

    #[error("No unit descriptions found in {locator}")]
    NoDescriptionsFound { locator: String },

    #[error("Unit load failed at {stage} stage: {locator}\n  Reason: {reason}")]
    InstantiationFailed {
        locator: String,
        stage: LoadStage,
        reason: String,
    },

    #[error("No unit loaded")]
    NoUnitLoaded,

    #[error("Timed out after {duration_ms}ms waiting for {pending} async operation(s)")]
    AsyncWaitTimeout { duration_ms: u64, pending: usize },

    #[error("Failed to save unit state to {path}: {reason}")]
    StateSaveError { path: PathBuf, reason: String },

    #[error("Failed to restore unit state from {path}: {reason}")]
    StateRestoreError { path: PathBuf, reason: String },

    #[error("Unit rejected state: {0}")]
    InvalidState(String),

    #[error("Control executor is not running")]
    ExecutorStopped,

    #[error("Control operation panicked: {0}")]
    OperationPanicked(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;
