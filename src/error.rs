//! Centralized error type for the blockhost umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] blockhost_core::CoreError),

    #[error("Host: {0}")]
    Host(#[from] blockhost_host::HostError),
}

pub type Result<T> = std::result::Result<T, Error>;
