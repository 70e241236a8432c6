pub mod concurrency;
pub mod host;
pub mod transport;
