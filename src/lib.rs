pub mod app;
pub mod completion;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod qa;
pub mod registry;
pub mod server;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{Result, RodeoError};
