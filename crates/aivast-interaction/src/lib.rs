//! Transport layer of the AIVAST client.
//!
//! Provides [`HttpBackend`], the reqwest implementation of
//! [`aivast_core::ScanBackend`], and configuration loading.

pub mod config;
pub mod http_backend;

pub use config::{default_config_path, load_client_config};
pub use http_backend::HttpBackend;
